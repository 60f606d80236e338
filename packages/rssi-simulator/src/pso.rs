//! pso.rs — Particle swarm optimizer for RSSI emitter localization
//!
//! Searches the parameter space `[x, y, n, P0_0 … P0_{k-1}]` for the vector that
//! minimizes the path-loss residual against the measured RSSI:
//!
//!   J(p) = Σ_i (rssi_i − (P0_sel(i) − 10·n·log10(‖(x,y) − a_i‖ + ε)))²
//!
//! Each iteration is a pure transition `SwarmState → SwarmState`:
//! 1. Evaluate every particle, update personal bests, then the global best
//! 2. Adapt inertia once (tighten on improvement, loosen on stall)
//! 3. Move every particle against the settled global best; clamp x, y to the map
//! 4. Stagnation check: improvement below tolerance for more than `patience`
//!    consecutive iterations ends the run
//!
//! Improvement is measured once per iteration as the drop in global-best fitness,
//! independent of the order particles are scanned in.

use rand::Rng;
use tracing::{debug, info};

use rssi_types::{ParameterVector, Point2};

use crate::config::PsoConfig;
use crate::error::PsoError;
use crate::path_loss::fitness;

/// Inertia multiplier after an improving iteration
const INERTIA_TIGHTEN: f64 = 0.9;
/// Inertia multiplier after a stalled iteration
const INERTIA_LOOSEN: f64 = 1.1;
/// Progress log interval (iterations)
const LOG_EVERY: u32 = 100;

// ── Swarm state ───────────────────────────────────────────────────────────────

/// One candidate solution with its velocity and memory
#[derive(Debug, Clone)]
pub struct Particle {
    pub position:      ParameterVector,
    pub velocity:      Vec<f64>,
    pub best_position: ParameterVector,
    /// `f64::INFINITY` until the particle is first evaluated
    pub best_fitness:  f64,
}

/// Best solution seen by any particle so far
#[derive(Debug, Clone)]
pub struct GlobalBest {
    pub position: ParameterVector,
    pub fitness:  f64,
}

/// Full optimizer state between iterations
#[derive(Debug, Clone)]
pub struct SwarmState {
    pub particles:   Vec<Particle>,
    /// Fitness is `f64::INFINITY` before the first evaluation pass
    pub global_best: GlobalBest,
    pub inertia:     f64,
    /// Consecutive iterations with improvement below tolerance
    pub stagnation:  u32,
    /// Index of the next iteration to run
    pub iteration:   u32,
}

/// Telemetry for one completed iteration
#[derive(Debug, Clone, Copy)]
pub struct IterationStats {
    pub iteration:        u32,
    /// Global-best fitness after this iteration's evaluation pass
    pub global_best:      f64,
    /// Lowest fitness any particle had at its evaluated position this iteration
    pub best_evaluated:   f64,
    /// Drop in global-best fitness during this iteration (0 on a stall)
    pub improvement:      f64,
    pub improved:         bool,
    /// Inertia used for this iteration's velocity update
    pub inertia:          f64,
    pub stagnation:       u32,
    /// Stagnation exceeded patience; the run ends here
    pub converged:        bool,
}

/// Result of one [`Optimizer::step`]
#[derive(Debug, Clone)]
pub struct Step {
    pub state: SwarmState,
    pub stats: IterationStats,
}

/// Final result of a run
#[derive(Debug, Clone)]
pub struct PsoOutcome {
    pub best:          ParameterVector,
    pub fitness:       f64,
    /// Iterations executed (`T` when the cap was reached)
    pub iterations:    u32,
    /// Ended by the patience rule rather than the iteration cap
    pub stopped_early: bool,
    /// Global-best fitness after each iteration
    pub history:       Vec<f64>,
}

impl PsoOutcome {
    pub fn position(&self) -> Point2 { self.best.position() }
}

// ── Optimizer ─────────────────────────────────────────────────────────────────

/// A validated optimization problem: configuration, anchors and measurements.
///
/// Holds no swarm; every run owns its own state, so one optimizer can be shared
/// between independent runs.
#[derive(Debug, Clone)]
pub struct Optimizer {
    cfg:          PsoConfig,
    anchors:      Vec<Point2>,
    measurements: Vec<f64>,
}

impl Optimizer {
    pub fn new(cfg: PsoConfig, anchors: &[Point2], measurements: &[f64]) -> Result<Self, PsoError> {
        cfg.validate(anchors.len())?;
        if measurements.len() != anchors.len() {
            return Err(PsoError::MeasurementMismatch {
                anchors:      anchors.len(),
                measurements: measurements.len(),
            });
        }
        Ok(Self {
            cfg,
            anchors: anchors.to_vec(),
            measurements: measurements.to_vec(),
        })
    }

    pub fn config(&self) -> &PsoConfig { &self.cfg }
    pub fn anchors(&self) -> &[Point2] { &self.anchors }
    pub fn measurements(&self) -> &[f64] { &self.measurements }

    /// Residual of `candidate` against this problem's measurements
    pub fn evaluate(&self, candidate: &ParameterVector) -> f64 {
        fitness(candidate, &self.anchors, &self.measurements)
    }

    /// Random initial swarm. Personal bests start unset.
    pub fn init_swarm<R: Rng + ?Sized>(&self, rng: &mut R) -> SwarmState {
        let cfg = &self.cfg;
        let k = cfg.optimized_ref_powers;
        let [n_lo, n_hi] = cfg.exponent_init;
        let [p_lo, p_hi] = cfg.ref_power_init;
        let [v_lo, v_hi] = cfg.velocity_init;

        let particles = (0..cfg.swarm_size).map(|_| {
            let mut c = Vec::with_capacity(cfg.dimension());
            c.push(rng.gen_range(0.0..cfg.map_size));
            c.push(rng.gen_range(0.0..cfg.map_size));
            c.push(rng.gen_range(n_lo..n_hi));
            c.extend((0..k).map(|_| rng.gen_range(p_lo..p_hi)));
            let velocity = (0..cfg.dimension()).map(|_| rng.gen_range(v_lo..v_hi)).collect();

            let position = ParameterVector::new(Point2::new(c[0], c[1]), c[2], &c[3..]);
            Particle {
                best_position: position.clone(),
                position,
                velocity,
                best_fitness: f64::INFINITY,
            }
        }).collect();

        // placeholder vector, replaced by the first evaluated particle
        let unset = GlobalBest {
            position: ParameterVector::new(Point2::default(), 0.0, &vec![0.0; k]),
            fitness:  f64::INFINITY,
        };

        SwarmState {
            particles,
            global_best: unset,
            inertia: cfg.inertia_max,
            stagnation: 0,
            iteration: 0,
        }
    }

    /// Run one full iteration on `prev` and return the next state.
    ///
    /// The global best is settled for all particles before any particle moves.
    pub fn step<R: Rng + ?Sized>(&self, prev: &SwarmState, rng: &mut R) -> Step {
        let cfg = &self.cfg;
        let t = prev.iteration;

        // ── Evaluate, personal bests, global best ──
        let mut particles = prev.particles.clone();
        let mut gbest = prev.global_best.clone();
        let prev_global = gbest.fitness;
        let mut best_evaluated = f64::INFINITY;
        let mut improved = false;

        for p in &mut particles {
            let f = self.evaluate(&p.position);
            best_evaluated = best_evaluated.min(f);

            if f < p.best_fitness || t == 0 {
                p.best_fitness = f;
                p.best_position = p.position.clone();
            }

            if f < gbest.fitness {
                gbest = GlobalBest { position: p.position.clone(), fitness: f };
                improved = true;
            }
        }

        let improvement = if improved { (prev_global - gbest.fitness).abs() } else { 0.0 };

        // ── Adaptive inertia ──
        let inertia = if improved {
            f64::max(cfg.inertia_min, prev.inertia * INERTIA_TIGHTEN)
        } else {
            f64::min(cfg.inertia_max, prev.inertia * INERTIA_LOOSEN)
        };

        // ── Velocity / position update ──
        let particles = particles.iter()
            .map(|p| self.advance(p, &gbest.position, inertia, rng))
            .collect();

        // ── Stagnation ──
        let stagnation = if cfg.tolerance > 0.0 && improvement < cfg.tolerance {
            prev.stagnation + 1
        } else {
            0
        };
        let converged = stagnation > cfg.patience;

        let stats = IterationStats {
            iteration: t,
            global_best: gbest.fitness,
            best_evaluated,
            improvement,
            improved,
            inertia,
            stagnation,
            converged,
        };

        Step {
            state: SwarmState {
                particles,
                global_best: gbest,
                inertia,
                stagnation,
                iteration: t + 1,
            },
            stats,
        }
    }

    /// Next position and velocity of one particle
    fn advance<R: Rng + ?Sized>(
        &self,
        p: &Particle,
        gbest: &ParameterVector,
        inertia: f64,
        rng: &mut R,
    ) -> Particle {
        let cfg = &self.cfg;
        let mut position = p.position.clone();
        let mut velocity = p.velocity.clone();
        let x = position.as_mut_slice();
        let pb = p.best_position.as_slice();
        let gb = gbest.as_slice();

        for j in 0..x.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            velocity[j] = inertia * velocity[j]
                + cfg.cognitive * r1 * (pb[j] - x[j])
                + cfg.social * r2 * (gb[j] - x[j]);
            x[j] += velocity[j];
            // only x, y are bounded
            if j < 2 {
                x[j] = x[j].clamp(0.0, cfg.map_size);
            }
        }

        Particle {
            position,
            velocity,
            best_position: p.best_position.clone(),
            best_fitness: p.best_fitness,
        }
    }

    /// Run to convergence or the iteration cap
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> PsoOutcome {
        self.run_observed(rng, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `observe` with the post-iteration state
    pub fn run_observed<R, F>(&self, rng: &mut R, mut observe: F) -> PsoOutcome
    where
        R: Rng + ?Sized,
        F: FnMut(&SwarmState, &IterationStats),
    {
        let cfg = &self.cfg;
        info!(
            swarm = cfg.swarm_size,
            anchors = self.anchors.len(),
            dim = cfg.dimension(),
            max_iter = cfg.max_iterations,
            "starting PSO"
        );

        let mut state = self.init_swarm(rng);
        // grows with the run; the cap can be far larger than what patience allows
        let mut history = Vec::new();
        let mut stopped_early = false;

        while state.iteration < cfg.max_iterations {
            let Step { state: next, stats } = self.step(&state, rng);
            state = next;
            history.push(stats.global_best);
            observe(&state, &stats);

            if stats.iteration % LOG_EVERY == 0 {
                debug!(
                    iter = stats.iteration,
                    best = stats.global_best,
                    inertia = stats.inertia,
                    stagnation = stats.stagnation,
                    "pso progress"
                );
            }
            if stats.converged {
                stopped_early = true;
                break;
            }
        }

        let iterations = state.iteration;
        let GlobalBest { position: best, fitness } = state.global_best;
        info!(iterations, fitness, stopped_early, "optimization ended on iteration {iterations}");

        PsoOutcome { best, fitness, iterations, stopped_early, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::scenario::{anchor_layout, Scenario};

    fn problem(cfg: PsoConfig) -> Optimizer {
        let anchors = anchor_layout(5, 30.0).unwrap();
        let s = Scenario::from_parts(anchors, Point2::new(10.0, 12.0), vec![2.6; 5], vec![-41.0; 5]).unwrap();
        Optimizer::new(cfg, &s.anchors, &s.measurements).unwrap()
    }

    fn small() -> PsoConfig {
        PsoConfig { swarm_size: 20, max_iterations: 150, ..Default::default() }
    }

    #[test]
    fn rejects_bad_config_before_running() {
        let anchors = anchor_layout(5, 30.0).unwrap();
        let cfg = PsoConfig { optimized_ref_powers: 3, ..Default::default() };
        let err = Optimizer::new(cfg, &anchors, &[-50.0; 5]).unwrap_err();
        assert!(matches!(err, PsoError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_measurement_count_mismatch() {
        let anchors = anchor_layout(5, 30.0).unwrap();
        let err = Optimizer::new(PsoConfig::default(), &anchors, &[-50.0; 4]).unwrap_err();
        assert!(matches!(err, PsoError::MeasurementMismatch { anchors: 5, measurements: 4 }));
    }

    #[test]
    fn init_swarm_respects_ranges() {
        let opt = problem(PsoConfig { optimized_ref_powers: 5, ..small() });
        let s = opt.init_swarm(&mut StdRng::seed_from_u64(3));
        assert_eq!(s.particles.len(), 20);
        assert!(s.global_best.fitness.is_infinite());
        assert_eq!(s.inertia, 0.9);
        assert_eq!(s.stagnation, 0);
        for p in &s.particles {
            assert_eq!(p.position.dim(), 8);
            assert_eq!(p.velocity.len(), 8);
            assert!(p.best_fitness.is_infinite());
            assert!((0.0..30.0).contains(&p.position.x()));
            assert!((0.0..30.0).contains(&p.position.y()));
            assert!((2.0..4.0).contains(&p.position.path_loss_exponent()));
            assert!(p.position.ref_powers().iter().all(|v| (-50.0..-30.0).contains(v)));
            assert!(p.velocity.iter().all(|v| (-1.0..1.0).contains(v)));
        }
    }

    #[test]
    fn first_step_sets_every_personal_best() {
        let opt = problem(small());
        let mut rng = StdRng::seed_from_u64(11);
        let s0 = opt.init_swarm(&mut rng);
        let step = opt.step(&s0, &mut rng);

        for (before, after) in s0.particles.iter().zip(&step.state.particles) {
            assert_eq!(after.best_position, before.position);
            assert_eq!(after.best_fitness, opt.evaluate(&before.position));
        }
        let min = s0.particles.iter().map(|p| opt.evaluate(&p.position)).fold(f64::INFINITY, f64::min);
        assert_eq!(step.stats.global_best, min);
        assert_eq!(step.stats.best_evaluated, min);
        assert!(step.stats.improved);
        assert!(step.stats.improvement.is_infinite());
        assert_eq!(step.stats.stagnation, 0);
        assert_eq!(step.state.iteration, 1);
    }

    #[test]
    fn inertia_tightens_then_loosens_within_bounds() {
        let opt = problem(small());
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = opt.init_swarm(&mut rng);
        let mut prev_w = state.inertia;
        for _ in 0..100 {
            let Step { state: next, stats } = opt.step(&state, &mut rng);
            let expected = if stats.improved {
                f64::max(0.4, prev_w * 0.9)
            } else {
                f64::min(0.9, prev_w * 1.1)
            };
            assert_eq!(stats.inertia, expected);
            assert!((0.4..=0.9).contains(&stats.inertia));
            prev_w = stats.inertia;
            state = next;
        }
    }

    #[test]
    fn stall_reports_zero_improvement() {
        let opt = problem(small());
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = opt.init_swarm(&mut rng);
        for _ in 0..150 {
            let Step { state: next, stats } = opt.step(&state, &mut rng);
            if !stats.improved {
                assert_eq!(stats.improvement, 0.0);
            } else {
                assert!(stats.improvement > 0.0);
            }
            state = next;
        }
    }

    #[test]
    fn zero_tolerance_never_stops_early() {
        let cfg = PsoConfig { tolerance: 0.0, patience: 0, max_iterations: 60, ..small() };
        let out = problem(cfg).run(&mut StdRng::seed_from_u64(1));
        assert!(!out.stopped_early);
        assert_eq!(out.iterations, 60);
        assert_eq!(out.history.len(), 60);
    }

    #[test]
    fn huge_tolerance_stops_after_patience() {
        // every iteration after the first counts as stagnant
        let cfg = PsoConfig { tolerance: f64::MAX, patience: 4, max_iterations: 500, ..small() };
        let out = problem(cfg).run(&mut StdRng::seed_from_u64(1));
        assert!(out.stopped_early);
        // iteration 0 resets (infinite improvement), 1..=5 stagnate, 5 > 4 stops
        assert_eq!(out.iterations, 6);
    }

    #[test]
    fn unbounded_cap_still_stops_on_patience() {
        let cfg = PsoConfig {
            swarm_size: 5,
            max_iterations: u32::MAX,
            tolerance: f64::MAX,
            patience: 0,
            ..Default::default()
        };
        let out = problem(cfg).run(&mut StdRng::seed_from_u64(6));
        assert!(out.stopped_early);
        // iteration 0 resets (infinite improvement), iteration 1 stagnates: 1 > 0
        assert_eq!(out.iterations, 2);
        assert_eq!(out.history.len(), 2);
    }

    #[test]
    fn single_iteration_run() {
        let cfg = PsoConfig { max_iterations: 1, ..small() };
        let out = problem(cfg).run(&mut StdRng::seed_from_u64(2));
        assert_eq!(out.iterations, 1);
        assert_eq!(out.history, vec![out.fitness]);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let opt = problem(small());
        let a = opt.run(&mut StdRng::seed_from_u64(77));
        let b = opt.run(&mut StdRng::seed_from_u64(77));
        assert_eq!(a.best, b.best);
        assert_eq!(a.history, b.history);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn outcome_fitness_matches_its_vector() {
        let opt = problem(small());
        let out = opt.run(&mut StdRng::seed_from_u64(4));
        assert_eq!(opt.evaluate(&out.best), out.fitness);
        assert_eq!(*out.history.last().unwrap(), out.fitness);
    }
}
