//! scenario.rs — Synthetic localization scenario generator
//!
//! Builds one test world per run:
//! 1. Anchor layout on a square map (canonical: four corners + centre)
//! 2. Random ground-truth emitter position inside the map
//! 3. Random per-anchor propagation parameters (P0, n) in narrow bands
//! 4. Forward-simulated RSSI per anchor, optionally with Gaussian noise
//!
//! Every draw comes from the caller's RNG; nothing here holds state.

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::Serialize;
use tracing::{debug, warn};

use rssi_types::Point2;

use crate::config::ScenarioConfig;
use crate::error::PsoError;
use crate::path_loss::{distances, forward_rssi};

/// Anchor count that gets the canonical corners + centre layout
pub const CANONICAL_ANCHORS: usize = 5;

// ── Parameter bands ───────────────────────────────────────────────────────────

/// Closed interval `[centre − spread, centre + spread]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub centre: f64,
    pub spread: f64,
}

impl Band {
    pub const fn new(centre: f64, spread: f64) -> Self { Self { centre, spread } }

    fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        let dist = Uniform::new_inclusive(self.centre - self.spread, self.centre + self.spread);
        (0..n).map(|_| dist.sample(rng)).collect()
    }
}

/// Reference power −40 dBm ± 2.5
pub const NOMINAL_REF_POWER: Band = Band::new(-40.0, 2.5);
/// Path-loss exponent 2.5 ± 0.25
pub const NOMINAL_EXPONENT: Band = Band::new(2.5, 0.25);

// ── Generator functions ───────────────────────────────────────────────────────

/// Anchor positions for a square map of side `map_size`.
///
/// Five anchors: (0,0), (0,L), (L,L), (L,0), (L/2,L/2). Any other count is spread
/// evenly along the perimeter starting at the origin and walking the same way round,
/// so four anchors land on the corners.
pub fn anchor_layout(num_anchors: usize, map_size: f64) -> Result<Vec<Point2>, PsoError> {
    if num_anchors == 0 {
        return Err(PsoError::Scenario("anchor layout needs at least one anchor".into()));
    }
    if !(map_size.is_finite() && map_size > 0.0) {
        return Err(PsoError::Scenario(format!("map size must be positive, got {map_size}")));
    }

    let l = map_size;
    if num_anchors == CANONICAL_ANCHORS {
        return Ok(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, l),
            Point2::new(l, l),
            Point2::new(l, 0.0),
            Point2::new(l / 2.0, l / 2.0),
        ]);
    }

    warn!(num_anchors, "non-canonical anchor count, spreading anchors along the perimeter");
    let step = 4.0 * l / num_anchors as f64;
    Ok((0..num_anchors).map(|i| perimeter_point(i as f64 * step, l)).collect())
}

/// Point at arc length `s` along the square perimeter (0,0)→(0,L)→(L,L)→(L,0)→(0,0)
fn perimeter_point(s: f64, l: f64) -> Point2 {
    let side = ((s / l).floor() as usize).min(3);
    let t = s - side as f64 * l;
    match side {
        0 => Point2::new(0.0, t),
        1 => Point2::new(t, l),
        2 => Point2::new(l, l - t),
        _ => Point2::new(l - t, 0.0),
    }
}

/// Uniform point in [0, map_size]²
pub fn random_point<R: Rng + ?Sized>(map_size: f64, rng: &mut R) -> Point2 {
    let u = Uniform::new_inclusive(0.0, map_size);
    Point2::new(u.sample(rng), u.sample(rng))
}

/// One independent reference-power draw per anchor
pub fn random_ref_powers<R: Rng + ?Sized>(num_anchors: usize, band: Band, rng: &mut R) -> Vec<f64> {
    band.sample_n(num_anchors, rng)
}

/// One independent path-loss exponent draw per anchor
pub fn random_exponents<R: Rng + ?Sized>(num_anchors: usize, band: Band, rng: &mut R) -> Vec<f64> {
    band.sample_n(num_anchors, rng)
}

// ── Scenario ──────────────────────────────────────────────────────────────────

/// Ground truth plus the measurements the engine gets to see
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub anchors:         Vec<Point2>,
    pub true_position:   Point2,
    /// Per-anchor path-loss exponent used to generate the measurements
    pub true_exponents:  Vec<f64>,
    /// Per-anchor reference power used to generate the measurements
    pub true_ref_powers: Vec<f64>,
    /// One RSSI sample per anchor (dBm)
    pub measurements:    Vec<f64>,
}

impl Scenario {
    /// Noiseless scenario from explicit truth. Slices are indexed by anchor.
    pub fn from_parts(
        anchors: Vec<Point2>,
        true_position: Point2,
        true_exponents: Vec<f64>,
        true_ref_powers: Vec<f64>,
    ) -> Result<Self, PsoError> {
        let n = anchors.len();
        if n == 0 {
            return Err(PsoError::Scenario("scenario needs at least one anchor".into()));
        }
        if true_exponents.len() != n || true_ref_powers.len() != n {
            return Err(PsoError::Scenario(format!(
                "expected {n} exponents and reference powers, got {} and {}",
                true_exponents.len(),
                true_ref_powers.len()
            )));
        }
        let measurements = forward_rssi(
            &distances(&anchors, &true_position),
            &true_ref_powers,
            &true_exponents,
        );
        Ok(Self { anchors, true_position, true_exponents, true_ref_powers, measurements })
    }

    /// Random scenario per `cfg`
    pub fn generate<R: Rng + ?Sized>(cfg: &ScenarioConfig, rng: &mut R) -> Result<Self, PsoError> {
        let band_params = [
            cfg.nominal_ref_power_dbm,
            cfg.ref_power_spread_db,
            cfg.nominal_exponent,
            cfg.exponent_spread,
        ];
        if band_params.iter().any(|v| !v.is_finite()) {
            return Err(PsoError::Scenario(format!(
                "reference-power and exponent bands must be finite, got {band_params:?}"
            )));
        }
        if !(cfg.ref_power_spread_db >= 0.0 && cfg.exponent_spread >= 0.0) {
            return Err(PsoError::Scenario("parameter spreads must be >= 0".into()));
        }
        if !(cfg.noise_sigma_db >= 0.0 && cfg.noise_sigma_db.is_finite()) {
            return Err(PsoError::Scenario(format!(
                "noise sigma must be >= 0, got {}", cfg.noise_sigma_db
            )));
        }

        let anchors = anchor_layout(cfg.num_anchors, cfg.map_size)?;
        let true_position = random_point(cfg.map_size, rng);
        let true_ref_powers = random_ref_powers(
            anchors.len(),
            Band::new(cfg.nominal_ref_power_dbm, cfg.ref_power_spread_db),
            rng,
        );
        let true_exponents = random_exponents(
            anchors.len(),
            Band::new(cfg.nominal_exponent, cfg.exponent_spread),
            rng,
        );

        let mut scenario = Self::from_parts(anchors, true_position, true_exponents, true_ref_powers)?;

        if cfg.noise_sigma_db > 0.0 {
            let noise = Normal::new(0.0, cfg.noise_sigma_db)
                .map_err(|e| PsoError::Scenario(e.to_string()))?;
            for m in &mut scenario.measurements {
                *m += noise.sample(rng);
            }
        }

        debug!(
            x = true_position.x,
            y = true_position.y,
            anchors = scenario.anchors.len(),
            "scenario generated"
        );
        Ok(scenario)
    }
}
