//! # rssi-simulator
//!
//! Estimates an emitter's 2D position together with its log-distance propagation
//! parameters from one RSSI sample per anchor, using particle swarm optimization.
//!
//! Data flow:
//!
//! ```text
//! scenario ──(anchors, rssi)──▶ pso::Optimizer ──▶ PsoOutcome ──▶ report::ResultSink
//!                                   │    ▲
//!                                   ▼    │
//!                              path_loss::fitness
//! ```
//!
//! Everything here is single-threaded and deterministic for a given RNG. Separate
//! runs share nothing and can be driven from separate threads.

pub mod config;
pub mod error;
pub mod path_loss;
pub mod pso;
pub mod report;
pub mod scenario;
pub mod udp_tx;

use rand::{rngs::StdRng, SeedableRng};

pub use config::{FileConfig, PsoConfig, ReportConfig, ScenarioConfig};
pub use error::{ConfigError, PsoError, SinkError};
pub use pso::{Optimizer, PsoOutcome, SwarmState};
pub use scenario::Scenario;

/// Seeded RNG when `seed` is set, entropy-seeded otherwise
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Run the optimizer on a simulated scenario
pub fn localize<R: rand::Rng + ?Sized>(
    scenario: &Scenario,
    cfg: PsoConfig,
    rng: &mut R,
) -> Result<PsoOutcome, PsoError> {
    let optimizer = Optimizer::new(cfg, &scenario.anchors, &scenario.measurements)?;
    Ok(optimizer.run(rng))
}
