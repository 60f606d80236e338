//! config.rs — Engine, scenario and report configuration
//!
//! Populated from `config.toml` (every field optional, defaults are the reference
//! values) and overridden from the CLI. Engine validation needs the anchor count,
//! so it runs when the optimizer is built, not when the file is parsed.

use std::io::ErrorKind;

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, PsoError};

/// Config path used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Built-in configuration, used when the default path does not exist
pub const EMBEDDED_CONFIG: &str = include_str!("../config.toml");

// ── PSO engine ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    /// Particles in the swarm (S)
    pub swarm_size:           usize,
    /// Reference-power components optimized (k): 1 shared, or one per anchor
    pub optimized_ref_powers: usize,
    /// Side of the square search area; spatial dims are clamped to [0, map_size]
    pub map_size:             f64,
    /// Iteration cap (T)
    pub max_iterations:       u32,
    /// Global-best improvement below this counts as stagnation; 0 disables early stop
    pub tolerance:            f64,
    /// Consecutive stagnant iterations tolerated before stopping
    pub patience:             u32,
    /// Cognitive coefficient (c1)
    pub cognitive:            f64,
    /// Social coefficient (c2)
    pub social:               f64,
    pub inertia_min:          f64,
    pub inertia_max:          f64,
    /// Initial path-loss exponent draw range
    pub exponent_init:        [f64; 2],
    /// Initial reference-power draw range (dBm)
    pub ref_power_init:       [f64; 2],
    /// Initial velocity draw range, every dimension
    pub velocity_init:        [f64; 2],
    /// Fixed seed for reproducible runs
    pub seed:                 Option<u64>,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            swarm_size:           100,
            optimized_ref_powers: 1,
            map_size:             30.0,
            max_iterations:       2000,
            tolerance:            1e-10,
            patience:             100,
            cognitive:            1.5,
            social:               1.5,
            inertia_min:          0.4,
            inertia_max:          0.9,
            exponent_init:        [2.0, 4.0],
            ref_power_init:       [-50.0, -30.0],
            velocity_init:        [-1.0, 1.0],
            seed:                 None,
        }
    }
}

impl PsoConfig {
    /// Reject configurations the engine cannot run. `num_anchors` is N.
    pub fn validate(&self, num_anchors: usize) -> Result<(), PsoError> {
        let invalid = |msg: String| Err(PsoError::InvalidConfiguration(msg));

        if self.swarm_size < 1 {
            return invalid("swarm size must be at least 1".into());
        }
        if num_anchors < 1 {
            return invalid("at least one anchor is required".into());
        }
        if self.optimized_ref_powers != 1 && self.optimized_ref_powers != num_anchors {
            return invalid(format!(
                "optimized reference powers must be 1 or {num_anchors} (anchor count), got {}",
                self.optimized_ref_powers
            ));
        }
        if !(self.map_size.is_finite() && self.map_size > 0.0) {
            return invalid(format!("map size must be positive, got {}", self.map_size));
        }
        if self.max_iterations < 1 {
            return invalid("max iterations must be at least 1".into());
        }
        if !(self.tolerance >= 0.0) {
            return invalid(format!("tolerance must be >= 0, got {}", self.tolerance));
        }
        if !(self.inertia_min >= 0.0 && self.inertia_min < self.inertia_max && self.inertia_max.is_finite()) {
            return invalid(format!(
                "inertia bounds must satisfy 0 <= min < max, got [{}, {}]",
                self.inertia_min, self.inertia_max
            ));
        }
        if !(self.cognitive.is_finite() && self.social.is_finite()) {
            return invalid("acceleration coefficients must be finite".into());
        }
        for (name, r) in [
            ("exponent_init", self.exponent_init),
            ("ref_power_init", self.ref_power_init),
            ("velocity_init", self.velocity_init),
        ] {
            if !(r[0].is_finite() && r[1].is_finite() && r[0] < r[1]) {
                return invalid(format!("{name} must be a finite range [lo, hi) with lo < hi"));
            }
        }
        Ok(())
    }

    /// Parameter vector dimension D = 3 + k
    pub fn dimension(&self) -> usize { 3 + self.optimized_ref_powers }
}

// ── Scenario generator ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub map_size:              f64,
    pub num_anchors:           usize,
    /// Centre of the per-anchor reference-power band (dBm at 1 m)
    pub nominal_ref_power_dbm: f64,
    /// Half-width of the reference-power band
    pub ref_power_spread_db:   f64,
    /// Centre of the per-anchor path-loss exponent band
    pub nominal_exponent:      f64,
    /// Half-width of the exponent band
    pub exponent_spread:       f64,
    /// Std-dev of additive Gaussian noise on each RSSI sample; 0 = noiseless
    pub noise_sigma_db:        f64,
    pub seed:                  Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            map_size:              30.0,
            num_anchors:           5,
            nominal_ref_power_dbm: -40.0,
            ref_power_spread_db:   2.5,
            nominal_exponent:      2.5,
            exponent_spread:       0.25,
            noise_sigma_db:        0.0,
            seed:                  None,
        }
    }
}

// ── Result reporting ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// UDP target for the JSON report (visualizer); unset = log only
    pub udp_addr: Option<String>,
}

// ── config.toml root ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub scenario: ScenarioConfig,
    pub pso:      PsoConfig,
    pub report:   ReportConfig,
}

impl FileConfig {
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load `path`, or the default path when `None`.
    ///
    /// Only a missing default file falls back to [`EMBEDDED_CONFIG`]; an explicit
    /// path must be readable.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if !explicit && e.kind() == ErrorKind::NotFound => {
                info!("{path} not found, using built-in defaults");
                EMBEDDED_CONFIG.to_string()
            }
            Err(source) => return Err(ConfigError::Read { path: path.to_string(), source }),
        };
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
    }
}
