//! # rssi-types
//!
//! Shared value types for RSSI-based emitter localization.
//!
//! These types are used by:
//! - `rssi-simulator`: scenario generation, the PSO engine and its result sinks
//! - downstream visualizers: receive a [`LocalizationReport`] (usually as a JSON
//!   datagram) and draw anchors, ground truth and the estimate
//!
//! ## Coordinate Conventions
//!
//! - **Map frame**: 2D Cartesian, origin at one corner of a square map of side
//!   `map_size`, all coordinates in map units (meters in practice)
//! - **Parameter vector layout**: `[x, y, n, P0_0, …, P0_{k-1}]` where `n` is the
//!   path-loss exponent and `P0_i` the reference power (dBm at unit distance)
//!
//! ## Reference power broadcasting
//! - `k = 1`: one shared reference power, applied to every anchor
//! - `k = N`: one reference power per anchor, indexed by anchor order

use serde::{Deserialize, Serialize};

/// Index of the first reference-power component in a [`ParameterVector`].
pub const REF_POWER_OFFSET: usize = 3;

// ── 2D point ──────────────────────────────────────────────────────────────────

/// 2D point in the map frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }

    /// Euclidean distance to `other`
    pub fn dist(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ── Parameter vector ──────────────────────────────────────────────────────────

/// Candidate solution: emitter position plus propagation parameters.
///
/// Dimension is `3 + k`. The vector is plain data; it does not know which `k` the
/// engine was configured with beyond its own length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(Vec<f64>);

impl ParameterVector {
    /// Build from named parts
    pub fn new(position: Point2, exponent: f64, ref_powers: &[f64]) -> Self {
        let mut c = Vec::with_capacity(REF_POWER_OFFSET + ref_powers.len());
        c.extend_from_slice(&[position.x, position.y, exponent]);
        c.extend_from_slice(ref_powers);
        Self(c)
    }

    pub fn x(&self) -> f64 { self.0[0] }
    pub fn y(&self) -> f64 { self.0[1] }
    pub fn position(&self) -> Point2 { Point2::new(self.0[0], self.0[1]) }
    pub fn path_loss_exponent(&self) -> f64 { self.0[2] }

    /// All reference-power components (`k` of them)
    pub fn ref_powers(&self) -> &[f64] { &self.0[REF_POWER_OFFSET..] }

    /// Reference power applied to anchor `anchor_idx`.
    /// A single shared component is broadcast to every anchor.
    pub fn ref_power_for(&self, anchor_idx: usize) -> f64 {
        let rp = self.ref_powers();
        if rp.len() == 1 { rp[0] } else { rp[anchor_idx] }
    }

    /// Total dimension `D = 3 + k`
    pub fn dim(&self) -> usize { self.0.len() }

    pub fn as_slice(&self) -> &[f64] { &self.0 }
    pub fn as_mut_slice(&mut self) -> &mut [f64] { &mut self.0 }
}

// ── Localization report (core → result consumer) ──────────────────────────────

/// Everything a downstream consumer needs to draw and summarize one run.
///
/// The consumer only ever reads this value; nothing flows back into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationReport {
    /// Known anchor positions
    pub anchors: Vec<Point2>,
    /// Ground truth emitter position (simulation only)
    pub true_position: Option<Point2>,
    /// Best position found by the optimizer
    pub estimated_position: Point2,
    pub estimated_exponent: f64,
    pub estimated_ref_powers: Vec<f64>,
    /// Residual sum of squares at the estimate (dB²)
    pub fitness: f64,
    /// Iterations the optimizer ran before stopping
    pub iterations: u32,
}

impl LocalizationReport {
    /// The three point collections a plot needs: anchors, truth, estimate.
    /// Truth is empty when the report does not come from a simulation.
    pub fn point_sets(&self) -> (&[Point2], Vec<Point2>, Vec<Point2>) {
        (
            &self.anchors,
            self.true_position.into_iter().collect(),
            vec![self.estimated_position],
        )
    }

    /// Distance between truth and estimate, when the truth is known
    pub fn position_error(&self) -> Option<f64> {
        self.true_position.map(|t| t.dist(&self.estimated_position))
    }

    /// JSON encoding used on the wire to visualizers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
