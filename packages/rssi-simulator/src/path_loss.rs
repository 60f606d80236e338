//! path_loss.rs — Log-distance path-loss model and the PSO fitness function
//!
//! Forward model (scenario generation) and inverse residual (fitness) share one
//! formula:
//!
//!   RSSI(d) = P0 − 10·n·log10(d + ε)
//!
//! ε keeps a zero anchor-to-emitter distance finite. Both directions must go through
//! [`rssi_at`] so a candidate equal to the truth scores exactly zero.

use rssi_types::{ParameterVector, Point2};

/// Added to every distance before the logarithm
pub const DISTANCE_EPSILON: f64 = 1e-9;

/// Modeled RSSI at distance `d` (same units as `ref_power`)
#[inline]
pub fn rssi_at(ref_power: f64, exponent: f64, d: f64) -> f64 {
    ref_power - 10.0 * exponent * (d + DISTANCE_EPSILON).log10()
}

/// Per-anchor Euclidean distance to `point`, in anchor order
pub fn distances(anchors: &[Point2], point: &Point2) -> Vec<f64> {
    anchors.iter().map(|a| a.dist(point)).collect()
}

/// Forward model: one RSSI per anchor from per-anchor reference power and exponent.
///
/// The three slices are indexed by anchor and must have equal length.
pub fn forward_rssi(distances: &[f64], ref_powers: &[f64], exponents: &[f64]) -> Vec<f64> {
    debug_assert_eq!(distances.len(), ref_powers.len());
    debug_assert_eq!(distances.len(), exponents.len());
    distances.iter()
        .zip(ref_powers.iter().zip(exponents))
        .map(|(&d, (&p0, &n))| rssi_at(p0, n, d))
        .collect()
}

/// Sum of squared residuals between measured and modeled RSSI for a candidate.
///
/// The candidate carries one shared exponent and either one shared reference power
/// or one per anchor. `measurements` is indexed like `anchors`. Inputs that break
/// either shape are a caller bug; [`Optimizer`](crate::pso::Optimizer) validates them
/// once at construction.
pub fn fitness(candidate: &ParameterVector, anchors: &[Point2], measurements: &[f64]) -> f64 {
    debug_assert_eq!(
        measurements.len(), anchors.len(),
        "one measurement per anchor required"
    );
    let k = candidate.ref_powers().len();
    debug_assert!(
        k == 1 || k == anchors.len(),
        "candidate has {k} reference powers for {} anchors", anchors.len()
    );
    let pos = candidate.position();
    let n = candidate.path_loss_exponent();
    anchors.iter()
        .zip(measurements)
        .enumerate()
        .map(|(i, (a, &measured))| {
            let estimated = rssi_at(candidate.ref_power_for(i), n, a.dist(&pos));
            (measured - estimated).powi(2)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_anchors() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 30.0),
            Point2::new(30.0, 30.0),
            Point2::new(30.0, 0.0),
            Point2::new(15.0, 15.0),
        ]
    }

    #[test]
    fn rssi_at_one_meter_is_reference_power() {
        assert_relative_eq!(rssi_at(-41.0, 2.6, 1.0), -41.0, epsilon = 1e-6);
    }

    #[test]
    fn rssi_drops_ten_n_db_per_decade() {
        let near = rssi_at(-40.0, 2.0, 1.0);
        let far = rssi_at(-40.0, 2.0, 10.0);
        assert_relative_eq!(near - far, 20.0, epsilon = 1e-6);
    }

    #[test]
    fn distances_follow_anchor_order() {
        let d = distances(&square_anchors(), &Point2::new(0.0, 0.0));
        assert_eq!(d.len(), 5);
        assert_eq!(d[0], 0.0);
        assert_relative_eq!(d[1], 30.0);
        assert_relative_eq!(d[4], 450.0_f64.sqrt());
    }

    #[test]
    fn truth_scores_exactly_zero() {
        let anchors = square_anchors();
        let truth = Point2::new(10.0, 12.0);
        let meas = forward_rssi(&distances(&anchors, &truth), &[-41.0; 5], &[2.6; 5]);
        let candidate = ParameterVector::new(truth, 2.6, &[-41.0]);
        assert_eq!(fitness(&candidate, &anchors, &meas), 0.0);

        let per_anchor = ParameterVector::new(truth, 2.6, &[-41.0; 5]);
        assert_eq!(fitness(&per_anchor, &anchors, &meas), 0.0);
    }

    #[test]
    fn per_anchor_ref_powers_are_indexed() {
        let anchors = square_anchors();
        let truth = Point2::new(7.0, 21.0);
        let p0 = [-38.0, -39.5, -41.0, -42.5, -40.0];
        let meas = forward_rssi(&distances(&anchors, &truth), &p0, &[2.4; 5]);

        let exact = ParameterVector::new(truth, 2.4, &p0);
        assert_eq!(fitness(&exact, &anchors, &meas), 0.0);

        // Shared P0 cannot explain per-anchor differences
        let shared = ParameterVector::new(truth, 2.4, &[-40.0]);
        assert!(fitness(&shared, &anchors, &meas) > 0.0);
    }

    #[test]
    fn fitness_is_sum_of_squares() {
        let anchors = vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)];
        let candidate = ParameterVector::new(Point2::new(1.0, 0.0), 2.0, &[-40.0]);
        let model = [rssi_at(-40.0, 2.0, 1.0), rssi_at(-40.0, 2.0, 9.0)];
        let meas = [model[0] + 3.0, model[1] - 4.0];
        assert_relative_eq!(fitness(&candidate, &anchors, &meas), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn fitness_is_deterministic() {
        let anchors = square_anchors();
        let meas = [-60.0, -65.0, -70.0, -62.0, -55.0];
        let c = ParameterVector::new(Point2::new(12.3, 4.5), 3.1, &[-44.0]);
        let first = fitness(&c, &anchors, &meas);
        for _ in 0..10 {
            assert_eq!(fitness(&c, &anchors, &meas).to_bits(), first.to_bits());
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reference powers for 5 anchors")]
    fn ref_power_count_must_be_one_or_n() {
        let c = ParameterVector::new(Point2::new(5.0, 5.0), 2.5, &[-40.0, -41.0]);
        fitness(&c, &square_anchors(), &[-50.0; 5]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "one measurement per anchor")]
    fn short_measurement_slice_is_caught() {
        let c = ParameterVector::new(Point2::new(5.0, 5.0), 2.5, &[-40.0]);
        fitness(&c, &square_anchors(), &[-50.0; 4]);
    }

    #[test]
    fn candidate_on_an_anchor_stays_finite() {
        let anchors = square_anchors();
        let meas = [-60.0, -65.0, -70.0, -62.0, -55.0];
        for a in &anchors {
            let c = ParameterVector::new(*a, 2.5, &[-40.0]);
            let f = fitness(&c, &anchors, &meas);
            assert!(f.is_finite(), "fitness at anchor {a:?} was {f}");
            assert!(f >= 0.0);
        }
        let forward = forward_rssi(&[0.0], &[-40.0], &[2.5]);
        assert!(forward[0].is_finite());
    }
}
