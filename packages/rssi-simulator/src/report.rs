//! report.rs — Result consumer boundary
//!
//! The optimizer never calls a consumer. The binary builds a [`LocalizationReport`]
//! from the outcome and hands it to every configured [`ResultSink`].

use tracing::info;

use rssi_types::{LocalizationReport, Point2};

use crate::error::SinkError;
use crate::pso::PsoOutcome;

/// Downstream consumer of finished runs (plotter, logger, network relay)
pub trait ResultSink {
    fn publish(&mut self, report: &LocalizationReport) -> Result<(), SinkError>;
}

/// Assemble the report for one run. `true_position` is only known in simulation.
pub fn build_report(
    anchors: &[Point2],
    true_position: Option<Point2>,
    outcome: &PsoOutcome,
) -> LocalizationReport {
    LocalizationReport {
        anchors:              anchors.to_vec(),
        true_position,
        estimated_position:   outcome.position(),
        estimated_exponent:   outcome.best.path_loss_exponent(),
        estimated_ref_powers: outcome.best.ref_powers().to_vec(),
        fitness:              outcome.fitness,
        iterations:           outcome.iterations,
    }
}

/// Writes a human-readable summary through `tracing`
#[derive(Debug, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&mut self, report: &LocalizationReport) -> Result<(), SinkError> {
        if let Some(t) = report.true_position {
            info!("true position:      ({:.3}, {:.3})", t.x, t.y);
        }
        let e = report.estimated_position;
        info!("estimated position: ({:.3}, {:.3})", e.x, e.y);
        info!("estimated n: {:.4}  P0: {:?}", report.estimated_exponent, report.estimated_ref_powers);
        info!("residual: {:.3e} after {} iterations", report.fitness, report.iterations);
        if let Some(err) = report.position_error() {
            info!("position error: {err:.3}");
        }
        Ok(())
    }
}

/// Collects reports in memory; used by tests and embedding callers
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reports: Vec<LocalizationReport>,
}

impl ResultSink for MemorySink {
    fn publish(&mut self, report: &LocalizationReport) -> Result<(), SinkError> {
        self.reports.push(report.clone());
        Ok(())
    }
}
