//! udp_tx.rs — UDP sink for localization reports
//!
//! Sends each finished run as one JSON datagram to a visualizer:
//!   - Unicast: the configured `report.udp_addr` / `--report-addr`
//!   - Optional multicast group for several viewers at once
//!
//! Delivery is fire-and-forget; a send failure is returned to the caller, which
//! logs it and carries on.

use std::net::UdpSocket;
use tracing::debug;

use rssi_types::LocalizationReport;

use crate::error::SinkError;
use crate::report::ResultSink;

pub struct UdpSink {
    socket: UdpSocket,
    unicast_addr: String,
    multicast_addr: Option<String>,
}

impl UdpSink {
    /// Bind an ephemeral local port for sending
    pub fn new(unicast_addr: &str, multicast_addr: Option<&str>) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(false)?;
        Ok(Self {
            socket,
            unicast_addr: unicast_addr.to_string(),
            multicast_addr: multicast_addr.map(|s| s.to_string()),
        })
    }

    fn envelope(report: &LocalizationReport) -> Result<Vec<u8>, SinkError> {
        let payload = serde_json::json!({
            "type":   "localization",
            "report": report,
            "error":  report.position_error(),
        });
        Ok(serde_json::to_vec(&payload)?)
    }
}

impl ResultSink for UdpSink {
    fn publish(&mut self, report: &LocalizationReport) -> Result<(), SinkError> {
        let bytes = Self::envelope(report)?;

        self.socket.send_to(&bytes, &self.unicast_addr)?;
        debug!(
            "UDP → {} est=({:.2}, {:.2})",
            self.unicast_addr, report.estimated_position.x, report.estimated_position.y
        );

        if let Some(mc) = &self.multicast_addr {
            self.socket.send_to(&bytes, mc)?;
        }
        Ok(())
    }
}
