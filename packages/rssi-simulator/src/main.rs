//! main.rs — RSSI localization simulator entry point
//!
//! 1. Load config.toml (embedded default when the file is missing)
//! 2. Generate a synthetic scenario: anchors, hidden emitter, RSSI per anchor
//! 3. Run the PSO engine on (anchors, RSSI)
//! 4. Publish the report: log summary, optional UDP datagram, optional JSON on stdout

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rssi_simulator::report::{build_report, LogSink, ResultSink};
use rssi_simulator::udp_tx::UdpSink;
use rssi_simulator::{localize, rng_from_seed, FileConfig, Scenario};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rssi-sim", about = "PSO emitter localization on simulated RSSI")]
struct Args {
    /// Config file path (default: ./config.toml, built-in defaults if absent)
    #[arg(short, long)]
    config: Option<String>,
    /// Seed for both scenario and optimizer (reproducible run)
    #[arg(long)]
    seed: Option<u64>,
    /// Override swarm size
    #[arg(long)]
    swarm_size: Option<usize>,
    /// Optimize one reference power per anchor instead of a shared one
    #[arg(long)]
    per_anchor: bool,
    /// Send the report as a JSON datagram to this address
    #[arg(long)]
    report_addr: Option<String>,
    /// Also send the report to this multicast group
    #[arg(long)]
    report_multicast: Option<String>,
    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rssi_simulator=info,rssi_sim=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut cfg = FileConfig::load(args.config.as_deref())?;

    if let Some(seed) = args.seed {
        cfg.scenario.seed = Some(seed);
        // distinct stream for the optimizer, still reproducible
        cfg.pso.seed = Some(seed.wrapping_add(1));
    }
    if let Some(s) = args.swarm_size {
        cfg.pso.swarm_size = s;
    }
    if args.per_anchor {
        cfg.pso.optimized_ref_powers = cfg.scenario.num_anchors;
    }
    cfg.pso.map_size = cfg.scenario.map_size;

    let mut scenario_rng = rng_from_seed(cfg.scenario.seed);
    let scenario = Scenario::generate(&cfg.scenario, &mut scenario_rng)
        .context("scenario generation failed")?;
    info!(
        "scenario: {} anchors on a {}×{} map, emitter at ({:.3}, {:.3})",
        scenario.anchors.len(), cfg.scenario.map_size, cfg.scenario.map_size,
        scenario.true_position.x, scenario.true_position.y
    );
    info!("true n: {:?}", scenario.true_exponents);
    info!("true P0: {:?}", scenario.true_ref_powers);

    let mut pso_rng = rng_from_seed(cfg.pso.seed);
    let outcome = localize(&scenario, cfg.pso.clone(), &mut pso_rng)
        .context("optimizer rejected configuration")?;

    let report = build_report(&scenario.anchors, Some(scenario.true_position), &outcome);

    let mut sinks: Vec<Box<dyn ResultSink>> = vec![Box::new(LogSink)];
    if let Some(addr) = args.report_addr.as_deref().or(cfg.report.udp_addr.as_deref()) {
        let sink = UdpSink::new(addr, args.report_multicast.as_deref())
            .with_context(|| format!("failed to bind UDP socket for {addr}"))?;
        sinks.push(Box::new(sink));
    }
    for sink in &mut sinks {
        if let Err(e) = sink.publish(&report) {
            warn!("report sink failed: {e}");
        }
    }

    if args.json {
        println!("{}", report.to_json().context("report encoding failed")?);
    }
    Ok(())
}
