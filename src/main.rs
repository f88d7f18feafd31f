use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use lockstep_core::config::LockstepConfig;
use lockstep_core::sim::channel::ChannelParams;
use lockstep_core::sim::harness::{run_harness, HarnessParams};
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drives a multi-peer lockstep session over a simulated lossy link and
/// reports how many frames each peer executed.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of lockstepped peers.
    #[arg(long, default_value_t = 2)]
    peers: u32,

    /// Ticks to run before requesting shutdown.
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// ReceiveQueue/SendQueue capacity per remote peer.
    #[arg(long, default_value_t = 1024)]
    capacity: usize,

    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 16)]
    interframe_ms: u64,

    /// Milliseconds before an unacknowledged send is retransmitted.
    #[arg(long, default_value_t = 150)]
    retransmit_ms: u64,

    /// Simulated link bit rate, in bits/sec.
    #[arg(long, default_value_t = 1e7)]
    bit_rate: f64,

    /// One-way propagation delay, in milliseconds.
    #[arg(long, default_value_t = 20)]
    propagation_delay_ms: u64,

    /// Bit error rate while the Gilbert-Elliot channel is in its good state.
    #[arg(long, default_value_t = 1e-6)]
    good_state_ber: f64,

    /// Bit error rate while the Gilbert-Elliot channel is in its bad state.
    #[arg(long, default_value_t = 5e-3)]
    bad_state_ber: f64,

    /// How many independently scaled bad-state-BER scenarios to run in
    /// parallel, each a full standalone harness run on its own runtime.
    #[arg(long, default_value_t = 1)]
    sweep: u32,
}

fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=error", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let base_config = LockstepConfig::new()
        .with_capacity(args.capacity)
        .with_interframe_time(Duration::from_millis(args.interframe_ms))
        .with_retransmit_interval(Duration::from_millis(args.retransmit_ms));

    // Each sweep step scales the bad-state BER up linearly, so `--sweep 4`
    // gives four independent runs spanning a clean link through a heavily
    // degraded one.
    let scenarios: Vec<ChannelParams> = (0..args.sweep.max(1))
        .map(|step| ChannelParams {
            good_state_ber: args.good_state_ber,
            bad_state_ber: args.bad_state_ber * (1 + step) as f64,
            good_to_bad_p: 0.002,
            bad_to_good_p: 0.05,
        })
        .collect();

    let progress = ProgressBar::new(scenarios.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} scenarios ({eta})")
            .expect("progress bar template is well-formed"),
    );

    let runs: Vec<_> = scenarios
        .par_iter()
        .map(|&channel| {
            let params = HarnessParams {
                peer_count: args.peers,
                ticks: args.ticks,
                config: base_config.clone(),
                channel,
                bit_rate: args.bit_rate,
                propagation_delay: Duration::from_millis(args.propagation_delay_ms),
            };

            // `run_harness` is async; each rayon worker gets its own
            // single-purpose runtime rather than sharing one across the
            // whole pool, so scenarios stay fully independent.
            let runtime = tokio::runtime::Runtime::new()
                .expect("failed to start a tokio runtime for this scenario");
            let reports = runtime.block_on(run_harness(params));
            progress.inc(1);
            (channel.bad_state_ber, reports)
        })
        .collect();

    progress.finish_and_clear();

    for (bad_state_ber, reports) in runs {
        tracing::info!(bad_state_ber, "scenario complete");
        for report in reports {
            println!(
                "bad_state_ber={bad_state_ber:.5} peer={} frames_executed={}",
                report.peer_id, report.frames_executed
            );
        }
    }
}
