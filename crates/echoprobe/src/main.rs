#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(clippy::cast_possible_truncation)]
#![forbid(unsafe_code)]

use clap::Parser;
use echoprobe_core::{defaults, Builder, ProbeResult, RunReport};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Probe a host with ICMP echo requests.
#[derive(Parser, Debug)]
#[command(name = "echoprobe", version, about)]
struct Args {
    /// The host name or address to probe
    target: String,

    /// The number of probes to send
    #[arg(short = 'c', long, default_value_t = defaults::DEFAULT_PROBE_COUNT)]
    count: usize,

    /// The pause between probes, in milliseconds
    #[arg(short = 'i', long, default_value_t = defaults::DEFAULT_PROBE_INTERVAL.as_millis() as u64)]
    interval: u64,

    /// How long to wait for each reply, in milliseconds
    #[arg(short = 'W', long, default_value_t = defaults::DEFAULT_PROBE_TIMEOUT.as_millis() as u64)]
    timeout: u64,

    /// The number of payload bytes per probe
    #[arg(short = 's', long, default_value_t = defaults::DEFAULT_PAYLOAD_SIZE)]
    size: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let pinger = Builder::new(args.target.clone())
        .count(args.count)
        .interval(Duration::from_millis(args.interval))
        .probe_timeout(Duration::from_millis(args.timeout))
        .payload_size(args.size)
        .build()?;
    println!(
        "probing {} with {} probes of {} payload bytes",
        args.target, args.count, args.size
    );
    let handle = pinger.spawn_with(print_result)?;
    let canceller = handle.canceller();
    ctrlc::set_handler(move || canceller.cancel())?;
    let report = handle.wait()?;
    print_summary(&report);
    let stats = report.statistics();
    if stats.sent() > 0 && stats.received() == 0 {
        process::exit(1);
    }
    Ok(())
}

fn print_result(result: &ProbeResult) {
    if result.success {
        println!(
            "seq={} time={:.1} ms {}",
            result.sequence.0,
            result.round_trip_millis(),
            result.message
        );
    } else {
        println!("seq={} {}", result.sequence.0, result.message);
    }
}

fn print_summary(report: &RunReport) {
    let stats = report.statistics();
    println!("--- {} probe statistics ---", report.target);
    println!(
        "{} sent, {} received, {:.1}% loss",
        stats.sent(),
        stats.received(),
        stats.loss_pct()
    );
    if let (Some(best), Some(worst)) = (stats.best_ms(), stats.worst_ms()) {
        println!(
            "rtt min/avg/max = {best:.1}/{:.1}/{worst:.1} ms",
            stats.avg_ms()
        );
    }
}
