//! Command-line front end for the stop-and-wait simulator.
//!
//! ```bash
//! # Classic settings: 20 messages, 20% loss, 10% corruption
//! rdt-sim
//!
//! # Noisier channel, more traffic, full event trace
//! rdt-sim --messages 100 --loss 0.3 --corrupt 0.2 --lambda 50 --trace 3
//!
//! # Replay a batch of 500 seeds starting at 42
//! rdt-sim --seed 42 --iterations 500 --trace 0
//! ```

use std::process;

use clap::Parser;
use rdt_sim::{SimulationBuilder, SimulationConfig, SimulationReport};
use tracing_subscriber::EnvFilter;

/// Stop-and-wait reliable data transfer over a lossy, corrupting channel.
///
/// Runs are deterministic: the same seed and settings reproduce the same
/// trace and counters.
#[derive(Parser, Debug)]
#[command(name = "rdt-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of application messages to simulate
    #[arg(short = 'n', long, default_value_t = 20)]
    messages: u64,

    /// Packet loss probability, in [0, 1)
    #[arg(short = 'l', long, default_value_t = 0.2)]
    loss: f64,

    /// Packet corruption probability, in [0, 1)
    #[arg(short = 'c', long, default_value_t = 0.1)]
    corrupt: f64,

    /// Average time between messages from the sender's application layer
    #[arg(long, default_value_t = 2000.0)]
    lambda: f64,

    /// Sender retransmission timeout
    #[arg(long, default_value_t = 20.0)]
    timeout: f64,

    /// Trace level: 0 warnings, 1 losses and deliveries, 2 events, 3 everything
    #[arg(short = 't', long, default_value_t = 1)]
    trace: u8,

    /// Seed of the first run
    #[arg(long, default_value_t = 9999)]
    seed: u64,

    /// Number of seeded runs
    #[arg(short = 'i', long, default_value_t = 1)]
    iterations: usize,

    /// Stop right after the last message is generated instead of letting
    /// in-flight traffic settle
    #[arg(long)]
    no_drain: bool,
}

impl Args {
    fn to_config(&self) -> SimulationConfig {
        SimulationConfig::default()
            .with_max_messages(self.messages)
            .with_loss_prob(self.loss)
            .with_corrupt_prob(self.corrupt)
            .with_mean_interarrival(self.lambda)
            .with_timeout(self.timeout)
            .with_trace_level(self.trace)
            .with_seed(self.seed)
            .with_drain_in_flight(!self.no_drain)
    }
}

fn check_report(report: &SimulationReport) -> Result<(), String> {
    if report.seeds_failing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} failing seeds: {:?}",
            report.seeds_failing.len(),
            report.seeds_failing
        ))
    }
}

fn main() {
    let args = Args::parse();
    let config = args.to_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.trace_filter().into()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let report = match SimulationBuilder::new()
        .config(config)
        .set_iterations(args.iterations)
        .run()
    {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    println!("{report}");
    if let Err(e) = check_report(&report) {
        eprintln!("FAILED: {e}");
        process::exit(1);
    }
}
