//! Circuit breaker simulator.
//!
//! Drives simulated flaky resources through a shared breaker registry and
//! prints the final breaker snapshots as JSON.
//!
//! ```text
//!   call sites (N per resource)
//!        │
//!        ▼
//!   ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌───────────────┐
//!   │ registry │───▶│ retries  │───▶│  breaker  │───▶│ FlakyResource │
//!   └──────────┘    └──────────┘    └───────────┘    └───────────────┘
//! ```
//!
//! Every resource suffers one full outage (`--outage-after`, `--outage-rounds`)
//! on top of a background failure rate, so a run shows the breaker opening,
//! rejecting, probing and closing again.

use std::future::Future;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tokio::task::JoinSet;

use resource_breaker::config::load_config_with_env;
use resource_breaker::observability::{logging, metrics};
use resource_breaker::resilience::{retry_through, BreakerRegistry, RetryPolicy};

const DEFAULT_RESOURCES: [&str; 3] = ["users", "products", "feed"];

#[derive(Parser)]
#[command(name = "resource-breaker")]
#[command(about = "Drive simulated flaky resources through circuit breakers", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of simulation rounds
    #[arg(long, default_value_t = 100)]
    rounds: u32,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Failure probability of a healthy resource (0.0 to 1.0)
    #[arg(long, default_value_t = 0.05)]
    failure_rate: f64,

    /// Round at which every resource goes down
    #[arg(long, default_value_t = 20)]
    outage_after: u32,

    /// Length of the outage in rounds
    #[arg(long, default_value_t = 30)]
    outage_rounds: u32,

    /// Concurrent call sites per resource
    #[arg(long, default_value_t = 3)]
    call_sites: usize,

    /// Comma-separated resource names (default: configured resources)
    #[arg(long, value_delimiter = ',')]
    resources: Vec<String>,
}

#[derive(Debug, Error)]
#[error("{resource} unavailable in round {round}")]
struct Unavailable {
    resource: String,
    round: u32,
}

/// A resource that fails at random and is fully down during its outage window.
struct FlakyResource {
    name: String,
    failure_rate: f64,
    outage: Range<u32>,
}

impl FlakyResource {
    async fn query(&self, round: u32) -> Result<u32, Unavailable> {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(1..10))).await;

        if self.outage.contains(&round) || fastrand::f64() < self.failure_rate {
            Err(Unavailable {
                resource: self.name.clone(),
                round,
            })
        } else {
            Ok(round)
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    rounds: u32,
    succeeded: u64,
    failed: u64,
    rejected: u64,
}

struct Simulation {
    rounds: u32,
    interval: Duration,
    call_sites: usize,
}

impl Simulation {
    /// Run rounds until done or until `shutdown` resolves.
    ///
    /// `shutdown` is polled while calls drain and while pausing between
    /// rounds; in-flight calls are aborted when it fires.
    async fn run(
        &self,
        registry: &BreakerRegistry,
        policy: &RetryPolicy,
        resources: &[Arc<FlakyResource>],
        shutdown: impl Future<Output = ()>,
    ) -> Tally {
        tokio::pin!(shutdown);
        let mut tally = Tally::default();

        for round in 0..self.rounds {
            let mut calls = JoinSet::new();

            for resource in resources {
                let breaker = registry.get_or_create(&resource.name);
                for _ in 0..self.call_sites {
                    let resource = Arc::clone(resource);
                    let breaker = Arc::clone(&breaker);
                    let policy = policy.clone();
                    calls.spawn(async move {
                        retry_through(&policy, &breaker, || resource.query(round)).await
                    });
                }
            }

            loop {
                tokio::select! {
                    joined = calls.join_next() => match joined {
                        Some(Ok(Ok(_))) => tally.succeeded += 1,
                        Some(Ok(Err(e))) if e.is_open() => tally.rejected += 1,
                        Some(Ok(Err(_))) => tally.failed += 1,
                        Some(Err(e)) => tracing::error!(error = %e, "Call site task failed"),
                        None => break,
                    },
                    _ = &mut shutdown => {
                        calls.abort_all();
                        tracing::info!(round, "Interrupted, stopping simulation");
                        return tally;
                    }
                }
            }
            tally.rounds += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!(round, "Interrupted, stopping simulation");
                    return tally;
                }
            }
        }

        tally
    }
}

/// Resolves on the first Ctrl-C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config_with_env(cli.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        failure_threshold = config.breaker.failure_threshold,
        reset_timeout_ms = config.breaker.reset_timeout_ms,
        half_open_success_threshold = config.breaker.half_open_success_threshold,
        retries_enabled = config.retries.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = BreakerRegistry::from_config(&config);
    let policy = RetryPolicy::from(&config.retries);

    let names: Vec<String> = if !cli.resources.is_empty() {
        cli.resources.clone()
    } else if !config.resources.is_empty() {
        config.resources.iter().map(|r| r.name.clone()).collect()
    } else {
        DEFAULT_RESOURCES.iter().map(|n| n.to_string()).collect()
    };

    let outage = cli.outage_after..cli.outage_after.saturating_add(cli.outage_rounds);
    let resources: Vec<Arc<FlakyResource>> = names
        .into_iter()
        .map(|name| {
            Arc::new(FlakyResource {
                name,
                failure_rate: cli.failure_rate.clamp(0.0, 1.0),
                outage: outage.clone(),
            })
        })
        .collect();

    tracing::info!(
        resources = resources.len(),
        rounds = cli.rounds,
        outage_start = outage.start,
        outage_end = outage.end,
        "Simulation starting"
    );

    let simulation = Simulation {
        rounds: cli.rounds,
        interval: Duration::from_millis(cli.interval_ms),
        call_sites: cli.call_sites,
    };
    let tally = simulation
        .run(&registry, &policy, &resources, shutdown_signal())
        .await;

    tracing::info!(
        rounds = tally.rounds,
        succeeded = tally.succeeded,
        failed = tally.failed,
        rejected = tally.rejected,
        "Simulation complete"
    );

    println!("{}", serde_json::to_string_pretty(&registry.snapshots())?);
    Ok(())
}
