use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber;

use freqlimit::config::FreqlimitConfig;
use freqlimit::limit::FrequencyLimiter;
use freqlimit::store::{RedisStore, SharedStore};

/// Probe the frequency limiter against a live shared store.
#[derive(Parser, Debug)]
#[command(name = "freqlimit", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Subject identifier to probe
    #[arg(short, long)]
    subject: String,

    /// Number of admission attempts to run
    #[arg(short = 'n', long, default_value_t = 1)]
    attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FreqlimitConfig::from_file(path)?,
        None => FreqlimitConfig::default(),
    };
    config.validate()?;
    info!(
        store = %config.store.address,
        limit = config.policy.limit,
        frequency_secs = config.policy.frequency_secs,
        "Configuration loaded"
    );

    let store = Arc::new(RedisStore::connect(&config.store).await?);
    store.ping().await?;
    info!("Shared store is reachable");

    let limiter = FrequencyLimiter::new(store, &config.policy);

    for attempt in 1..=args.attempts {
        let admitted = limiter.incr_and_check(&args.subject).await?;
        if admitted {
            info!(subject = %args.subject, attempt, "Admitted");
        } else {
            warn!(subject = %args.subject, attempt, "Rejected");
        }
    }

    Ok(())
}
