use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulse_common::Config;
use pulse_trends::{HttpFeedClient, TrendingService};

#[derive(Parser)]
#[command(
    name = "pulse-trends",
    about = "Trending signals and business context for a category and location"
)]
struct Cli {
    /// Business category, e.g. "fitness" or "coffee shop"
    #[arg(long)]
    category: String,

    /// Location the bundle is scoped to
    #[arg(long)]
    location: String,

    /// Platform hint forwarded to the trend generator
    #[arg(long)]
    platform: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulse=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?;
    let client = Arc::new(HttpFeedClient::from_config(&config)?);
    let mut service = TrendingService::from_config(&config, client)?;
    if let Some(platform) = cli.platform {
        service = service.with_platform(platform);
    }

    let bundle = service
        .get_contextual_bundle(&cli.category, &cli.location)
        .await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(bundle.as_ref())
    } else {
        serde_json::to_string(bundle.as_ref())
    }
    .context("Failed to serialize bundle")?;
    println!("{output}");

    let stats = service.stats();
    info!(
        passes = stats.passes,
        degraded_passes = stats.degraded_passes,
        degraded = bundle.trending.degraded,
        "Done"
    );
    Ok(())
}
