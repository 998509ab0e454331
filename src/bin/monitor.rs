use std::sync::Arc;

use clap::Parser;
use server_monitor::{config::read_config_file, engine::Engine, metrics, notify::Dispatcher, storage};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long)]
    file: String,
}

fn init_logging(level: &str) {
    let level: LevelFilter = level.parse().unwrap_or(LevelFilter::INFO);
    let filter = filter::Targets::new().with_targets(vec![("server_monitor", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = read_config_file(&args.file)?;

    init_logging(&config.global.log_level);
    trace!("started with args: {args:?}");

    let resolved = config.resolve()?;
    info!(
        "configuration resolved: {} enabled endpoints",
        resolved.endpoints.len()
    );
    if resolved.endpoints.is_empty() {
        warn!("no enabled endpoints configured");
    }

    // The handle is the read-only snapshot consumed by the external
    // metrics scrape handler; render() yields the text exposition format
    let _prometheus = metrics::init_recorder().map_err(|e| anyhow::anyhow!(e))?;

    let store = storage::open_store(&resolved.database, resolved.max_concurrent_checks)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open result store: {e}"))?;

    let dispatcher = Arc::new(Dispatcher::new()?);

    let engine = Engine::start(resolved, store, dispatcher)?;
    info!("monitoring active, press Ctrl+C to shut down");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal, stopping schedulers..."),
        Err(err) => error!("unable to listen for shutdown signal: {err}"),
    }

    engine.shutdown().await;

    Ok(())
}
