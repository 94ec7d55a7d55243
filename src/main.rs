use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use price_tracer::bot::{BotHandler, UpdatePoller};
use price_tracer::config::LoggingConfig;
use price_tracer::plugins::notifiers::{TelegramClient, TelegramNotifier};
use price_tracer::plugins::PriceFetcher;
use price_tracer::web::{self, AppState};
use price_tracer::{AppConfig, HttpPriceFetcher, ProductManager, ProductRegistry, ProductScheduler};

/// Slack on top of the HTTP client timeout before a check is abandoned.
const FETCH_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "price-tracer", version, about = "Watches product pages and reports price drops over Telegram")]
struct Cli {
    /// Load configuration from this file instead of the config/ directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot and the price scheduler
    Run,
    /// Fetch one page and print the price found on it
    Fetch { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::from_env(),
    }
    .context("Failed to load configuration")?;

    let _guard = init_tracing(&config.logging)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Fetch { url } => fetch_once(&config, &url).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(format!("price_tracer={}", logging.level).parse()?);

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "price-tracer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Price Tracer...");
    let token = config.require_token()?.to_string();

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port = config.metrics.port, "Prometheus exporter listening");
    }

    let client = TelegramClient::new(&config.telegram, &token)?;
    let fetcher = Arc::new(HttpPriceFetcher::new(&config.scraper)?);
    let notifier = Arc::new(TelegramNotifier::new(client.clone()));
    let product_manager = Arc::new(
        ProductManager::new(ProductRegistry::new(), fetcher, notifier)
            .with_fetch_timeout(config.scraper.request_timeout() + FETCH_TIMEOUT_SLACK),
    );

    let cancel = CancellationToken::new();
    let scheduler = Arc::new(ProductScheduler::new(
        Arc::clone(&product_manager),
        config.scheduler.clone(),
        config.scraper.max_concurrent_checks,
        cancel.clone(),
    ));
    let poller = UpdatePoller::new(
        client,
        BotHandler::new(Arc::clone(&product_manager)),
        config.telegram.poll_timeout_secs,
        cancel.clone(),
    );

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    tasks.spawn({
        let scheduler = Arc::clone(&scheduler);
        async move {
            scheduler.run().await;
            Ok(())
        }
    });
    tasks.spawn(async move {
        poller.run().await;
        Ok(())
    });

    if config.server.enabled {
        let state = AppState {
            product_manager: Arc::clone(&product_manager),
            scheduler: Arc::clone(&scheduler),
        };
        let server_config = config.server.clone();
        let shutdown = cancel.clone();
        tasks.spawn(async move { web::serve(&server_config, state, shutdown).await });
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        Some(joined) = tasks.join_next() => {
            warn!("A service stopped unexpectedly");
            report(joined);
        }
    }

    cancel.cancel();
    while let Some(joined) = tasks.join_next().await {
        report(joined);
    }

    info!("Shutting down...");
    Ok(())
}

fn report(joined: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Service failed: {:#}", e),
        Err(e) => error!("Service task failed: {}", e),
    }
}

async fn fetch_once(config: &AppConfig, url: &str) -> Result<()> {
    let fetcher = HttpPriceFetcher::new(&config.scraper)?;
    let price = fetcher
        .fetch_price(url)
        .await
        .with_context(|| format!("Failed to fetch price from {}", url))?;

    println!("{:.2}", price);
    Ok(())
}
