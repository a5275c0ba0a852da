mod config;
mod credentials;
mod dispatcher;
mod error;
mod provider;
mod providers;
mod router;
mod search_client;
mod throttle;
mod web_server;

use crate::config::AppConfig;
use crate::credentials::CredentialPool;
use crate::dispatcher::{BatchDispatcher, DispatchSettings};
use crate::error::AppError;
use crate::provider::ImageProvider;
use crate::providers::google::GoogleImageProvider;
use crate::router::CategoryRouter;
use crate::search_client::SearchClient;
use crate::throttle::Throttle;
use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Batch image search over a rotating key pool")]
struct Cli {
    /// Base configuration file, without extension.
    #[arg(long, default_value = "config/default")]
    config: String,

    /// Overrides `web_port`.
    #[arg(long)]
    port: Option<u16>,

    /// Overrides `static_directory`.
    #[arg(long)]
    static_dir: Option<String>,
}

fn build_dispatcher(config: &AppConfig) -> Result<BatchDispatcher, AppError> {
    let keys = config
        .credential_list()
        .ok_or_else(|| AppError::NoCredentials(config.credentials_env.clone()))?;
    let pool = Arc::new(CredentialPool::from_list(&keys)?);
    info!("Loaded {} provider credentials", pool.len());

    let router = Arc::new(CategoryRouter::from_env(&config.categories));
    if router.is_empty() {
        log::warn!("No category is routable; every batch item will be skipped");
    } else {
        info!("{} categories routable", router.len());
    }
    let provider: Arc<dyn ImageProvider> = Arc::new(GoogleImageProvider::new(config)?);
    let throttle = Arc::new(Throttle::new(
        Duration::from_millis(config.cooldown_ms),
        config.max_requests_per_second,
    ));
    info!(
        "Up to {} concurrent searches, {:?} cooldown per slot",
        config.max_concurrency,
        throttle.cooldown()
    );

    Ok(BatchDispatcher::new(
        Arc::new(SearchClient::new(pool, provider)),
        router,
        throttle,
        DispatchSettings {
            max_concurrency: config.max_concurrency,
            result_limit: config.result_limit,
            query_suffix: config.query_suffix.clone(),
            default_category: config.default_category.clone(),
        },
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::new(&cli.config)?;
    if let Some(port) = cli.port {
        config.web_port = port;
    }
    if let Some(dir) = cli.static_dir {
        config.static_directory = dir;
    }

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image-batch");

    let dispatcher = build_dispatcher(&config)?;

    if let Err(e) = web_server::start_web_server(Arc::new(config), dispatcher).await {
        log::error!("Web server error: {}", e);
    }

    info!("image-batch finished");

    Ok(())
}
