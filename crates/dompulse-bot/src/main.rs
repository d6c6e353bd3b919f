mod config;
mod scheduler;
mod server;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dompulse_core::{
    DispatchConfig, DispatchPolicy, GlobalMarketProvider, ReqwestHttpClient, RetryConfig,
    TelegramNotifier,
};

use crate::config::Config;
use crate::scheduler::ScheduleState;
use crate::server::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "configuration rejected, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = run(config).await {
        error!(%error, "server terminated");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: Config) -> std::io::Result<()> {
    let http_client = Arc::new(ReqwestHttpClient::new());

    let provider = Arc::new(GlobalMarketProvider::new(
        http_client.clone(),
        config.market_api_url.clone(),
    ));
    let notifier = Arc::new(TelegramNotifier::new(
        http_client,
        config.telegram_token.clone(),
    ));

    let policy = Arc::new(DispatchPolicy::new(
        provider,
        notifier,
        DispatchConfig {
            target: config.target,
            thresholds: config.thresholds,
            retry: RetryConfig::default(),
        },
    ));

    info!(
        interval_secs = config.interval.as_secs(),
        chat_id = config.target.chat_id,
        "starting dominance notifier"
    );

    tokio::spawn(scheduler::run(
        policy.clone(),
        ScheduleState::new(config.interval),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "trigger surface listening");
    axum::serve(listener, server::router(AppState { policy })).await
}
