use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use adapter::{database::connect_database_with, redis::RedisClient};
use anyhow::{Context, Result};
use api::route::v1;
use axum::Router;
use registry::AppRegistry;
use scheduler::{
    hygiene::UnverifiedAccountSweep,
    overdue::OverdueSweep,
    task::PeriodicTask,
};
use shared::config::AppConfig;
use shared::env::{which, Environment};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let pool = connect_database_with(&app_config.database);
    let kv = Arc::new(RedisClient::new(&app_config.redis)?);

    let registry = AppRegistry::new(pool, kv, app_config)?;
    let app_config = registry.app_config();
    let scheduler_config = &app_config.scheduler;

    // 延滞スイープとアカウント整理スイープを起動する。
    // どちらも API サーバと同じプロセス内で固定間隔で動く
    let overdue_task = PeriodicTask::new(
        Duration::from_secs(scheduler_config.overdue_sweep_interval_seconds),
        Arc::new(OverdueSweep::new(
            registry.loan_repository(),
            registry.notification_gateway(),
        )),
    )
    .start();
    let hygiene_task = PeriodicTask::new(
        Duration::from_secs(scheduler_config.hygiene_sweep_interval_seconds),
        Arc::new(UnverifiedAccountSweep::new(
            registry.user_repository(),
            scheduler_config.account_retention_days,
        )),
    )
    .start();

    let app = Router::new()
        .merge(v1::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(registry);

    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 8080);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    let serve_result = axum::serve(listener, app)
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(
                error.cause_chain = ?e, error.message = %e, "Unexpected error"
            )
        });

    // サーバ停止後、実行中のスイープを待ってからタスクを落とす
    overdue_task.stop().await;
    hygiene_task.stop().await;

    serve_result
}
