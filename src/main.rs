mod api;
mod app;
mod config;
mod error;
mod model;
mod pipeline;
mod repo;
mod service;
mod util;

use anyhow::Context;
use std::{net::SocketAddr, path::Path, sync::OnceLock};
use tokio::net::TcpListener;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling,
};
use tracing_subscriber::{
    filter::filter_fn, fmt::layer as fmt_layer, prelude::*, EnvFilter, Registry,
};

const CRATE_TARGET: &str = "notes_backend";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::from_env().context("failed to load configuration")?;
    setup_tracing(&config)?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("invalid SERVER_BIND address")?;

    tracing::info!(%addr, "starting notes server");

    let app = app::build_router(&config).await?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await.context("server failed")?;

    Ok(())
}

fn setup_tracing(config: &config::AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.logging.level.as_deref().unwrap_or("info"))
    });

    let file_writer = log_file_writer(&config.logging)?;

    let ours = filter_fn(|meta| meta.target().starts_with(CRATE_TARGET));
    let dependencies = filter_fn(|meta| !meta.target().starts_with(CRATE_TARGET));

    let stdout_ours = fmt_layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_filter(ours.clone());

    let stdout_dependencies = fmt_layer()
        .with_writer(std::io::stdout)
        .with_filter(dependencies);

    let file_layer = fmt_layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(ours);

    Registry::default()
        .with(env_filter)
        .with(stdout_ours)
        .with(stdout_dependencies)
        .with(file_layer)
        .try_init()
        .context("failed to init tracing subscriber")?;

    Ok(())
}

fn log_file_writer(logging: &config::LoggingConfig) -> anyhow::Result<NonBlocking> {
    let log_path = Path::new(&logging.file);
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {:?}", directory))?;

    let file_name = log_path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid log file path {:?}", log_path))?;

    let appender = match logging.rotation {
        config::LogRotation::Never => rolling::never(directory, file_name),
        config::LogRotation::Daily => rolling::daily(directory, file_name),
        config::LogRotation::Hourly => rolling::hourly(directory, file_name),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    Ok(non_blocking)
}
