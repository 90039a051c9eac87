//! mailgate bridge
//!
//! Spawned by the agent host. Speaks line-delimited JSON-RPC on stdio and
//! forwards tool calls to the gateway inside the mail client over
//! loopback HTTP. stdout carries the protocol, so all logging goes to a
//! rolling file.

use anyhow::Result;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use mailgate_core::bridge::Bridge;
use mailgate_core::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    let log_dir = &config.general.log_dir;
    std::fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "bridge.log");

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(file_layer.with_filter(tracing_subscriber::filter::LevelFilter::INFO))
        .init();

    info!("mailgate bridge starting");

    let bridge = Bridge::new(&config);

    // An interrupt or terminate exits immediately; EOF waits for pending
    // tasks to drain first.
    tokio::select! {
        result = bridge.run() => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("Signal received, exiting");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
