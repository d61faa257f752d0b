use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pitwall::config::EngineerConfig;
use pitwall::kernel::time::SystemClock;
use pitwall::services::advisory::AdvisoryService;
use pitwall::services::overlay_server;
use pitwall::services::speech::SpeechWorker;
use pitwall::source::ReplaySource;
use pitwall::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = EngineerConfig::from_env().context("invalid configuration")?;

    let Some(replay) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: pitwall <session.jsonl>");
    };
    let source = ReplaySource::open(&replay)?;
    let generator = AdvisoryService::new(&config.advisory);
    tracing::info!("advisory endpoint: {}", generator.endpoint());

    let cancel = CancellationToken::new();
    let mut engine = Engine::new(config.clone(), source, generator, Arc::new(SystemClock::new()));

    let overlay = if config.overlay.enabled {
        match tokio::net::TcpListener::bind(config.overlay.address()).await {
            Ok(listener) => Some(tokio::spawn(overlay_server::serve(
                listener,
                engine.overlay().clone(),
                cancel.clone(),
            ))),
            Err(e) => {
                tracing::warn!("overlay disabled, cannot bind {}: {}", config.overlay.address(), e);
                None
            }
        }
    } else {
        None
    };

    let speech = config
        .speech
        .enabled
        .then(|| tokio::spawn(SpeechWorker::new(engine.speech().clone(), &config.speech).run(cancel.clone())));

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down...");
            ctrl_c.cancel();
        }
    });

    let outcome = engine.run(cancel.clone()).await;

    // Let the last message finish before the worker goes away.
    if let Some(handle) = speech {
        while engine.speech().is_speaking() || !engine.speech().is_empty() {
            if cancel.is_cancelled() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        cancel.cancel();
        let _ = handle.await;
    }

    cancel.cancel();
    if let Some(handle) = overlay {
        match handle.await {
            Ok(Err(e)) => tracing::warn!("overlay server error: {}", e),
            Err(e) => tracing::warn!("overlay server task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    let stats = outcome?;
    tracing::info!("{} advisories, {} fallbacks", stats.dispatched, stats.fallbacks());
    Ok(())
}
