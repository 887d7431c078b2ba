use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prodgen_core::queue::TaskQueue;
use prodgen_db::PgTaskQueue;
use prodgen_engine::EngineApi;
use prodgen_events::CallbackDelivery;
use prodgen_pipeline::{DeeplTranslator, PassthroughTranslator, TaskProcessor, Translator};
use prodgen_worker::config::WorkerConfig;
use prodgen_worker::consumer::QueueConsumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prodgen_worker=debug,prodgen_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        kinds = ?config.kinds,
        concurrency = config.concurrency,
        callback_url = %config.callback_url,
        "Loaded worker configuration",
    );

    // --- Database (task queue) ---
    let pool = prodgen_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    prodgen_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    let queue: Arc<dyn TaskQueue> =
        Arc::new(PgTaskQueue::new(pool).with_visibility_timeout(config.visibility_timeout));

    // --- Processing pipeline ---
    let translator: Arc<dyn Translator> = match &config.deepl {
        Some(deepl) => Arc::new(
            DeeplTranslator::new(&deepl.url, &deepl.auth_key)
                .context("Failed to build translation client")?,
        ),
        None => {
            tracing::warn!("DEEPL_AUTH_KEY not set, image prompts use untranslated product names");
            Arc::new(PassthroughTranslator)
        }
    };
    let callbacks = CallbackDelivery::new(&config.callback_url, config.callback_retry)
        .context("Failed to build callback client")?;
    let processor = Arc::new(TaskProcessor::new(
        Arc::new(EngineApi::new(config.engine.clone())),
        translator,
        Arc::new(callbacks),
        config.poll_policies,
    ));

    // --- Consumers ---
    let cancel = CancellationToken::new();
    let mut handles = Vec::new();
    for kind in &config.kinds {
        let Some(queue_name) = config.queues.get(kind) else {
            anyhow::bail!("No queue configured for {kind}");
        };
        for _ in 0..config.concurrency {
            let consumer = QueueConsumer::new(
                Arc::clone(&queue),
                queue_name.clone(),
                *kind,
                Arc::clone(&processor),
                config.idle_poll_interval,
            );
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move { consumer.run(cancel).await }));
        }
    }
    tracing::info!(consumers = handles.len(), "Worker started");

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    match tokio::time::timeout(config.shutdown_timeout, futures::future::join_all(handles)).await {
        Ok(results) => {
            for result in results {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Consumer task panicked");
                }
            }
            tracing::info!("Graceful shutdown complete");
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout.as_secs(),
                "Consumers did not stop in time, exiting anyway",
            );
        }
    }

    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
