use std::sync::Arc;

use anyhow::Context;
use glucowatch_core::fallback::RandomFallback;
use glucowatch_db::PgStore;
use glucowatch_dexcom::DexcomClient;
use glucowatch_events::AlertBus;
use glucowatch_worker::{LogFormat, MonitorService, RunScheduler, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;

    // --- Tracing ---
    init_tracing(config.log_format);
    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        freshness_window_secs = config.monitor.freshness.window.as_secs(),
        concurrency = config.monitor.concurrency,
        sink = ?config.sink.target,
        region = config.dexcom_region.as_str(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = glucowatch_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    glucowatch_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    glucowatch_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Collaborators ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let dexcom = Arc::new(
        DexcomClient::new(config.dexcom_region, config.dexcom_timeout)
            .context("Failed to build Dexcom client")?,
    );
    let fallback = Arc::new(RandomFallback::new(config.fallback_min, config.fallback_max)?);

    // --- Alert dispatch ---
    let bus = Arc::new(AlertBus::default());
    let dispatcher = config
        .sink
        .build_dispatcher(pool.clone(), Arc::clone(&bus))
        .context("Failed to build alert sink")?;
    tracing::info!(
        sink = dispatcher.sink_kind(),
        timeout_ms = dispatcher.timeout().as_millis() as u64,
        "Alert dispatcher ready"
    );

    // Keep the bus observable in logs when it is the configured sink.
    let _bus_log = (dispatcher.sink_kind() == "bus").then(|| spawn_bus_logger(&bus));

    let monitor = Arc::new(MonitorService::new(
        store.clone(),
        store,
        dexcom,
        fallback,
        dispatcher,
        config.monitor,
    ));

    // --- Scheduler ---
    let handle = RunScheduler::new(config.poll_interval, config.shutdown_grace).start(monitor);

    shutdown_signal().await;

    let report = handle.stop().await;
    if report.timed_out {
        tracing::warn!("Shutdown finished with a monitor run still in flight");
    }
    pool.close().await;
    tracing::info!("Worker stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "glucowatch_worker=debug,glucowatch_events=info".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

/// Log every alert published on the in-process bus.
fn spawn_bus_logger(bus: &AlertBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(alert) => tracing::info!(
                    patient_id = %alert.patient_id,
                    kind = %alert.kind,
                    message = %alert.message,
                    "Alert received on bus"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Bus logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
            tracing::info!("Received SIGINT (Ctrl-C), stopping worker");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping worker");
        }
    }
}
