use crate::cli::ServeArgs;
use crate::infra::{build_registry, AppState};
use crate::routes::with_registry_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use docflow::config::AppConfig;
use docflow::error::AppError;
use docflow::scheduler::Sweeper;
use docflow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let wiring = build_registry();
    let sweeper = Arc::new(Sweeper::new(
        Arc::clone(&wiring.store),
        Arc::clone(&wiring.notifier),
        Arc::clone(&wiring.deliveries),
        config.scheduler.clone(),
    ));

    let sweep_interval = Duration::from_secs(config.scheduler.sweep_interval_hours * 3600);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweeper.run(Local::now().date_naive());
        }
    });

    let app = with_registry_routes(wiring.registry)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "correspondence registry ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// One-shot escalation run for cron-style invocation.
pub(crate) fn run_sweep_once() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let wiring = build_registry();
    let sweeper = Sweeper::new(
        wiring.store,
        wiring.notifier,
        wiring.deliveries,
        config.scheduler,
    );
    if let Some(report) = sweeper.run(Local::now().date_naive()) {
        info!(
            overdue = report.overdue_marked,
            warnings = report.due_warnings,
            draft_reminders = report.draft_reminders,
            approval_reminders = report.approval_reminders,
            "one-shot sweep finished"
        );
    }
    Ok(())
}
