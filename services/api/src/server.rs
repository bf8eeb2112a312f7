use crate::cli::ServeArgs;
use crate::infra::{AppState, StaticActorDirectory, TracingDispatcher};
use crate::routes::with_karin_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use karin_engine::config::AppConfig;
use karin_engine::error::AppError;
use karin_engine::telemetry;
use karin_engine::workflows::karin::{
    InMemoryCaseStore, InMemoryCounterStore, KarinProcessService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let cases = Arc::new(InMemoryCaseStore::new());
    let directory = StaticActorDirectory::from_env();
    let process_service = Arc::new(KarinProcessService::new(
        cases.clone(),
        Arc::new(InMemoryCounterStore::new()),
        Arc::new(TracingDispatcher::default()),
        Arc::new(directory),
        config.statute.calculator(),
    ));

    let app = with_karin_routes(process_service, cases)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        holidays = config.statute.holidays.len(),
        "ley karin process engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
