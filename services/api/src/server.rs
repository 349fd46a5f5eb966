use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAttachmentStore, InMemorySubmissionRepository};
use crate::routes::with_intake_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use ertc_intake::config::AppConfig;
use ertc_intake::error::AppError;
use ertc_intake::telemetry;
use ertc_intake::workflows::intake::{
    FsAttachmentStore, IntakeService, JsonFileSubmissionRepository, SubmissionForwarder,
};
use std::sync::atomic::{AtomicBool, Ordering};
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
    if let Some(dir) = args.storage_dir.take() {
        config.storage.dir = Some(dir);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let forwarder = match config.forwarding.url.as_deref() {
        Some(url) => {
            info!(target_url = %url, "forwarding accepted submissions");
            Some(Arc::new(SubmissionForwarder::new(url)?))
        }
        None => None,
    };

    let routes: Router = match config.storage.dir.as_deref() {
        Some(dir) => {
            let repository = Arc::new(JsonFileSubmissionRepository::open(dir)?);
            let attachments = Arc::new(FsAttachmentStore::open(dir)?);
            info!(storage_dir = %dir.display(), "using file-backed submission store");
            with_intake_routes(
                Arc::new(IntakeService::new(repository, attachments)),
                forwarder,
                config.storage.max_upload_bytes,
            )
        }
        None => {
            info!("no storage directory configured; submissions are kept in memory");
            let repository = Arc::new(InMemorySubmissionRepository::default());
            let attachments = Arc::new(InMemoryAttachmentStore::default());
            with_intake_routes(
                Arc::new(IntakeService::new(repository, attachments)),
                forwarder,
                config.storage.max_upload_bytes,
            )
        }
    };

    let app = routes
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "submission intake ready");

    axum::serve(listener, app).await?;
    Ok(())
}
