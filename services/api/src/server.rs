use crate::cli::ServeArgs;
use crate::infra::{sample_reference, seed, wire, AppState};
use crate::routes::application_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use espace::config::AppConfig;
use espace::error::AppError;
use espace::geography::{GeographyImporter, ReferenceStore};
use espace::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let reference: Arc<dyn ReferenceStore> = match &config.reference.geography_dir {
        Some(dir) => {
            let store = GeographyImporter::from_dir(dir)?;
            info!(dir = %dir.display(), "geography reference tables imported");
            Arc::new(store)
        }
        None => Arc::new(sample_reference()),
    };

    let wiring = wire(config.registry);
    if let Err(error) = seed(&wiring) {
        warn!(%error, "property catalog seeding failed; starting with an empty catalog");
    }

    let app = application_router(&wiring, reference)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "cadastre registry ready");

    axum::serve(listener, app).await?;
    Ok(())
}
