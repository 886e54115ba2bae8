use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hunt_property::config::{AppConfig, StorageConfig};
use hunt_property::error::AppError;
use hunt_property::marketplace::{
    marketplace_router, InMemoryStore, MarketplaceService, MarketplaceStore, MongoStore,
};
use hunt_property::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    match &config.storage {
        StorageConfig::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            serve(&config, Arc::new(InMemoryStore::new())).await
        }
        StorageConfig::Mongo(mongo) => {
            let store = MongoStore::connect(mongo).await?;
            serve(&config, Arc::new(store)).await
        }
    }
}

async fn serve<S: MarketplaceStore>(config: &AppConfig, store: Arc<S>) -> Result<(), AppError> {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(MarketplaceService::new(store));
    let app = with_operational_routes(marketplace_router(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = ?config.environment,
        storage = config.storage.label(),
        %addr,
        "hunt property api ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("hunt property api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
