// HTTP server assembly: store selection, middleware stack and serve loop.

use std::time::Instant;

use anyhow::Context;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
    api::{self, ApiState},
    config::RegistryConfig,
    cors::cors_layer,
    db::{pool::create_pg_pool, schema::ensure_schema},
    error::{
        attach_request_id_header, request_id_from_headers_or_generate, with_request_id_scope,
        ErrorCode, RegistryError,
    },
    rpc::Dispatcher,
    store::Store,
    validation::MAX_REST_BODY_BYTES,
};

pub async fn run(config: RegistryConfig) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let backend = store.backend_name();
    let dispatcher = Dispatcher::new(config.event_hash.clone());
    let state = ApiState::new(store, dispatcher, &config.path_prefix);
    let app = build_app(state, config.cors_origins.as_deref());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind registry listener on {}", config.listen_addr))?;

    info!(
        listen_addr = %config.listen_addr,
        path_prefix = %config.path_prefix,
        backend,
        "starting track-and-trace registry"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("registry server exited unexpectedly")
}

async fn open_store(config: &RegistryConfig) -> anyhow::Result<Store> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("no registry database configured, records are kept in memory only");
        return Ok(Store::memory());
    };

    let pool = create_pg_pool(database_url, config.pool.clone()).await?;
    if config.db_bootstrap_schema {
        ensure_schema(&pool).await.context("failed to bootstrap registry schema")?;
    }

    Ok(Store::Postgres(pool))
}

pub fn build_app(state: ApiState, cors_origins: Option<&str>) -> Router {
    apply_middleware(api::router(state)).layer(cors_layer(cors_origins))
}

fn apply_middleware(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_REST_BODY_BYTES))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(middleware::from_fn(panic_handler))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(?error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(?error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

async fn panic_handler(request: Request<Body>, next: Next) -> Response {
    match tokio::spawn(async move { next.run(request).await }).await {
        Ok(response) => response,
        Err(join_error) => {
            error!(?join_error, "request handling panicked");
            RegistryError::from_code(ErrorCode::InternalError).into_response()
        }
    }
}

async fn request_context_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers_or_generate(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started_at = Instant::now();

    let mut response = with_request_id_scope(request_id.clone(), next.run(request)).await;
    attach_request_id_header(&mut response, &request_id);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started_at.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
