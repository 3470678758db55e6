use crate::{
    api::handlers::{
        auth::{
            self, allow_list, rate_limit, AllowList, AuthConfig, AuthState, PgPrincipalStore,
        },
        health, me,
    },
    store::{KeyValueStore, RedisStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the application router.
///
/// Layers, outermost first: request id, trace, CORS, allow-list, rate limit.
/// `/v1/*` routes additionally require an active session.
pub fn router(auth_state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/v1/users/me", get(me::get_me))
        .route("/v1/auth/logout", post(auth::session::logout))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health).options(health::health))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi()))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            rate_limit::enforce,
        ))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            allow_list::enforce,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(auth_state.allow_list().cors_layer())
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    redis_url: String,
    store_timeout: Duration,
    auth_config: AuthConfig,
) -> Result<()> {
    // One multiplexed Redis connection shared by every component.
    let store = RedisStore::connect(&redis_url, store_timeout)
        .await
        .context("Failed to connect to Redis")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(store_timeout.max(Duration::from_secs(1)))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let allow_list = AllowList::load(store.as_ref())
        .await
        .context("Failed to load allow-lists")?;

    let auth_state = Arc::new(AuthState::new(
        auth_config,
        store,
        Arc::new(PgPrincipalStore::new(pool.clone())),
        allow_list,
    ));

    let app = router(auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
