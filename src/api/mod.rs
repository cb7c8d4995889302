#[cfg(feature = "swagger")]
pub mod openapi;
pub mod cpu;
pub mod error;
pub mod health;

use axum::{
    http::{HeaderName, HeaderValue},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::Config;

/// Response header naming the worker slot that served the request.
pub const WORKER_HEADER: &str = "x-worker-id";

/// Label used in [`WORKER_HEADER`] for a worker that runs without a supervisor.
pub const STANDALONE_WORKER: &str = "standalone";

pub fn router(cfg: &Config, worker_slot: Option<usize>) -> Router {
    let mut router = Router::new()
        .nest("/api/cpu", cpu::router())
        .route("/healthz", get(health::healthz));

    if cfg.server.enable_cors {
        use axum::http::{header, Method};
        use tower_http::cors::Any;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    let worker_id = match worker_slot {
        Some(slot) => HeaderValue::from(slot),
        None => HeaderValue::from_static(STANDALONE_WORKER),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
                .layer(CatchPanicLayer::custom(error::handle_panic)),
        )
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(WORKER_HEADER),
            worker_id,
        ))
        .layer(TraceLayer::new_for_http())
}

#[cfg(feature = "swagger")]
pub fn with_swagger(app: Router, cfg: &Config) -> Router {
    use utoipa_swagger_ui::SwaggerUi;
    let doc = openapi::document(&cfg.server.public_url());
    app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", doc))
}
