//! REST API over the collector.

#[cfg(feature = "diagnostics")]
pub mod debug;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use chrono::{SecondsFormat, Utc};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    let router = Router::new()
        .route("/api/flights", get(handlers::list_flights))
        .route("/api/flights/{id}", get(handlers::get_flight))
        .route("/api/regions", get(handlers::list_regions))
        .route("/api/statistics", get(handlers::get_statistics))
        .route("/health", get(handlers::health));

    #[cfg(feature = "diagnostics")]
    let router = router.route("/api/debug/opensky", get(debug::opensky));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin without credentials; anything else is matched
/// exactly and may send credentials.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origin == "*" {
        return base.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => base
            .allow_origin(AllowOrigin::exact(value))
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
            base
        }
    }
}

/// Current time as ISO-8601 with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
