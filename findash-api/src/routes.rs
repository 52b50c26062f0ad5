//! HTTP routes for the screening service.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::engine::ScreenOutput;
use crate::error::ScreenError;
use crate::models::{iso_date, Candle};
use crate::screen::{Projection, ScreenKind, ScreenParams, ScreenRequest};
use crate::ScreenerState;

type AppState = State<Arc<ScreenerState>>;
type ScreenQueryParams = Result<Query<ScreenParams>, QueryRejection>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Query parameters of the price history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PriceDataParams {
    pub days: Option<String>,
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
///
/// Every screen kind is served at each of its paths, in identity shape, and
/// at `<path>/with-price` in priced shape.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let network = state.config.network.clone();

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/maxdate", get(max_date))
        .route("/price-data/:symbol", get(price_data));

    for kind in ScreenKind::ALL {
        for path in kind.paths() {
            router = router
                .route(
                    path,
                    get(move |state: AppState, params: ScreenQueryParams| {
                        run_screen(state, params, kind, Projection::Identity)
                    }),
                )
                .route(
                    &format!("{}/with-price", path),
                    get(move |state: AppState, params: ScreenQueryParams| {
                        run_screen(state, params, kind, Projection::Priced)
                    }),
                );
        }
    }

    let mut router = router
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(network.request_timeout_secs),
        ));

    if network.cors_allow_any {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Financial Dashboard API".into(),
    })
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "findash-api".into(),
    })
}

/// Latest bar date of the reference symbol, as a bare JSON string.
async fn max_date(State(state): State<Arc<ScreenerState>>) -> Result<Json<String>, ScreenError> {
    let date = state.engine.latest_date().await?;
    Ok(Json(date.format(iso_date::FORMAT).to_string()))
}

async fn price_data(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
    params: Result<Query<PriceDataParams>, QueryRejection>,
) -> Result<Json<Vec<Candle>>, ScreenError> {
    let Query(params) = params.map_err(query_rejected)?;
    let today = chrono::Local::now().date_naive();
    let candles = state
        .engine
        .price_history(&symbol, params.days.as_deref(), today)
        .await?;
    Ok(Json(candles))
}

/// Shared evaluation for every screen path; `kind` and `projection` are
/// fixed when the route is registered.
async fn run_screen(
    State(state): AppState,
    params: ScreenQueryParams,
    kind: ScreenKind,
    projection: Projection,
) -> Result<Json<ScreenOutput>, ScreenError> {
    let Query(params) = params.map_err(query_rejected)?;
    let request = ScreenRequest::resolve(kind, &params).map_err(|e| {
        tracing::debug!(kind = ?kind, error = %e, "Rejected screen parameters");
        e
    })?;
    let output = state.engine.screen(&request, projection).await?;
    Ok(Json(output))
}

/// Malformed query strings (bad encoding, repeated keys) get the same error
/// envelope as every other invalid argument.
fn query_rejected(rejection: QueryRejection) -> ScreenError {
    ScreenError::invalid("query", rejection.body_text())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_response() {
        let Json(health) = health().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "findash-api");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_root_message() {
        let Json(welcome) = root().await;
        assert_eq!(welcome.message, "Welcome to Financial Dashboard API");
    }

    #[test]
    fn test_every_screen_path_is_rooted() {
        for kind in ScreenKind::ALL {
            for path in kind.paths() {
                assert!(path.starts_with('/'));
                assert!(!path.ends_with('/'));
            }
        }
    }
}
