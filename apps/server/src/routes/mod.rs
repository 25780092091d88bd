//! # Route Table

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod sales;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/stores/{store_id}/sales",
            post(sales::submit_sale).get(sales::list_sales),
        )
        .route("/invoice/{token}", get(sales::get_invoice))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> crate::error::ApiResult<&'static str> {
    if state.db.health_check().await {
        Ok("ok")
    } else {
        Err(crate::error::ApiError::new(
            crate::error::ErrorCode::InternalError,
            "database unavailable",
        ))
    }
}
