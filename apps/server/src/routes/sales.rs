//! # Sale Endpoints
//!
//! The sale submission wire contract:
//!
//! ```text
//! POST /api/stores/{store_id}/sales      submit a sale       → 201 receipt
//! GET  /api/stores/{store_id}/sales      list recent sales   → 200
//! GET  /invoice/{token}                  shared invoice view → 200
//! ```
//!
//! Store and user context arrive as headers (`x-store-id` overrides the
//! path, `x-user-id` identifies the cashier); a missing user header is a
//! 401. Full authentication is a fronting proxy's job.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use bodega_core::{Sale, SaleInput, SaleReceipt, SaleStatus};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;

/// Resolves the acting store and user from headers, path fallback for the
/// store. No user header means the request is anonymous: 401.
fn request_context(headers: &HeaderMap, path_store_id: &str) -> Result<(String, String), ApiError> {
    let store_id = headers
        .get("x-store-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(path_store_id)
        .to_string();

    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(ApiError::unauthorized)?;

    Ok((store_id, user_id))
}

/// POST /api/stores/{store_id}/sales
pub async fn submit_sale(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<SaleInput>,
) -> ApiResult<(StatusCode, Json<SaleReceipt>)> {
    let (store_id, user_id) = request_context(&headers, &store_id)?;

    info!(store_id, user_id, lines = input.lines.len(), "Sale submitted");

    let receipt = state
        .db
        .coordinator()
        .commit_sale(&store_id, &user_id, &input)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/stores/{store_id}/sales
#[derive(Deserialize)]
pub struct SalesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_sales(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SalesQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let (store_id, _user_id) = request_context(&headers, &store_id)?;

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<SaleStatus>(serde_json::Value::String(raw.to_string()))
                .map_err(|_| {
                    ApiError::new(ErrorCode::ValidationError, format!("unknown status: {raw}"))
                })?,
        ),
    };

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let sales = state.db.sales().list(&store_id, status, limit).await?;
    Ok(Json(sales))
}

/// GET /invoice/{token}
///
/// Public shared-receipt view, addressed by the unguessable access token.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SaleReceipt>> {
    let invoice = state
        .db
        .invoices()
        .get_by_token(&token)
        .await?
        .ok_or_else(|| ApiError::not_found("invoice not found"))?;

    let sale = state
        .db
        .sales()
        .get_by_id(&invoice.sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("sale not found"))?;
    let items = state.db.sales().get_items(&invoice.sale_id).await?;

    Ok(Json(SaleReceipt {
        sale,
        items,
        invoice_url: Some(bodega_db::repository::invoice::invoice_url(
            &invoice.access_token,
        )),
    }))
}
