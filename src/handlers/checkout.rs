use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct CheckoutSubmitRequest {
    /// Values for the product-declared checkout fields, keyed by name
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub include_order_bump: bool,
}

/// GET /checkout/:slug
async fn get_checkout_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state.services.checkout.get_checkout_page(&slug).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /checkout/:slug
async fn submit_checkout(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<CheckoutSubmitRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let submission = state
        .services
        .checkout
        .submit_checkout(&slug, payload.fields, payload.include_order_bump)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(submission))))
}

/// GET /orders/:id/status
async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.checkout.get_order_status(id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// POST /orders/:id/upsell/accept
async fn accept_upsell(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.checkout.accept_upsell(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "order_id": id,
        "upsell_accepted": true
    }))))
}

/// DELETE /orders/:id/payment-watch
async fn cancel_payment_watch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.checkout.cancel_payment_watch(id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/:slug", get(get_checkout_page).post(submit_checkout))
        .route("/orders/:id/status", get(order_status))
        .route("/orders/:id/upsell/accept", axum::routing::post(accept_upsell))
        .route(
            "/orders/:id/payment-watch",
            axum::routing::delete(cancel_payment_watch),
        )
}
