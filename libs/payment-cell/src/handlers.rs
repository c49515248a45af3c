use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::AuthToken;
use shared_models::error::AppError;

use crate::models::{CheckoutOutcome, GatewayEvent, GatewayPaymentResponse, PaymentFailedRequest};
use crate::services::PaymentCoordinator;

pub async fn get_checkout(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    Extension(token): Extension<AuthToken>,
    Path(checkout_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let checkout = coordinator.status(checkout_id, &token).await?;

    Ok(Json(json!({
        "success": true,
        "checkout": checkout
    })))
}

pub async fn payment_succeeded(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    Extension(token): Extension<AuthToken>,
    Path(checkout_id): Path<Uuid>,
    Json(response): Json<GatewayPaymentResponse>,
) -> Result<Json<CheckoutOutcome>, AppError> {
    let outcome = coordinator
        .handle_event(checkout_id, &token, GatewayEvent::Succeeded(response))
        .await?;
    Ok(Json(outcome))
}

pub async fn payment_failed(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    Extension(token): Extension<AuthToken>,
    Path(checkout_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<CheckoutOutcome>, AppError> {
    // The widget may relay the failure without details
    let failure = if body.is_empty() {
        Default::default()
    } else {
        serde_json::from_slice::<PaymentFailedRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid failure payload: {}", e)))?
            .error
    };
    let outcome = coordinator
        .handle_event(checkout_id, &token, GatewayEvent::Failed(failure))
        .await?;
    Ok(Json(outcome))
}

pub async fn payment_dismissed(
    State(coordinator): State<Arc<PaymentCoordinator>>,
    Extension(token): Extension<AuthToken>,
    Path(checkout_id): Path<Uuid>,
) -> Result<Json<CheckoutOutcome>, AppError> {
    let outcome = coordinator
        .handle_event(checkout_id, &token, GatewayEvent::Dismissed)
        .await?;
    Ok(Json(outcome))
}
