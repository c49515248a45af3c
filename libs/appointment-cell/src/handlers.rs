use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::AuthToken;
use shared_models::error::AppError;

use crate::models::BookAppointmentRequest;
use crate::services::BookingFlow;

#[axum::debug_handler]
pub async fn book_appointment(
    State(flow): State<Arc<BookingFlow>>,
    Extension(token): Extension<AuthToken>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let confirmation = flow.book(request, token).await?;

    Ok(Json(json!({
        "success": true,
        "message": confirmation.message,
        "tempReservationId": confirmation.temp_reservation_id,
        "checkout": confirmation.checkout
    })))
}
