// libs/doctor-cell/src/handlers.rs
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;
use shared_utils::extractor::patient_token_from_headers;

use crate::models::{SlotWindow, SlotWindowQuery};
use crate::router::DoctorCellState;

pub async fn list_doctors(
    State(state): State<Arc<DoctorCellState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = patient_token_from_headers(&headers)?;

    let doctors = state.slots.doctors().list_doctors(token.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

pub async fn get_slot_window(
    State(state): State<Arc<DoctorCellState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotWindowQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = patient_token_from_headers(&headers)?;

    let window = state.slots.window(&doctor_id, query.from, token.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "window": window
    })))
}

/// Server-sent events: one `slots` event with the current window, then one
/// per change detected by the refresher.
pub async fn stream_slot_window(
    State(state): State<Arc<DoctorCellState>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotWindowQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let token = patient_token_from_headers(&headers)?;

    let receiver = state.refresher.subscribe(&doctor_id, query.from, token).await?;

    let events = stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let window = receiver.borrow_and_update().clone();
        Some((Ok(window_event(&window)), (receiver, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn window_event(window: &SlotWindow) -> Event {
    Event::default().event("slots").json_data(window).unwrap_or_else(|e| {
        warn!("Failed to encode slot window event: {}", e);
        Event::default().event("error").data("encoding failed")
    })
}
