// libs/doctor-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::{SlotRefresher, SlotService};

/// Shared state for the doctor and slot routes.
pub struct DoctorCellState {
    pub slots: Arc<SlotService>,
    pub refresher: SlotRefresher,
}

impl DoctorCellState {
    pub fn new(slots: Arc<SlotService>) -> Self {
        let interval = slots.generator().policy().refresh_interval;
        let refresher = SlotRefresher::new(Arc::clone(&slots), interval);
        Self { slots, refresher }
    }
}

pub fn doctor_routes(state: Arc<DoctorCellState>) -> Router {
    // Slot views are public; a patient token is forwarded when present
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}/slots", get(handlers::get_slot_window))
        .route("/{doctor_id}/slots/stream", get(handlers::stream_slot_window))
        .with_state(state)
}
