use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::PaymentCoordinator;

pub fn payment_routes(coordinator: Arc<PaymentCoordinator>) -> Router {
    // Gateway widget callbacks, relayed by the patient UI
    Router::new()
        .route("/{checkout_id}", get(handlers::get_checkout))
        .route("/{checkout_id}/success", post(handlers::payment_succeeded))
        .route("/{checkout_id}/failure", post(handlers::payment_failed))
        .route("/{checkout_id}/dismiss", post(handlers::payment_dismissed))
        .layer(middleware::from_fn(auth_middleware))
        .with_state(coordinator)
}
