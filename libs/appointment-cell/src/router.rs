use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::BookingFlow;

pub fn appointment_routes(flow: Arc<BookingFlow>) -> Router {
    // Booking always acts on behalf of a signed-in patient
    Router::new()
        .route("/book", post(handlers::book_appointment))
        .layer(middleware::from_fn(auth_middleware))
        .with_state(flow)
}
