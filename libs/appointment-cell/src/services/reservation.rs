use reqwest::Method;
use tracing::{info, instrument, warn};

use shared_backend::{BackendClient, BackendError};
use shared_models::auth::AuthToken;
use shared_models::reservation::TemporaryReservation;

use crate::models::AppointmentDraft;

/// Submits validated drafts to the clinic backend.
#[derive(Clone)]
pub struct ReservationService {
    backend: BackendClient,
}

impl ReservationService {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// One call to the booking endpoint. A rejected draft (slot taken,
    /// doctor unavailable) comes back as [`BackendError::Rejected`] carrying
    /// the server's message.
    #[instrument(skip(self, draft, token), fields(doctor = %draft.doc_id, date = %draft.slot_date, time = %draft.slot_time))]
    pub async fn submit(
        &self,
        draft: &AppointmentDraft,
        token: &AuthToken,
    ) -> Result<TemporaryReservation, BackendError> {
        let body = serde_json::to_value(draft)?;

        let result: Result<TemporaryReservation, BackendError> = self
            .backend
            .call(Method::POST, "/api/user/book-appointment", Some(token), Some(body))
            .await;

        match &result {
            Ok(reservation) => info!("Slot held under reservation {}", reservation.id),
            Err(e) => warn!("Booking request rejected: {}", e),
        }

        result
    }
}
