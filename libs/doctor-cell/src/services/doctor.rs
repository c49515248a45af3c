use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, info};

use shared_backend::{BackendClient, BackendError};
use shared_models::auth::AuthToken;

use crate::models::{Doctor, DoctorListResponse};
use crate::services::booked_cache::BookedSlotsCache;

pub struct DoctorService {
    backend: BackendClient,
    cache: Arc<BookedSlotsCache>,
}

impl DoctorService {
    pub fn new(backend: BackendClient, cache: Arc<BookedSlotsCache>) -> Self {
        Self { backend, cache }
    }

    /// Loads the doctor directory and refreshes the booked-slots fallback from it.
    pub async fn list_doctors(&self, auth: Option<&AuthToken>) -> Result<Vec<Doctor>, BackendError> {
        debug!("Fetching doctor directory");

        let response: DoctorListResponse = self
            .backend
            .call(Method::GET, "/api/doctor/list", auth, None)
            .await?;

        let seeded = self.cache.seed_from_doctors(&response.doctors).await;
        info!("Loaded {} doctors ({} booked-slot days cached)", response.doctors.len(), seeded);

        Ok(response.doctors)
    }
}
