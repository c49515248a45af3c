// libs/doctor-cell/src/services/availability.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, warn};

use shared_backend::BackendClient;
use shared_models::auth::AuthToken;

use crate::models::{format_slot_date, AvailabilitySource, SlotAvailabilityResponse, UnavailableSlotSet};
use crate::services::booked_cache::BookedSlotsCache;

pub struct AvailabilityService {
    backend: BackendClient,
    cache: Arc<BookedSlotsCache>,
}

impl AvailabilityService {
    pub fn new(backend: BackendClient, cache: Arc<BookedSlotsCache>) -> Self {
        Self { backend, cache }
    }

    /// Unavailable time strings for a doctor on a date, straight from the backend.
    pub async fn fetch_unavailable_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        auth: Option<&AuthToken>,
    ) -> Result<UnavailableSlotSet> {
        let slot_date = format_slot_date(date);
        let path = format!(
            "/api/user/slot-availability/{}/{}",
            urlencoding::encode(doctor_id),
            urlencoding::encode(&slot_date)
        );

        let response: SlotAvailabilityResponse = self
            .backend
            .call(Method::GET, &path, auth, None)
            .await
            .with_context(|| format!("slot availability for doctor {} on {}", doctor_id, slot_date))?;

        Ok(response.unavailable_slots.iter().collect())
    }

    /// Never fails: a failed lookup degrades to the cached set, then to an empty one.
    pub async fn unavailable_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        auth: Option<&AuthToken>,
    ) -> (UnavailableSlotSet, AvailabilitySource) {
        match self.fetch_unavailable_slots(doctor_id, date, auth).await {
            Ok(set) => {
                debug!("Doctor {} has {} unavailable slots on {}", doctor_id, set.len(), date);
                self.cache.store(doctor_id, date, set.clone()).await;
                (set, AvailabilitySource::Backend)
            }
            Err(e) => match self.cache.get(doctor_id, date).await {
                Some(cached) => {
                    warn!("Availability lookup failed, using cached booked slots: {:#}", e);
                    (cached, AvailabilitySource::Cache)
                }
                None => {
                    warn!("Availability lookup failed and nothing cached: {:#}", e);
                    (UnavailableSlotSet::new(), AvailabilitySource::Unknown)
                }
            },
        }
    }
}
