use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use tracing::{debug, instrument};

use shared_backend::BackendClient;
use shared_config::SlotPolicy;
use shared_models::auth::AuthToken;
use shared_utils::clock::Clock;

use crate::models::{AvailabilitySource, SlotError, SlotWindow, UnavailableSlotSet};
use crate::services::availability::AvailabilityService;
use crate::services::booked_cache::BookedSlotsCache;
use crate::services::doctor::DoctorService;
use crate::services::generator::SlotGenerator;

/// Builds rolling slot windows for doctors. Constructed once at startup and
/// shared by reference.
pub struct SlotService {
    availability: AvailabilityService,
    doctors: DoctorService,
    generator: SlotGenerator,
    cache: Arc<BookedSlotsCache>,
    clock: Arc<dyn Clock>,
}

impl SlotService {
    pub fn new(backend: BackendClient, policy: SlotPolicy, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(BookedSlotsCache::new());

        Self {
            availability: AvailabilityService::new(backend.clone(), Arc::clone(&cache)),
            doctors: DoctorService::new(backend, Arc::clone(&cache)),
            generator: SlotGenerator::new(policy),
            cache,
            clock,
        }
    }

    pub fn doctors(&self) -> &DoctorService {
        &self.doctors
    }

    pub fn generator(&self) -> &SlotGenerator {
        &self.generator
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache(&self) -> &Arc<BookedSlotsCache> {
        &self.cache
    }

    /// Window of `window_days` days starting at `from` (today when `None`).
    ///
    /// Each day's unavailable set is looked up independently; a failed lookup
    /// only affects that day and falls back to cached data.
    #[instrument(skip(self, auth))]
    pub async fn window(
        &self,
        doctor_id: &str,
        from: Option<NaiveDate>,
        auth: Option<&AuthToken>,
    ) -> Result<SlotWindow, SlotError> {
        let doctor_id = doctor_id.trim();
        if doctor_id.is_empty() {
            return Err(SlotError::MissingDoctorId);
        }

        let now = self.clock.now();
        let today = now.date();
        let start_date = from.unwrap_or(today);

        let horizon = today + Duration::days(i64::from(self.generator.policy().max_advance_days));
        if start_date > horizon {
            return Err(SlotError::OutOfRange { from: start_date, horizon });
        }

        let dates = self.generator.window_dates(start_date);

        // Days that are already over have no bookable slots to check
        let lookups = dates.iter().map(|date| async move {
            if *date < today {
                (UnavailableSlotSet::new(), AvailabilitySource::Backend)
            } else {
                self.availability.unavailable_slots(doctor_id, *date, auth).await
            }
        });
        let unavailable = join_all(lookups).await;

        self.cache.evict_before(today).await;

        let days = dates
            .into_iter()
            .zip(unavailable)
            .map(|(date, (set, source))| self.generator.day_slots(date, now, &set, source))
            .collect::<Vec<_>>();

        debug!(
            "Generated window for doctor {} from {}: {} bookable slots",
            doctor_id,
            start_date,
            days.iter().map(|d| d.slots.len()).sum::<usize>()
        );

        Ok(SlotWindow {
            doctor_id: doctor_id.to_string(),
            start_date,
            generated_at: now,
            days,
        })
    }
}
