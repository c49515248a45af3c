use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{parse_booked_date_key, Doctor, UnavailableSlotSet};

/// Default bound on cached (doctor, date) entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Last known unavailable slots per (doctor, date), used when the live
/// availability lookup fails.
///
/// Holds at most `capacity` entries; when full, the entries for the earliest
/// dates are dropped first.
pub struct BookedSlotsCache {
    entries: RwLock<HashMap<(String, NaiveDate), UnavailableSlotSet>>,
    capacity: usize,
}

impl Default for BookedSlotsCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl BookedSlotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, doctor_id: &str, date: NaiveDate) -> Option<UnavailableSlotSet> {
        let entries = self.entries.read().await;
        entries.get(&(doctor_id.to_string(), date)).cloned()
    }

    pub async fn store(&self, doctor_id: &str, date: NaiveDate, set: UnavailableSlotSet) {
        let mut entries = self.entries.write().await;
        entries.insert((doctor_id.to_string(), date), set);
        trim_to(&mut entries, self.capacity);
    }

    /// Drops entries for days that are already over.
    pub async fn evict_before(&self, today: NaiveDate) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(_, date), _| *date >= today);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Evicted {} past booked-slot entries", evicted);
        }
        evicted
    }

    /// Seeds the cache from the `slots_booked` map of directory records.
    /// Keys that are not recognisable dates are skipped.
    pub async fn seed_from_doctors(&self, doctors: &[Doctor]) -> usize {
        let mut entries = self.entries.write().await;
        let mut seeded = 0;

        for doctor in doctors {
            for (key, times) in &doctor.slots_booked {
                let Some(date) = parse_booked_date_key(key) else {
                    debug!("Skipping booked-slots key {:?} for doctor {}", key, doctor.id);
                    continue;
                };
                entries.insert((doctor.id.clone(), date), times.iter().collect());
                seeded += 1;
            }
        }

        trim_to(&mut entries, self.capacity);
        seeded
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn trim_to(entries: &mut HashMap<(String, NaiveDate), UnavailableSlotSet>, capacity: usize) {
    if entries.len() <= capacity {
        return;
    }

    let mut keys: Vec<_> = entries.keys().cloned().collect();
    keys.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let excess = entries.len() - capacity;
    for key in keys.into_iter().take(excess) {
        entries.remove(&key);
    }
    warn!("Booked-slot cache full, dropped {} oldest entries", excess);
}
