use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use shared_models::auth::AuthToken;

use crate::models::{SlotError, SlotWindow};
use crate::services::slots::SlotService;

type StreamKey = (String, Option<NaiveDate>);

/// Keeps a slot window fresh so concurrent bookings by other patients show up.
///
/// One background task per (doctor, start date) recomputes the window every
/// `interval` and publishes it only when the bookable slots changed. Later
/// subscribers to the same window join the running task. The task ends once
/// every receiver has been dropped.
#[derive(Clone)]
pub struct SlotRefresher {
    service: Arc<SlotService>,
    interval: Duration,
    streams: Arc<Mutex<HashMap<StreamKey, Arc<watch::Sender<SlotWindow>>>>>,
}

impl SlotRefresher {
    pub fn new(service: Arc<SlotService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of windows currently being polled.
    pub fn active_streams(&self) -> usize {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn join_existing(&self, key: &StreamKey) -> Option<watch::Receiver<SlotWindow>> {
        let streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.get(key).map(|sender| sender.subscribe())
    }

    pub async fn subscribe(
        &self,
        doctor_id: &str,
        from: Option<NaiveDate>,
        auth: Option<AuthToken>,
    ) -> Result<watch::Receiver<SlotWindow>, SlotError> {
        let doctor_id = doctor_id.trim().to_string();
        let key = (doctor_id.clone(), from);

        if let Some(receiver) = self.join_existing(&key) {
            debug!("Joined running slot refresher for doctor {}", doctor_id);
            return Ok(receiver);
        }

        let initial = self.service.window(&doctor_id, from, auth.as_ref()).await?;

        let (sender, receiver) = {
            let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
            // Another subscriber may have started the same window meanwhile
            if let Some(existing) = streams.get(&key) {
                return Ok(existing.subscribe());
            }
            let (sender, receiver) = watch::channel(initial);
            let sender = Arc::new(sender);
            streams.insert(key.clone(), Arc::clone(&sender));
            (sender, receiver)
        };

        let service = Arc::clone(&self.service);
        let streams = Arc::clone(&self.streams);
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the initial window is already published.
            ticker.tick().await;

            info!("Slot refresher started for doctor {} every {:?}", doctor_id, period);

            loop {
                tokio::select! {
                    _ = sender.closed() => {
                        let idle = {
                            let mut streams = streams.lock().unwrap_or_else(PoisonError::into_inner);
                            let idle = sender.receiver_count() == 0;
                            if idle {
                                streams.remove(&key);
                            }
                            idle
                        };
                        if idle {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match service.window(&doctor_id, from, auth.as_ref()).await {
                            Ok(next) => {
                                let changed = sender.send_if_modified(|current| {
                                    if current.same_slots(&next) {
                                        false
                                    } else {
                                        *current = next;
                                        true
                                    }
                                });
                                if changed {
                                    debug!("Slot window for doctor {} changed", doctor_id);
                                }
                            }
                            Err(e) => warn!("Slot refresh for doctor {} failed: {}", doctor_id, e),
                        }
                    }
                }
            }

            info!("Slot refresher for doctor {} stopped", doctor_id);
        });

        Ok(receiver)
    }
}
