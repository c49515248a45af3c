use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::coordinator::PaymentCoordinator;

/// Periodically releases abandoned checkouts.
pub fn spawn_checkout_sweeper(coordinator: Arc<PaymentCoordinator>) -> JoinHandle<()> {
    let period = coordinator.policy().sweep_interval.max(Duration::from_secs(1));

    tokio::spawn(async move {
        info!("Checkout sweeper running every {:?}", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = coordinator.sweep().await;
            if report.expired > 0 || report.purged > 0 {
                info!("Checkout sweep: {} expired, {} purged", report.expired, report.purged);
            } else {
                debug!("Checkout sweep found nothing to do");
            }
        }
    })
}
