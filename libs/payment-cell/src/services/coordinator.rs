use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use shared_backend::{BackendClient, BackendError};
use shared_config::{AppConfig, CheckoutPolicy};
use shared_models::auth::AuthToken;
use shared_models::reservation::TemporaryReservation;

use crate::error::PaymentError;
use crate::models::{
    Checkout, CheckoutOptions, CheckoutOutcome, CheckoutState, GatewayEvent, GatewayPaymentResponse,
    PaymentOrder, PaymentOrderResponse, ReleaseReason, Settlement, SweepReport,
};
use crate::services::registry::CheckoutRegistry;

/// Turns a temporary reservation into a paid appointment, or releases it.
///
/// Every way out of `AwaitingPayment` other than a verified payment ends in
/// exactly one call to the reservation cancellation endpoint. Work that must
/// reach a final state runs on its own task, so it finishes even when the
/// request that started it is dropped.
#[derive(Clone)]
pub struct PaymentCoordinator {
    backend: BackendClient,
    registry: Arc<CheckoutRegistry>,
    key_id: String,
    clinic_name: String,
    policy: CheckoutPolicy,
}

impl PaymentCoordinator {
    pub fn new(config: &AppConfig, backend: BackendClient) -> Self {
        Self {
            backend,
            registry: Arc::new(CheckoutRegistry::new()),
            key_id: config.razorpay_key_id.clone(),
            clinic_name: config.clinic_name.clone(),
            policy: config.checkout_policy.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<CheckoutRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    /// Whether a gateway key is available to open checkouts with.
    pub fn is_configured(&self) -> bool {
        !self.key_id.is_empty()
    }

    /// Exchanges the reservation for a gateway order and returns the options
    /// for the checkout widget. On failure the reservation is released before
    /// the error is returned.
    #[instrument(skip(self, owner, reservation), fields(reservation = %reservation.id))]
    pub async fn open_checkout(
        &self,
        reservation: TemporaryReservation,
        owner: AuthToken,
    ) -> Result<CheckoutOptions, PaymentError> {
        let this = self.clone();
        tokio::spawn(async move { this.start_checkout(reservation, owner).await })
            .await
            .map_err(|e| PaymentError::Interrupted(e.to_string()))?
    }

    async fn start_checkout(
        &self,
        reservation: TemporaryReservation,
        owner: AuthToken,
    ) -> Result<CheckoutOptions, PaymentError> {
        let checkout = Checkout::new(reservation.id, owner);

        if !self.is_configured() {
            warn!("Gateway key missing, releasing reservation {}", checkout.reservation_id);
            self.cancel_reservation(&checkout).await;
            return Err(PaymentError::GatewayNotConfigured);
        }

        let checkout_id = match self.registry.insert(checkout.clone()).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Releasing reservation {}: {}", checkout.reservation_id, e);
                self.cancel_reservation(&checkout).await;
                return Err(e);
            }
        };

        let order = match self.create_order(&checkout).await {
            Ok(order) => order,
            Err(e) => {
                error!("Order creation failed for checkout {}: {}", checkout_id, e);
                let reason = ReleaseReason::OrderCreationFailed {
                    message: e.server_message().unwrap_or("Could not start payment").to_string(),
                };
                self.release(&checkout, reason).await;
                return Err(PaymentError::OrderCreation(e));
            }
        };

        self.registry.record_order(checkout_id, order.clone()).await?;
        self.registry.transition(checkout_id, CheckoutState::AwaitingPayment).await?;

        info!("Checkout {} awaiting payment for order {}", checkout_id, order.id);

        Ok(CheckoutOptions {
            checkout_id,
            key: self.key_id.clone(),
            amount: order.amount,
            currency: order.currency,
            name: self.clinic_name.clone(),
            description: "Appointment Payment".to_string(),
            order_id: order.id,
            receipt: order.receipt,
        })
    }

    /// Applies a gateway callback to an awaiting checkout.
    #[instrument(skip(self, owner, event))]
    pub async fn handle_event(
        &self,
        checkout_id: Uuid,
        owner: &AuthToken,
        event: GatewayEvent,
    ) -> Result<CheckoutOutcome, PaymentError> {
        let checkout = self.registry.claim(checkout_id, Some(owner)).await?;

        let this = self.clone();
        tokio::spawn(async move { this.settle(checkout, Settlement::from(event)).await })
            .await
            .map_err(|e| PaymentError::Interrupted(e.to_string()))
    }

    pub async fn status(&self, checkout_id: Uuid, owner: &AuthToken) -> Result<Checkout, PaymentError> {
        self.registry.get_for(checkout_id, owner).await
    }

    async fn settle(&self, checkout: Checkout, settlement: Settlement) -> CheckoutOutcome {
        match settlement {
            Settlement::Verify(response) => match self.verify_payment(&checkout, &response).await {
                Ok(()) => {
                    self.finish(&checkout, CheckoutState::Confirmed).await;
                    info!("Checkout {} confirmed", checkout.id);
                    CheckoutOutcome::confirmed(checkout.id)
                }
                Err(e) => {
                    warn!("Payment verification failed for checkout {}: {}", checkout.id, e);
                    let reason = ReleaseReason::VerificationFailed {
                        message: e.server_message().unwrap_or("verification error").to_string(),
                    };
                    self.release(&checkout, reason.clone()).await;
                    CheckoutOutcome::released(checkout.id, reason)
                }
            },
            Settlement::Release(reason) => {
                self.release(&checkout, reason.clone()).await;
                CheckoutOutcome::released(checkout.id, reason)
            }
        }
    }

    /// Releases open checkouts untouched for longer than the TTL, including
    /// ones stuck mid-settlement, and drops finished checkouts older than the TTL.
    pub async fn sweep(&self) -> SweepReport {
        let ttl = chrono::Duration::from_std(self.policy.ttl).unwrap_or_else(|_| chrono::Duration::minutes(15));
        let cutoff = Utc::now() - ttl;
        let mut report = SweepReport::default();

        for checkout_id in self.registry.stale_before(cutoff).await {
            // A callback may have moved it on in the meantime
            let Some(checkout) = self.registry.reclaim_stale(checkout_id, cutoff).await else {
                continue;
            };
            info!("Checkout {} expired without payment", checkout_id);
            self.settle(checkout, Settlement::Release(ReleaseReason::Expired)).await;
            report.expired += 1;
        }

        report.purged = self.registry.purge_terminal_before(cutoff).await;
        report
    }

    async fn create_order(&self, checkout: &Checkout) -> Result<PaymentOrder, BackendError> {
        let response: PaymentOrderResponse = self
            .backend
            .call(
                Method::POST,
                "/api/user/payment-razorpay",
                Some(&checkout.owner),
                Some(json!({ "tempReservationId": checkout.reservation_id })),
            )
            .await?;
        Ok(response.order)
    }

    async fn verify_payment(
        &self,
        checkout: &Checkout,
        response: &GatewayPaymentResponse,
    ) -> Result<(), BackendError> {
        let _: Value = self
            .backend
            .call(
                Method::POST,
                "/api/user/verify-razorpay",
                Some(&checkout.owner),
                Some(json!({
                    "razorpay_order_id": response.razorpay_order_id,
                    "razorpay_payment_id": response.razorpay_payment_id,
                    "razorpay_signature": response.razorpay_signature,
                    "tempReservationId": checkout.reservation_id,
                })),
            )
            .await?;
        Ok(())
    }

    async fn release(&self, checkout: &Checkout, reason: ReleaseReason) {
        self.cancel_reservation(checkout).await;
        self.finish(checkout, CheckoutState::Released { reason }).await;
    }

    /// Best effort: failures are logged and server-side expiry is the backstop.
    async fn cancel_reservation(&self, checkout: &Checkout) {
        let result: Result<Value, BackendError> = self
            .backend
            .call(
                Method::POST,
                "/api/user/cancel-payment",
                Some(&checkout.owner),
                Some(json!({ "tempReservationId": checkout.reservation_id })),
            )
            .await;

        match result {
            Ok(_) => info!("Released reservation {}", checkout.reservation_id),
            Err(e) => error!("Failed to release reservation {}: {}", checkout.reservation_id, e),
        }
    }

    async fn finish(&self, checkout: &Checkout, state: CheckoutState) {
        // Only reachable from a claimed or freshly inserted checkout
        if let Err(e) = self.registry.transition(checkout.id, state).await {
            if !matches!(e, PaymentError::CheckoutNotFound(_)) {
                error!("Could not record final state of checkout {}: {}", checkout.id, e);
            }
        }
    }
}
