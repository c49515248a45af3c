use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::AuthToken;
use shared_models::reservation::TempReservationId;

// ==============================================================================
// GATEWAY WIRE MODELS
// ==============================================================================

/// Gateway order tied 1:1 to a temporary reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    /// Smallest currency unit (paise for INR).
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentOrderResponse {
    pub order: PaymentOrder,
}

/// Everything the patient UI needs to open the gateway checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub checkout_id: Uuid,
    pub key: String,
    pub amount: u64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub receipt: Option<String>,
}

/// Payload of the gateway's success handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentResponse {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Error details reported by the gateway's `payment.failed` callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFailedRequest {
    #[serde(default)]
    pub error: GatewayFailure,
}

/// Callbacks the gateway widget can fire once checkout is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Succeeded(GatewayPaymentResponse),
    Failed(GatewayFailure),
    Dismissed,
}

// ==============================================================================
// CHECKOUT STATE MACHINE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseReason {
    PaymentFailed { description: String },
    Dismissed,
    VerificationFailed { message: String },
    OrderCreationFailed { message: String },
    Expired,
}

impl ReleaseReason {
    /// Toast shown to the patient.
    pub fn user_message(&self) -> String {
        match self {
            ReleaseReason::PaymentFailed { description } => {
                format!("Payment failed: {}. Your slot has been released.", description)
            }
            ReleaseReason::Dismissed => "Payment cancelled. Your slot has been released.".to_string(),
            ReleaseReason::VerificationFailed { message } => {
                format!("Payment could not be verified: {}", message)
            }
            ReleaseReason::OrderCreationFailed { message } => message.clone(),
            ReleaseReason::Expired => "Payment window expired. Please book again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutState {
    Initiated,
    OrderCreated,
    AwaitingPayment,
    /// A callback has been claimed and its network calls are in flight.
    Settling,
    Confirmed,
    Released { reason: ReleaseReason },
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Confirmed | CheckoutState::Released { .. })
    }

    /// Reservation is still held (or may be) and the patient has not finished.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, target: &CheckoutState) -> bool {
        use CheckoutState::*;
        match (self, target) {
            (Initiated, OrderCreated) => true,
            (OrderCreated, AwaitingPayment) => true,
            (AwaitingPayment, Settling) => true,
            (Settling, Confirmed) => true,
            // Release is possible until the checkout is finished
            (Initiated | OrderCreated | Settling, Released { .. }) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Initiated => "initiated",
            CheckoutState::OrderCreated => "order_created",
            CheckoutState::AwaitingPayment => "awaiting_payment",
            CheckoutState::Settling => "settling",
            CheckoutState::Confirmed => "confirmed",
            CheckoutState::Released { .. } => "released",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do with a gateway callback. Every variant other than `Verify`
/// releases the reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Verify(GatewayPaymentResponse),
    Release(ReleaseReason),
}

impl From<GatewayEvent> for Settlement {
    fn from(event: GatewayEvent) -> Self {
        match event {
            GatewayEvent::Succeeded(response) => Settlement::Verify(response),
            GatewayEvent::Failed(failure) => Settlement::Release(ReleaseReason::PaymentFailed {
                description: failure
                    .description
                    .or(failure.reason)
                    .unwrap_or_else(|| "payment was declined".to_string()),
            }),
            GatewayEvent::Dismissed => Settlement::Release(ReleaseReason::Dismissed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub id: Uuid,
    #[serde(skip)]
    pub owner: AuthToken,
    pub reservation_id: TempReservationId,
    pub order: Option<PaymentOrder>,
    #[serde(flatten)]
    pub state: CheckoutState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkout {
    pub fn new(reservation_id: TempReservationId, owner: AuthToken) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            reservation_id,
            order: None,
            state: CheckoutState::Initiated,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of handling a gateway callback.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub checkout_id: Uuid,
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub state: CheckoutState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Where the patient UI goes once an appointment is paid for.
pub const APPOINTMENTS_PAGE: &str = "/my-appointments";

impl CheckoutOutcome {
    pub fn confirmed(checkout_id: Uuid) -> Self {
        Self {
            checkout_id,
            success: true,
            message: "Payment successful. Your appointment is confirmed.".to_string(),
            state: CheckoutState::Confirmed,
            redirect: Some(APPOINTMENTS_PAGE.to_string()),
        }
    }

    pub fn released(checkout_id: Uuid, reason: ReleaseReason) -> Self {
        Self {
            checkout_id,
            success: false,
            message: reason.user_message(),
            state: CheckoutState::Released { reason },
            redirect: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub purged: usize,
}
