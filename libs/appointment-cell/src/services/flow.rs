use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, instrument, warn};

use payment_cell::{PaymentCoordinator, PaymentError};
use shared_models::auth::AuthToken;
use shared_utils::clock::Clock;

use crate::models::{AppointmentDraft, AppointmentError, BookAppointmentRequest, BookingConfirmation};
use crate::services::reservation::ReservationService;
use crate::services::validation::validate_draft;

type InFlight = Arc<Mutex<HashSet<AuthToken>>>;

/// End-to-end booking attempt: validate, hold the slot, open checkout.
///
/// Calls within one attempt are strictly sequential and a patient token can
/// only have one attempt in flight or awaiting payment at a time. Once a hold
/// is requested the attempt runs on its own task, so a dropped request still
/// ends with an open checkout or a released hold.
pub struct BookingFlow {
    reservations: ReservationService,
    payments: Arc<PaymentCoordinator>,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
}

impl BookingFlow {
    pub fn new(reservations: ReservationService, payments: Arc<PaymentCoordinator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            reservations,
            payments,
            clock,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn payments(&self) -> &Arc<PaymentCoordinator> {
        &self.payments
    }

    #[instrument(skip(self, request, token), fields(doctor = %request.doc_id))]
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
        token: AuthToken,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let draft = validate_draft(request, self.clock.now())?;

        if !self.payments.is_configured() {
            warn!("Booking refused: payment gateway key is missing");
            return Err(PaymentError::GatewayNotConfigured.into());
        }

        let guard = InFlightGuard::acquire(&self.in_flight, &token)?;
        if self.payments.registry().has_open_for(&token).await {
            warn!("Booking refused: patient already has an open checkout");
            return Err(AppointmentError::BookingInProgress);
        }

        let reservations = self.reservations.clone();
        let payments = Arc::clone(&self.payments);

        tokio::spawn(async move {
            let _guard = guard;
            hold_and_checkout(&reservations, &payments, draft, token).await
        })
        .await
        .map_err(|e| AppointmentError::Interrupted(e.to_string()))?
    }
}

async fn hold_and_checkout(
    reservations: &ReservationService,
    payments: &PaymentCoordinator,
    draft: AppointmentDraft,
    token: AuthToken,
) -> Result<BookingConfirmation, AppointmentError> {
    let reservation = reservations.submit(&draft, &token).await?;
    let reservation_id = reservation.id.clone();

    let checkout = payments.open_checkout(reservation, token).await?;

    info!("Booking {} awaiting payment in checkout {}", reservation_id, checkout.checkout_id);

    Ok(BookingConfirmation {
        temp_reservation_id: reservation_id,
        message: "Slot reserved. Complete payment to confirm your appointment.".to_string(),
        checkout,
    })
}

/// Marks a token busy for the lifetime of one booking attempt.
#[derive(Debug)]
struct InFlightGuard {
    set: InFlight,
    token: AuthToken,
}

impl InFlightGuard {
    fn acquire(set: &InFlight, token: &AuthToken) -> Result<Self, AppointmentError> {
        let mut busy = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(token.clone()) {
            return Err(AppointmentError::BookingInProgress);
        }
        Ok(Self {
            set: Arc::clone(set),
            token: token.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut busy = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        busy.remove(&self.token);
    }
}
