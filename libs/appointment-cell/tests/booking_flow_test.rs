use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio_test::assert_ok;
use serde_json::json;
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::{
    AppointmentError, BookAppointmentRequest, BookingFlow, EmergencyContact, ReservationService,
};
use payment_cell::{CheckoutState, GatewayEvent, PaymentCoordinator, PaymentError, ReleaseReason};
use shared_backend::BackendClient;
use shared_models::auth::AuthToken;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{clinic_time, test_patient_token, MockBackendResponses, TestConfig};

fn flow(mock_server: &MockServer) -> BookingFlow {
    let config = TestConfig::with_backend(&mock_server.uri()).to_app_config();
    let backend = BackendClient::new(&config);
    let payments = Arc::new(PaymentCoordinator::new(&config, backend.clone()));
    let clock = Arc::new(FixedClock::new(clinic_time(2025, 1, 15, 9, 0)));

    BookingFlow::new(ReservationService::new(backend), payments, clock)
}

fn form() -> BookAppointmentRequest {
    BookAppointmentRequest {
        doc_id: "doc1".to_string(),
        slot_date: "16/01/2025".to_string(),
        slot_time: "10:00 AM".to_string(),
        reason_for_visit: "Anxiety".to_string(),
        other_reason: None,
        session_type: "Online".to_string(),
        communication_method: Some("Video Call".to_string()),
        brief_notes: String::new(),
        emergency_contact: EmergencyContact::default(),
        consent_given: true,
    }
}

async fn expect_no_backend_calls(mock_server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(mock_server)
        .await;
}

async fn mount_booking_accepted(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::booking_accepted("abc123")))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .and(body_json(json!({ "tempReservationId": "abc123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::order_created("order_abc", 80000)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_missing_consent_never_reaches_backend() {
    let mock_server = MockServer::start().await;
    expect_no_backend_calls(&mock_server).await;

    let request = BookAppointmentRequest { consent_given: false, ..form() };
    let result = flow(&mock_server).book(request, test_patient_token()).await;

    assert_matches!(result, Err(AppointmentError::ConsentRequired));
}

#[tokio::test]
async fn test_online_without_method_never_reaches_backend() {
    let mock_server = MockServer::start().await;
    expect_no_backend_calls(&mock_server).await;

    let request = BookAppointmentRequest { communication_method: None, ..form() };
    let result = flow(&mock_server).book(request, test_patient_token()).await;

    assert_matches!(result, Err(AppointmentError::CommunicationMethodRequired));
}

#[tokio::test]
async fn test_past_slot_never_reaches_backend() {
    let mock_server = MockServer::start().await;
    expect_no_backend_calls(&mock_server).await;

    let request = BookAppointmentRequest {
        slot_date: "14/01/2025".to_string(),
        ..form()
    };
    let result = flow(&mock_server).book(request, test_patient_token()).await;

    assert_matches!(result, Err(AppointmentError::SlotInPast));
}

#[tokio::test]
async fn test_successful_booking_opens_checkout() {
    let mock_server = MockServer::start().await;
    mount_booking_accepted(&mock_server).await;

    let flow = flow(&mock_server);
    let confirmation = assert_ok!(flow.book(form(), test_patient_token()).await);

    assert_eq!(confirmation.temp_reservation_id.as_str(), "abc123");
    assert_eq!(confirmation.checkout.order_id, "order_abc");
    assert_eq!(confirmation.checkout.amount, 80000);

    let checkout = flow
        .payments()
        .status(confirmation.checkout.checkout_id, &test_patient_token())
        .await
        .unwrap();
    assert_eq!(checkout.state, CheckoutState::AwaitingPayment);
}

#[tokio::test]
async fn test_taken_slot_surfaces_server_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::rejected("Slot not available")))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let flow = flow(&mock_server);
    let result = flow.book(form(), test_patient_token()).await;
    assert_matches!(result, Err(AppointmentError::Submission(ref e)) if e.server_message() == Some("Slot not available"));

    // The patient can correct the form and try again
    let retry = flow.book(form(), test_patient_token()).await;
    assert_matches!(retry, Err(AppointmentError::Submission(_)));
}

#[tokio::test]
async fn test_dismissed_checkout_releases_reservation_once() {
    let mock_server = MockServer::start().await;
    mount_booking_accepted(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/api/user/cancel-payment"))
        .and(body_json(json!({ "tempReservationId": "abc123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::success("Reservation released")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let flow = flow(&mock_server);
    let token = test_patient_token();
    let confirmation = flow.book(form(), token.clone()).await.unwrap();

    let outcome = flow
        .payments()
        .handle_event(confirmation.checkout.checkout_id, &token, GatewayEvent::Dismissed)
        .await
        .unwrap();

    assert_eq!(outcome.state, CheckoutState::Released { reason: ReleaseReason::Dismissed });
}

#[tokio::test]
async fn test_second_booking_refused_while_awaiting_payment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::booking_accepted("abc123")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::order_created("order_abc", 80000)))
        .mount(&mock_server)
        .await;

    let flow = flow(&mock_server);
    flow.book(form(), test_patient_token()).await.unwrap();

    let second = flow.book(form(), test_patient_token()).await;
    assert_matches!(second, Err(AppointmentError::BookingInProgress));
}

#[tokio::test]
async fn test_order_failure_releases_reservation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::booking_accepted("abc123")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/cancel-payment"))
        .and(body_json(json!({ "tempReservationId": "abc123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::success("Reservation released")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let flow = flow(&mock_server);
    let token = AuthToken::patient("patient-two");
    let result = flow.book(form(), token.clone()).await;

    assert_matches!(result, Err(AppointmentError::Payment(PaymentError::OrderCreation(_))));
    assert!(!flow.payments().registry().has_open_for(&token).await);
}

#[tokio::test]
async fn test_missing_gateway_key_never_reaches_backend() {
    let mock_server = MockServer::start().await;
    expect_no_backend_calls(&mock_server).await;

    let config = TestConfig {
        razorpay_key_id: String::new(),
        ..TestConfig::with_backend(&mock_server.uri())
    }
    .to_app_config();
    let backend = BackendClient::new(&config);
    let payments = Arc::new(PaymentCoordinator::new(&config, backend.clone()));
    let clock = Arc::new(FixedClock::new(clinic_time(2025, 1, 15, 9, 0)));
    let flow = BookingFlow::new(ReservationService::new(backend), payments, clock);

    let result = flow.book(form(), test_patient_token()).await;
    assert_matches!(result, Err(AppointmentError::Payment(PaymentError::GatewayNotConfigured)));
}

#[tokio::test]
async fn test_simultaneous_attempts_hold_one_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::booking_accepted("abc123")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::order_created("order_abc", 80000)))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/cancel-payment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let flow = flow(&mock_server);
    let (first, second) = tokio::join!(
        flow.book(form(), test_patient_token()),
        flow.book(form(), test_patient_token()),
    );

    assert_ok!(first);
    assert_matches!(second, Err(AppointmentError::BookingInProgress));
}

#[tokio::test]
async fn test_dropped_request_still_opens_checkout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/book-appointment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::booking_accepted("abc123"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::order_created("order_abc", 80000)))
        .mount(&mock_server)
        .await;

    let flow = Arc::new(flow(&mock_server));
    let token = test_patient_token();

    let request = {
        let flow = Arc::clone(&flow);
        let token = token.clone();
        tokio::spawn(async move { flow.book(form(), token).await })
    };

    // Client goes away while the hold is being placed
    tokio::time::sleep(Duration::from_millis(50)).await;
    request.abort();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !flow.payments().registry().has_open_for(&token).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("checkout should be opened for the placed hold");

    // The sweeper can now expire it, and no second hold can be placed meanwhile
    let again = flow.book(form(), token).await;
    assert_matches!(again, Err(AppointmentError::BookingInProgress));
}
