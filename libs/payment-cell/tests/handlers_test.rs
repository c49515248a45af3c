use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::{payment_routes, PaymentCoordinator};
use shared_backend::BackendClient;
use shared_models::reservation::{TempReservationId, TemporaryReservation};
use shared_utils::test_utils::{test_patient_token, MockBackendResponses, TestConfig};

async fn setup(mock_server: &MockServer) -> (Arc<PaymentCoordinator>, uuid::Uuid) {
    Mock::given(method("POST"))
        .and(path("/api/user/payment-razorpay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::order_created("order_abc", 50000)))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/cancel-payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::success("released")))
        .mount(mock_server)
        .await;

    let config = TestConfig::with_backend(&mock_server.uri()).to_app_config();
    let coordinator = Arc::new(PaymentCoordinator::new(&config, BackendClient::new(&config)));
    let options = coordinator
        .open_checkout(
            TemporaryReservation { id: TempReservationId::new("abc123") },
            test_patient_token(),
        )
        .await
        .unwrap();

    (coordinator, options.checkout_id)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_callback_requires_token() {
    let mock_server = MockServer::start().await;
    let (coordinator, checkout_id) = setup(&mock_server).await;

    let response = payment_routes(coordinator)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/dismiss", checkout_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dismiss_endpoint_releases() {
    let mock_server = MockServer::start().await;
    let (coordinator, checkout_id) = setup(&mock_server).await;

    let response = payment_routes(coordinator)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/dismiss", checkout_id))
                .header("token", "patient-test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "released");
    assert_eq!(body["reason"]["kind"], "dismissed");
}

#[tokio::test]
async fn test_failure_endpoint_accepts_gateway_error_payload() {
    let mock_server = MockServer::start().await;
    let (coordinator, checkout_id) = setup(&mock_server).await;

    let payload = json!({
        "error": {
            "code": "BAD_REQUEST_ERROR",
            "description": "Payment processing cancelled by user",
            "reason": "payment_cancelled"
        }
    });

    let response = payment_routes(coordinator)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/failure", checkout_id))
                .header("Authorization", "Bearer patient-test-token")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reason"]["kind"], "payment_failed");
    assert_eq!(body["reason"]["description"], "Payment processing cancelled by user");
}

#[tokio::test]
async fn test_status_of_unknown_checkout_is_not_found() {
    let mock_server = MockServer::start().await;
    let (coordinator, _) = setup(&mock_server).await;

    let response = payment_routes(coordinator)
        .oneshot(
            Request::builder()
                .uri(format!("/{}", uuid::Uuid::new_v4()))
                .header("token", "patient-test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
