use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, BookingFlow, ReservationService};
use doctor_cell::{doctor_routes, DoctorCellState, SlotService};
use payment_cell::{payment_routes, PaymentCoordinator};
use shared_backend::BackendClient;
use shared_config::AppConfig;
use shared_utils::clock::{Clock, SystemClock};

/// Service objects constructed once at startup and handed to the cells.
pub struct Services {
    pub slots: Arc<SlotService>,
    pub payments: Arc<PaymentCoordinator>,
    pub booking: Arc<BookingFlow>,
}

impl Services {
    pub fn build(config: &AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::from_policy(&config.slot_policy));
        Self::with_clock(config, clock)
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let backend = BackendClient::new(config);

        let slots = Arc::new(SlotService::new(backend.clone(), config.slot_policy.clone(), Arc::clone(&clock)));
        let payments = Arc::new(PaymentCoordinator::new(config, backend.clone()));
        let booking = Arc::new(BookingFlow::new(
            ReservationService::new(backend),
            Arc::clone(&payments),
            clock,
        ));

        Self { slots, payments, booking }
    }
}

pub fn create_router(services: &Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Telecare booking gateway is running!" }))
        .nest("/doctors", doctor_routes(Arc::new(DoctorCellState::new(Arc::clone(&services.slots)))))
        .nest("/appointments", appointment_routes(Arc::clone(&services.booking)))
        .nest("/payments", payment_routes(Arc::clone(&services.payments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shared_utils::clock::FixedClock;
    use shared_utils::test_utils::{clinic_time, MockBackendResponses, TestConfig};

    fn app(backend_url: &str) -> Router {
        let config = TestConfig::with_backend(backend_url).to_app_config();
        let clock = Arc::new(FixedClock::new(clinic_time(2025, 1, 15, 20, 10)));
        create_router(&Services::with_clock(&config, clock))
    }

    #[tokio::test]
    async fn test_root_is_alive() {
        let response = app("http://127.0.0.1:9")
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cells_are_mounted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/slot-availability/doc1/15%2F01%2F2025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::slot_availability(&["8:30 PM"])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/slot-availability/doc1/16%2F01%2F2025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockBackendResponses::slot_availability(&[])))
            .mount(&mock_server)
            .await;

        let app = app(&mock_server.uri());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/doctors/doc1/slots").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let today = body["window"]["days"][0]["slots"].as_array().unwrap();
        // 20:10 rounds up to 20:30, which is booked
        assert!(today.is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/payments/00000000-0000-0000-0000-000000000000/dismiss")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
