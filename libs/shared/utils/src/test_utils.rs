use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use shared_config::{AppConfig, CheckoutPolicy, SlotPolicy};
use shared_models::auth::AuthToken;

pub struct TestConfig {
    pub backend_url: String,
    pub razorpay_key_id: String,
    pub slot_policy: SlotPolicy,
    pub checkout_policy: CheckoutPolicy,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:4000".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            slot_policy: SlotPolicy::default(),
            checkout_policy: CheckoutPolicy::default(),
        }
    }
}

impl TestConfig {
    pub fn with_backend(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.slot_policy.refresh_interval = interval;
        self
    }

    pub fn with_checkout_ttl(mut self, ttl: Duration) -> Self {
        self.checkout_policy.ttl = ttl;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            backend_url: self.backend_url.clone(),
            razorpay_key_id: self.razorpay_key_id.clone(),
            clinic_name: "Telecare".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            slot_policy: self.slot_policy.clone(),
            checkout_policy: self.checkout_policy.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn test_patient_token() -> AuthToken {
    AuthToken::patient("patient-test-token")
}

/// Wall-clock instant in the clinic's time zone.
pub fn clinic_time(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}

pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn doctor(id: &str, name: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "name": name,
            "speciality": "Psychologist",
            "fees": 800,
            "available": true,
            "slots_booked": {}
        })
    }

    pub fn doctor_list(doctors: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "success": true,
            "doctors": doctors
        })
    }

    pub fn slot_availability(unavailable: &[&str]) -> serde_json::Value {
        json!({
            "success": true,
            "unavailableSlots": unavailable
        })
    }

    pub fn booking_accepted(temp_reservation_id: &str) -> serde_json::Value {
        json!({
            "success": true,
            "message": "Slot reserved, complete payment to confirm",
            "tempReservationId": temp_reservation_id
        })
    }

    pub fn order_created(order_id: &str, amount: u64) -> serde_json::Value {
        json!({
            "success": true,
            "order": {
                "id": order_id,
                "amount": amount,
                "currency": "INR",
                "receipt": "receipt_abc123"
            }
        })
    }

    pub fn success(message: &str) -> serde_json::Value {
        json!({
            "success": true,
            "message": message
        })
    }

    pub fn rejected(message: &str) -> serde_json::Value {
        json!({
            "success": false,
            "message": message
        })
    }
}
