use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Working-hours and refresh policy used by the slot generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPolicy {
    /// Offset of the clinic's wall clock from UTC, in minutes.
    pub utc_offset_minutes: i32,
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
    pub window_days: u32,
    /// How far ahead of today a window may start.
    pub max_advance_days: u32,
    pub refresh_interval: Duration,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            open_hour: 10,
            close_hour: 21,
            slot_minutes: 30,
            window_days: 7,
            max_advance_days: 90,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Lifetime of an open checkout before the sweeper releases it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(900),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub razorpay_key_id: String,
    pub clinic_name: String,
    pub bind_addr: String,
    pub slot_policy: SlotPolicy,
    pub checkout_policy: CheckoutPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SlotPolicy::default();
        let checkout_defaults = CheckoutPolicy::default();

        let config = Self {
            backend_url: env::var("BACKEND_URL")
                .or_else(|_| env::var("VITE_BACKEND_URL"))
                .unwrap_or_else(|_| {
                    warn!("BACKEND_URL not set, using default");
                    "http://localhost:4000".to_string()
                }),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .or_else(|_| env::var("VITE_RAZORPAY_KEY_ID"))
                .unwrap_or_else(|_| {
                    warn!("RAZORPAY_KEY_ID not set, using empty value");
                    String::new()
                }),
            clinic_name: env::var("CLINIC_NAME").unwrap_or_else(|_| "Telecare".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            slot_policy: SlotPolicy {
                utc_offset_minutes: parse_or("CLINIC_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
                open_hour: parse_or("CLINIC_OPEN_HOUR", defaults.open_hour),
                close_hour: parse_or("CLINIC_CLOSE_HOUR", defaults.close_hour),
                slot_minutes: parse_or("SLOT_DURATION_MINUTES", defaults.slot_minutes),
                window_days: parse_or("SLOT_WINDOW_DAYS", defaults.window_days),
                max_advance_days: parse_or("SLOT_MAX_ADVANCE_DAYS", defaults.max_advance_days),
                refresh_interval: Duration::from_secs(parse_or(
                    "SLOT_REFRESH_SECONDS",
                    defaults.refresh_interval.as_secs(),
                )),
            },
            checkout_policy: CheckoutPolicy {
                ttl: Duration::from_secs(parse_or(
                    "CHECKOUT_TTL_SECONDS",
                    checkout_defaults.ttl.as_secs(),
                )),
                sweep_interval: Duration::from_secs(parse_or(
                    "CHECKOUT_SWEEP_SECONDS",
                    checkout_defaults.sweep_interval.as_secs(),
                )),
            },
        };

        if !config.slot_policy_is_valid() {
            warn!("Slot policy is inconsistent, falling back to defaults");
            return Self {
                slot_policy: defaults,
                ..config
            };
        }

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.razorpay_key_id.is_empty()
    }

    pub fn slot_policy_is_valid(&self) -> bool {
        let policy = &self.slot_policy;
        policy.open_hour < policy.close_hour
            && policy.close_hour <= 24
            && policy.slot_minutes > 0
            && policy.window_days > 0
            && !policy.refresh_interval.is_zero()
            && policy.utc_offset_minutes.abs() < 24 * 60
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(policy: SlotPolicy) -> AppConfig {
        AppConfig {
            backend_url: "http://localhost:4000".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            clinic_name: "Telecare".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            slot_policy: policy,
            checkout_policy: CheckoutPolicy::default(),
        }
    }

    #[test]
    fn test_default_policy_matches_clinic_hours() {
        let policy = SlotPolicy::default();
        assert_eq!(policy.open_hour, 10);
        assert_eq!(policy.close_hour, 21);
        assert_eq!(policy.slot_minutes, 30);
        assert_eq!(policy.window_days, 7);
        assert_eq!(policy.max_advance_days, 90);
        assert_eq!(policy.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_policy_validation() {
        assert!(config_with(SlotPolicy::default()).slot_policy_is_valid());

        let inverted = SlotPolicy { open_hour: 21, close_hour: 10, ..SlotPolicy::default() };
        assert!(!config_with(inverted).slot_policy_is_valid());

        let zero_step = SlotPolicy { slot_minutes: 0, ..SlotPolicy::default() };
        assert!(!config_with(zero_step).slot_policy_is_valid());
    }

    #[test]
    fn test_is_configured_requires_gateway_key() {
        let mut config = config_with(SlotPolicy::default());
        assert!(config.is_configured());
        config.razorpay_key_id.clear();
        assert!(!config.is_configured());
    }
}
