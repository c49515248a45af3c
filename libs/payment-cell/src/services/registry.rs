use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::auth::AuthToken;

use crate::error::PaymentError;
use crate::models::{Checkout, CheckoutState, PaymentOrder};

/// In-memory store of checkouts. All state changes go through
/// [`CheckoutRegistry::transition`] so invalid moves are rejected under the lock.
#[derive(Default)]
pub struct CheckoutRegistry {
    checkouts: RwLock<HashMap<Uuid, Checkout>>,
}

impl CheckoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new checkout unless the owner already has an open one.
    pub async fn insert(&self, checkout: Checkout) -> Result<Uuid, PaymentError> {
        let mut checkouts = self.checkouts.write().await;

        if checkouts.values().any(|c| c.owner == checkout.owner && c.state.is_open()) {
            return Err(PaymentError::CheckoutInProgress);
        }

        let id = checkout.id;
        checkouts.insert(id, checkout);
        debug!("Registered checkout {}", id);
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<Checkout> {
        self.checkouts.read().await.get(&id).cloned()
    }

    /// Owner-checked lookup.
    pub async fn get_for(&self, id: Uuid, owner: &AuthToken) -> Result<Checkout, PaymentError> {
        let checkout = self.get(id).await.ok_or(PaymentError::CheckoutNotFound(id))?;
        if &checkout.owner != owner {
            return Err(PaymentError::NotCheckoutOwner);
        }
        Ok(checkout)
    }

    pub async fn has_open_for(&self, owner: &AuthToken) -> bool {
        self.checkouts
            .read()
            .await
            .values()
            .any(|c| &c.owner == owner && c.state.is_open())
    }

    pub async fn transition(&self, id: Uuid, next: CheckoutState) -> Result<Checkout, PaymentError> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id).ok_or(PaymentError::CheckoutNotFound(id))?;
        apply(checkout, next)?;
        Ok(checkout.clone())
    }

    pub async fn record_order(&self, id: Uuid, order: PaymentOrder) -> Result<Checkout, PaymentError> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id).ok_or(PaymentError::CheckoutNotFound(id))?;
        apply(checkout, CheckoutState::OrderCreated)?;
        checkout.order = Some(order);
        Ok(checkout.clone())
    }

    /// Claims an awaiting checkout for settlement. Only the first caller
    /// succeeds; later callbacks for the same checkout get an invalid
    /// transition error.
    pub async fn claim(&self, id: Uuid, owner: Option<&AuthToken>) -> Result<Checkout, PaymentError> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id).ok_or(PaymentError::CheckoutNotFound(id))?;

        if let Some(owner) = owner {
            if &checkout.owner != owner {
                return Err(PaymentError::NotCheckoutOwner);
            }
        }

        apply(checkout, CheckoutState::Settling)?;
        Ok(checkout.clone())
    }

    /// Open checkouts last touched before `cutoff`, in any non-terminal state.
    pub async fn stale_before(&self, cutoff: DateTime<Utc>) -> Vec<Uuid> {
        self.checkouts
            .read()
            .await
            .values()
            .filter(|c| c.state.is_open() && c.updated_at < cutoff)
            .map(|c| c.id)
            .collect()
    }

    /// Takes over a checkout that stalled before reaching a final state so it
    /// can be released. Returns `None` if it moved on since `cutoff` was read.
    pub async fn reclaim_stale(&self, id: Uuid, cutoff: DateTime<Utc>) -> Option<Checkout> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id)?;

        if !checkout.state.is_open() || checkout.updated_at >= cutoff {
            return None;
        }

        debug!("Checkout {} reclaimed from {}", checkout.id, checkout.state);
        checkout.state = CheckoutState::Settling;
        checkout.updated_at = Utc::now();
        Some(checkout.clone())
    }

    /// Drops finished checkouts last touched before `cutoff`.
    pub async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut checkouts = self.checkouts.write().await;
        let before = checkouts.len();
        checkouts.retain(|_, c| !(c.state.is_terminal() && c.updated_at < cutoff));
        before - checkouts.len()
    }

    pub async fn len(&self) -> usize {
        self.checkouts.read().await.len()
    }
}

fn apply(checkout: &mut Checkout, next: CheckoutState) -> Result<(), PaymentError> {
    if !checkout.state.can_transition_to(&next) {
        warn!("Invalid checkout transition attempted: {} -> {} for {}", checkout.state, next, checkout.id);
        return Err(PaymentError::InvalidStatusTransition {
            from: checkout.state.to_string(),
            to: next.to_string(),
        });
    }

    debug!("Checkout {} transition: {} -> {}", checkout.id, checkout.state, next);
    checkout.state = next;
    checkout.updated_at = Utc::now();
    Ok(())
}
