//! One-shot clip delivery with a bounded wait
//!
//! Capture finishes off the main control flow (device callbacks), so the
//! bridge turns that event-driven completion into a single deterministic
//! future: resolution happens on the first of the finalize signal or a
//! bounded timeout, and the settlement gate makes a second resolution
//! structurally impossible — the sender is consumed on first use.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::{Error, Result};

/// The settling half of a one-shot settlement pair
///
/// Cloneable so it can be handed to device callbacks; all clones share
/// the single underlying sender, so the gate fires at most once total.
pub struct SettlementGate<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for SettlementGate<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> SettlementGate<T> {
    /// Settle the gate with `value`
    ///
    /// Returns `true` if this call performed the settlement, `false` if
    /// the gate had already fired or the awaiting side is gone.
    pub fn settle(&self, value: T) -> bool {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Whether the gate has already fired
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

/// The awaiting half of a one-shot settlement pair
pub struct Settlement<T> {
    rx: oneshot::Receiver<T>,
}

/// Create a settlement pair
#[must_use]
pub fn settlement<T>() -> (SettlementGate<T>, Settlement<T>) {
    let (tx, rx) = oneshot::channel();
    (
        SettlementGate {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        Settlement { rx },
    )
}

/// Awaits a settled value with a bounded timeout
#[derive(Debug, Clone)]
pub struct DeliveryBridge {
    timeout: Duration,
}

impl Default for DeliveryBridge {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl DeliveryBridge {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Resolve exactly once with the settled value or a typed failure
    ///
    /// # Errors
    ///
    /// Returns `DeliveryTimeout` if nothing settles within the bound,
    /// `Audio` if the gate was dropped without settling (capture died).
    pub async fn deliver<T>(&self, settlement: Settlement<T>) -> Result<T> {
        match tokio::time::timeout(self.timeout, settlement.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(Error::Audio(
                "capture ended without settling a clip".to_string(),
            )),
            Err(_) => Err(Error::DeliveryTimeout(self.timeout)),
        }
    }
}
