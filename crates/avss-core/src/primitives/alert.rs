use crate::primitives::errors::ErrorCondition;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use threshold_primitives::poly::Idx;

/// A protocol violation observed by `reporter` and committed by `accused`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    pub reporter: Idx,
    pub accused: Idx,
    pub condition: ErrorCondition,
}

/// Append-only log of alerts. Clones share the same underlying log so it can
/// be read while the shareholder's state is locked by its worker.
#[derive(Debug, Clone, Default)]
pub struct AlertLog(Arc<Mutex<Vec<Alert>>>);

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, alert: Alert) {
        // entries are only ever appended, a poisoned log is still consistent
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }

    /// Returns a snapshot of all alerts in insertion order
    pub fn entries(&self) -> Vec<Alert> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the alerts raised against `accused`
    pub fn against(&self, accused: Idx) -> Vec<Alert> {
        self.entries()
            .into_iter()
            .filter(|a| a.accused == accused)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
