//! Server Settings
//!
//! Process-wide operator-slot selection. There is deliberately one
//! current slot per deployment (not per request or per session); the
//! lock only makes concurrent reads and writes well-defined, with the
//! last write winning.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Default number of operator slots a deployment exposes.
const DEFAULT_MAX_SLOTS: u32 = 4;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("slot {slot} is out of range (max_slots = {max_slots})")]
    SlotOutOfRange { slot: u32, max_slots: u32 },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub operator_slot: u32,
    pub max_slots: u32,
}

/// Shared, lock-protected settings. Handlers receive this through
/// application state; there is no global.
pub struct ServerSettings {
    inner: RwLock<SettingsSnapshot>,
}

impl ServerSettings {
    pub fn new(max_slots: u32) -> Self {
        Self {
            inner: RwLock::new(SettingsSnapshot {
                operator_slot: 0,
                max_slots,
            }),
        }
    }

    pub async fn snapshot(&self) -> SettingsSnapshot {
        *self.inner.read().await
    }

    pub async fn operator_slot(&self) -> u32 {
        self.inner.read().await.operator_slot
    }

    /// Select the current operator slot. Rejects slots past the
    /// configured maximum.
    pub async fn set_operator_slot(&self, slot: u32) -> Result<SettingsSnapshot, SettingsError> {
        let mut guard = self.inner.write().await;
        if slot >= guard.max_slots {
            return Err(SettingsError::SlotOutOfRange {
                slot,
                max_slots: guard.max_slots,
            });
        }
        guard.operator_slot = slot;
        Ok(*guard)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SLOTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_read_slot() {
        let settings = ServerSettings::new(3);
        assert_eq!(settings.operator_slot().await, 0);

        settings.set_operator_slot(2).await.unwrap();
        assert_eq!(settings.operator_slot().await, 2);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_slot() {
        let settings = ServerSettings::new(2);
        let err = settings.set_operator_slot(2).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(settings.operator_slot().await, 0);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let settings = std::sync::Arc::new(ServerSettings::new(8));

        let a = {
            let settings = settings.clone();
            tokio::spawn(async move { settings.set_operator_slot(3).await })
        };
        let b = {
            let settings = settings.clone();
            tokio::spawn(async move { settings.set_operator_slot(5).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let slot = settings.operator_slot().await;
        assert!(slot == 3 || slot == 5);
    }
}
