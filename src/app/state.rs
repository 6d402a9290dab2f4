use std::sync::{Mutex, MutexGuard};

use crate::app::models::{Device, DeviceTarget};

/// Process-wide shell state: the serial the user currently targets.
///
/// Updates are last-writer-wins. Executions never read this directly; the shell
/// takes a [`DeviceTarget`] from [`AppState::target`] when an action starts.
pub struct AppState {
    selected_serial: Mutex<Option<String>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            selected_serial: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.selected_serial
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn select(&self, serial: impl Into<String>) {
        let serial = serial.into();
        let mut slot = self.slot();
        *slot = Some(serial.trim().to_string()).filter(|value| !value.is_empty());
    }

    pub fn selected(&self) -> Option<String> {
        self.slot().clone()
    }

    pub fn target(&self) -> Option<DeviceTarget> {
        self.selected().map(DeviceTarget::new)
    }

    /// Drops the selection when its serial is absent from a fresh device list.
    /// Returns `true` if the selection was cleared.
    pub fn reconcile(&self, devices: &[Device]) -> bool {
        let mut slot = self.slot();
        let Some(serial) = slot.as_ref() else {
            return false;
        };
        if devices.iter().any(|device| &device.serial == serial) {
            return false;
        }
        *slot = None;
        true
    }
}
