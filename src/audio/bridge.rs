//! Device bridge: the switcher's view of the playback devices.
//!
//! Wraps a [`PlaybackBackend`] and turns every backend failure into an
//! empty, missing or no-op result, so callers never deal with errors.

use super::backend::PlaybackBackend;
use super::device::PlaybackDevice;
use crate::config::ConfigStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Label returned by [`DeviceBridge::resolve_name`] for unknown IDs.
pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// Pick the device to switch to.
///
/// Device 2 only when device 1 is currently active; device 1 in every other
/// case, including an unknown or missing current device.
pub fn toggle_target<'a>(current: Option<&str>, device1_id: &'a str, device2_id: &'a str) -> &'a str {
    if current == Some(device1_id) {
        device2_id
    } else {
        device1_id
    }
}

/// Playback device operations used by the tray, hotkey and settings UI.
#[derive(Clone)]
pub struct DeviceBridge {
    backend: Arc<dyn PlaybackBackend>,
    store: ConfigStore,
}

impl DeviceBridge {
    pub fn new(backend: Arc<dyn PlaybackBackend>, store: ConfigStore) -> Self {
        Self { backend, store }
    }

    /// Settings store the bridge reads the configured devices from.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// All playback devices, or an empty list if the query fails.
    pub fn list_playback_devices(&self) -> Vec<PlaybackDevice> {
        match self.backend.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "Failed to list playback devices");
                Vec::new()
            }
        }
    }

    /// ID of the active playback device, or `None` if the query fails.
    pub fn get_current_device_id(&self) -> Option<String> {
        match self.backend.current_device_id() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Failed to query the current playback device");
                None
            }
        }
    }

    /// Toggle between the two configured devices.
    ///
    /// Does nothing unless both devices are configured. Returns the ID of
    /// the device that was made active.
    pub fn switch(&self) -> Option<String> {
        let config = self.store.load();
        if !config.is_configured() {
            debug!("Switch requested but devices are not configured");
            return None;
        }

        let current = self.get_current_device_id();
        let target = toggle_target(current.as_deref(), &config.device1_id, &config.device2_id);

        match self.backend.set_default_device(target) {
            Ok(()) => {
                info!(device_id = target, "Switched playback device");
                Some(target.to_string())
            }
            Err(e) => {
                warn!(device_id = target, error = %e, "Failed to switch playback device");
                None
            }
        }
    }

    /// Friendly name for a device ID, looked up in a fresh listing.
    pub fn resolve_name(&self, device_id: &str) -> String {
        self.list_playback_devices()
            .into_iter()
            .find(|d| d.id == device_id)
            .map(|d| d.name)
            .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
    }
}
