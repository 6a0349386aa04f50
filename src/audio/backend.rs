//! Playback backend interface.
//!
//! Everything the switcher needs from the audio system: list the playback
//! endpoints, read the default one, and make another one the default.

use super::device::{DeviceError, PlaybackDevice};
use std::sync::Arc;
use tracing::warn;

/// Narrow interface over the system's playback devices.
pub trait PlaybackBackend: Send + Sync {
    /// List all active playback devices.
    fn list_devices(&self) -> Result<Vec<PlaybackDevice>, DeviceError>;

    /// ID of the current default playback device, if any.
    fn current_device_id(&self) -> Result<Option<String>, DeviceError>;

    /// Make the given device the default playback device.
    fn set_default_device(&self, device_id: &str) -> Result<(), DeviceError>;
}

/// Environment variable selecting the backend (`native` or `powershell`).
pub const BACKEND_ENV_VAR: &str = "AUDIO_SWITCHER_BACKEND";

/// Available backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Core Audio (MMDevice + IPolicyConfig)
    #[default]
    Native,

    /// PowerShell with the AudioDeviceCmdlets module
    PowerShell,
}

impl BackendKind {
    /// Parse a backend name. Unknown names fall back to the default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "coreaudio" | "" => BackendKind::Native,
            "powershell" | "ps" => BackendKind::PowerShell,
            other => {
                warn!(backend = other, "Unknown playback backend, using native");
                BackendKind::Native
            }
        }
    }

    /// Backend selected through the environment.
    pub fn from_env() -> Self {
        std::env::var(BACKEND_ENV_VAR)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Build the backend for the given kind.
#[cfg(windows)]
pub fn create_backend(kind: BackendKind) -> Arc<dyn PlaybackBackend> {
    match kind {
        BackendKind::Native => Arc::new(super::enumerator::CoreAudioBackend::new()),
        BackendKind::PowerShell => Arc::new(super::powershell::PowerShellBackend::new()),
    }
}

/// Build the backend for the given kind.
///
/// Core Audio only exists on Windows; other hosts always get PowerShell.
#[cfg(not(windows))]
pub fn create_backend(_kind: BackendKind) -> Arc<dyn PlaybackBackend> {
    Arc::new(super::powershell::PowerShellBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!(BackendKind::parse("native"), BackendKind::Native);
        assert_eq!(BackendKind::parse(" PowerShell "), BackendKind::PowerShell);
        assert_eq!(BackendKind::parse("ps"), BackendKind::PowerShell);
        assert_eq!(BackendKind::parse("pulse"), BackendKind::Native);
        assert_eq!(BackendKind::parse(""), BackendKind::Native);
    }
}
