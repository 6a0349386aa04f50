//! Audio module for playback device access.
//!
//! This module provides playback device enumeration and default-device
//! switching, either natively through Core Audio or through PowerShell and
//! the AudioDeviceCmdlets module.

pub mod backend;
pub mod bridge;
pub mod device;
#[cfg(windows)]
pub mod enumerator;
#[cfg(windows)]
pub mod policy;
pub mod powershell;

pub use backend::{create_backend, BackendKind, PlaybackBackend};
pub use bridge::{toggle_target, DeviceBridge, UNKNOWN_DEVICE};
pub use device::{DeviceError, PlaybackDevice};
#[cfg(windows)]
pub use enumerator::{ComGuard, CoreAudioBackend};
pub use powershell::PowerShellBackend;
