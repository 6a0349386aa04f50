//! Audio Switcher - Library
//!
//! A system tray utility that toggles the default playback device between
//! two chosen devices on Windows.
//!
//! ## Features
//!
//! - Global hotkey that switches between the two configured devices
//! - Tray menu with settings, manual switch, status and exit
//! - Settings dialog for picking the devices and the hotkey
//! - Native Core Audio backend, with a PowerShell (AudioDeviceCmdlets) fallback

pub mod app;
pub mod audio;
pub mod config;
pub mod hotkey;
pub mod platform;
pub mod ui;

pub use app::{App, MenuOutcome, Notification};
pub use audio::{DeviceBridge, DeviceError, PlaybackBackend, PlaybackDevice};
pub use config::{ConfigError, ConfigStore, Configuration};
pub use hotkey::{Combination, HotkeyError, HotkeyManager};
pub use ui::{MenuItemId, SettingsError, SettingsForm, TrayError, TrayEvent};
