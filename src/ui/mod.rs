//! UI module for the system tray and settings dialog.

pub mod settings;
pub mod tray;

pub use settings::{apply_hotkey_change, HotkeyChange, SettingsError, SettingsForm};
#[cfg(windows)]
pub use settings::open_settings;
#[cfg(windows)]
pub use tray::TrayManager;
pub use tray::{MenuItemId, TrayError, TrayEvent, TRAY_TOOLTIP};
