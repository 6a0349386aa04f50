//! Platform-specific module for Windows utilities.
//!
//! This module contains Windows-specific functionality including
//! elevation, message boxes, balloon notifications and icon generation.

#[cfg(windows)]
pub mod dialogs;
pub mod elevation;
pub mod icons;
#[cfg(windows)]
pub mod notify;

#[cfg(windows)]
pub use notify::{Notifier, NotifyError};
