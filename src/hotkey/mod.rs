//! Global hotkey module.
//!
//! A single process-wide key combination bound to one callback, with a
//! background listener thread that runs the callback when it fires.

pub mod combination;
#[cfg(windows)]
pub mod global;
pub mod manager;

pub use combination::{Combination, Key, Modifiers};
#[cfg(windows)]
pub use global::GlobalHotkeyBackend;
pub use manager::{trigger_channel, HotkeyCallback, HotkeyManager, TriggerSender};

use thiserror::Error;

/// Identifier of a bound combination, as reported in trigger events.
pub type HotkeyId = u32;

/// OS-level hotkey registration.
pub trait HotkeyBackend {
    /// Bind a combination system-wide, returning the id its triggers carry.
    fn bind(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError>;

    /// Release a previously bound combination.
    fn unbind(&mut self, id: HotkeyId) -> Result<(), HotkeyError>;
}

/// Hotkey service error types.
#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("Invalid key combination {combination:?}: {reason}")]
    InvalidCombination { combination: String, reason: String },

    #[error("Failed to register {combination}: {reason}")]
    RegisterFailed { combination: String, reason: String },

    #[error("Failed to unregister hotkey: {0}")]
    UnregisterFailed(String),

    #[error("Hotkey {0} is not bound")]
    NotBound(HotkeyId),

    #[error("Failed to start the hotkey service: {0}")]
    InitFailed(String),
}
