//! Audio device data models.
//!
//! Defines the playback device record and the error type shared by all
//! playback backends.

use thiserror::Error;

/// A playback (render) endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDevice {
    /// Unique Windows endpoint ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name
    pub name: String,
}

impl PlaybackDevice {
    /// Create a new PlaybackDevice.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Playback backend error types.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to launch {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Command output is not valid UTF-8: {0}")]
    InvalidOutput(#[from] std::string::FromUtf8Error),

    #[error("Failed to parse device list: {0}")]
    MalformedDeviceList(#[from] serde_json::Error),

    #[error("COM initialization failed: {0}")]
    ComInitFailed(String),

    #[error("Failed to enumerate devices: {0}")]
    EnumerationFailed(String),

    #[error("Failed to set default device: {0}")]
    SetDefaultFailed(String),

    #[error("String conversion error: {0}")]
    StringConversion(String),
}
