//! Device enumeration using Windows MMDevice API.
//!
//! Provides COM initialization and the Core Audio playback backend.

use super::backend::PlaybackBackend;
use super::device::{DeviceError, PlaybackDevice};
use super::policy;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL,
    COINIT_APARTMENTTHREADED, STGM,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    ///
    /// Nested initialization on a thread that is already in an apartment is
    /// fine; each successful call is balanced by the guard's drop.
    pub fn new() -> Result<Self, DeviceError> {
        unsafe {
            // Use apartment-threaded for UI compatibility
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| DeviceError::ComInitFailed(e.to_string()))?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Playback device enumerator using Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new DeviceEnumerator.
    ///
    /// Note: COM must be initialized before calling this function.
    pub fn new() -> Result<Self, DeviceError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

            Ok(Self { enumerator })
        }
    }

    /// Get all active playback devices.
    pub fn get_devices(&self) -> Result<Vec<PlaybackDevice>, DeviceError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

            let count = collection
                .GetCount()
                .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

            let mut devices = Vec::with_capacity(count as usize);

            for i in 0..count {
                let device = collection
                    .Item(i)
                    .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

                if let Ok(playback) = self.device_to_playback(&device) {
                    devices.push(playback);
                }
            }

            Ok(devices)
        }
    }

    /// Get the ID of the default playback device (Console role).
    pub fn get_default_device_id(&self) -> Result<Option<String>, DeviceError> {
        unsafe {
            let device = match self.enumerator.GetDefaultAudioEndpoint(eRender, eConsole) {
                Ok(d) => d,
                Err(_) => return Ok(None),
            };

            Ok(Some(Self::device_id(&device)?))
        }
    }

    fn device_id(device: &IMMDevice) -> Result<String, DeviceError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;
            let id_string = id.to_string();
            CoTaskMemFree(Some(id.0 as *const _));
            id_string.map_err(|e| DeviceError::StringConversion(e.to_string()))
        }
    }

    /// Convert an IMMDevice to a PlaybackDevice.
    fn device_to_playback(&self, device: &IMMDevice) -> Result<PlaybackDevice, DeviceError> {
        unsafe {
            let id = Self::device_id(device)?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM(0))
                .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

            let name = self
                .get_device_name(&props)
                .unwrap_or_else(|| "Unknown".to_string());

            Ok(PlaybackDevice { id, name })
        }
    }

    /// Get the friendly name of a device from its property store.
    fn get_device_name(&self, props: &IPropertyStore) -> Option<String> {
        unsafe {
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };

            let prop = props.GetValue(&key).ok()?;

            let s = prop.to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
    }
}

/// Core Audio playback backend.
///
/// Holds no COM objects: each call initializes COM and creates its own
/// enumerator, so the backend can be shared with the hotkey thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioBackend;

impl CoreAudioBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackBackend for CoreAudioBackend {
    fn list_devices(&self) -> Result<Vec<PlaybackDevice>, DeviceError> {
        let _com = ComGuard::new()?;
        let enumerator = DeviceEnumerator::new()?;
        enumerator.get_devices()
    }

    fn current_device_id(&self) -> Result<Option<String>, DeviceError> {
        let _com = ComGuard::new()?;
        let enumerator = DeviceEnumerator::new()?;
        enumerator.get_default_device_id()
    }

    fn set_default_device(&self, device_id: &str) -> Result<(), DeviceError> {
        let _com = ComGuard::new()?;
        policy::set_default_device_for_all_roles(device_id)
            .map_err(|e| DeviceError::SetDefaultFailed(e.to_string()))
    }
}
