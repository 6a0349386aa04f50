//! `global-hotkey` backed registration.
//!
//! `GlobalHotKeyManager` owns a hidden window on the thread that created it,
//! so the backend must be created and used on the main (message loop)
//! thread. Pressed events are forwarded into the manager's trigger channel.

use super::manager::TriggerSender;
use super::{Combination, HotkeyBackend, HotkeyError, HotkeyId};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    hotkeys: HashMap<HotkeyId, HotKey>,
}

impl GlobalHotkeyBackend {
    /// Create the OS hotkey manager and route its pressed events to `triggers`.
    pub fn new(triggers: TriggerSender) -> Result<Self, HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::InitFailed(e.to_string()))?;

        let triggers = Mutex::new(triggers);
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state != HotKeyState::Pressed {
                return;
            }
            let sent = match triggers.lock() {
                Ok(sender) => sender.send(event.id).is_ok(),
                Err(_) => false,
            };
            if !sent {
                debug!(id = event.id, "Hotkey listener is gone, dropping trigger");
            }
        }));

        Ok(Self {
            manager,
            hotkeys: HashMap::new(),
        })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn bind(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError> {
        let code = combination.to_code_string();
        let hotkey = HotKey::from_str(&code).map_err(|e| HotkeyError::InvalidCombination {
            combination: combination.to_string(),
            reason: e.to_string(),
        })?;

        self.manager
            .register(hotkey)
            .map_err(|e| HotkeyError::RegisterFailed {
                combination: combination.to_string(),
                reason: e.to_string(),
            })?;

        let id = hotkey.id();
        self.hotkeys.insert(id, hotkey);
        debug!(hotkey = %combination, id, "Bound global hotkey");
        Ok(id)
    }

    fn unbind(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
        let hotkey = self.hotkeys.remove(&id).ok_or(HotkeyError::NotBound(id))?;
        self.manager
            .unregister(hotkey)
            .map_err(|e| HotkeyError::UnregisterFailed(e.to_string()))
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        for (_, hotkey) in self.hotkeys.drain() {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!(error = %e, "Failed to unregister hotkey on shutdown");
            }
        }
        GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
    }
}
