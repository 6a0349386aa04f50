//! Application controller and lifecycle.
//!
//! [`App`] owns the device bridge and the hotkey manager and decides what
//! each tray menu entry does. `run` wires it to the tray, the settings
//! dialog and the Win32 message loop.

use crate::audio::{DeviceBridge, UNKNOWN_DEVICE};
use crate::config::Configuration;
use crate::hotkey::{HotkeyCallback, HotkeyManager};
use crate::ui::MenuItemId;
use std::sync::Arc;
use tracing::{info, warn};

/// A balloon notification to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: &'static str,
    pub message: String,
}

/// What the caller has to do after a menu entry was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Show the settings dialog
    OpenSettings,
    /// Show a notification
    Notify(Notification),
    /// Tear down and terminate the process
    Exit,
}

/// Notification shown after a manual switch.
pub fn switched_notification(device_name: &str) -> Notification {
    Notification {
        title: "Switched",
        message: format!("Current device: {device_name}"),
    }
}

/// Notification describing the saved configuration.
pub fn status_notification(config: &Configuration) -> Notification {
    Notification {
        title: "Device Status",
        message: format!(
            "Hotkey: {}\nDevice 1: {}\nDevice 2: {}",
            config.hotkey, config.device1_name, config.device2_name
        ),
    }
}

/// Main application state.
pub struct App {
    bridge: DeviceBridge,
    hotkeys: HotkeyManager,
}

impl App {
    pub fn new(bridge: DeviceBridge, hotkeys: HotkeyManager) -> Self {
        Self { bridge, hotkeys }
    }

    pub fn bridge(&self) -> &DeviceBridge {
        &self.bridge
    }

    pub fn hotkeys_mut(&mut self) -> &mut HotkeyManager {
        &mut self.hotkeys
    }

    /// Bind the configured hotkey to a device switch and start listening.
    pub fn start_hotkey(&mut self) -> bool {
        let config = self.bridge.store().load();
        let bridge = self.bridge.clone();
        let callback: HotkeyCallback = Arc::new(move || {
            bridge.switch();
        });

        let bound = self.hotkeys.register(&config.hotkey, callback);
        if !bound {
            warn!(hotkey = %config.hotkey, "Starting without a working hotkey");
        }
        self.hotkeys.start_listening();
        bound
    }

    /// Switch devices and describe the device that is now active.
    pub fn switch_now(&self) -> Notification {
        self.bridge.switch();
        let name = match self.bridge.get_current_device_id() {
            Some(id) => self.bridge.resolve_name(&id),
            None => UNKNOWN_DEVICE.to_string(),
        };
        switched_notification(&name)
    }

    pub fn status(&self) -> Notification {
        status_notification(&self.bridge.store().load())
    }

    pub fn handle_menu_item(&mut self, id: MenuItemId) -> MenuOutcome {
        match id {
            MenuItemId::Settings => MenuOutcome::OpenSettings,
            MenuItemId::SwitchNow => MenuOutcome::Notify(self.switch_now()),
            MenuItemId::Status => MenuOutcome::Notify(self.status()),
            MenuItemId::Exit => MenuOutcome::Exit,
        }
    }

    /// Tell the hotkey listener to stop without waiting for a switch in
    /// progress. The process is about to exit.
    pub fn request_exit(&self) {
        info!("Exit requested");
        self.hotkeys.request_stop();
    }

    /// Stop the hotkey listener.
    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.hotkeys.stop_listening();
    }
}

#[cfg(windows)]
pub use runtime::run;

#[cfg(windows)]
mod runtime {
    use super::{App, MenuOutcome};
    use crate::audio::{create_backend, BackendKind, ComGuard, DeviceBridge, PowerShellBackend};
    use crate::config::ConfigStore;
    use crate::hotkey::{trigger_channel, GlobalHotkeyBackend, HotkeyManager};
    use crate::platform::dialogs::show_error;
    use crate::platform::Notifier;
    use crate::ui::{open_settings, TrayEvent, TrayManager};
    use anyhow::{Context, Result};
    use tracing::{error, info, warn};
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, TranslateMessage, MSG,
    };

    /// Show a fatal startup error and pass it on.
    fn fatal(err: anyhow::Error) -> anyhow::Error {
        error!(error = %format!("{err:#}"), "Startup failed");
        show_error(&format!("{err:#}"));
        err
    }

    /// Run the tray application until the user exits.
    pub fn run() -> Result<()> {
        let _com = ComGuard::new()
            .context("COM initialization failed")
            .map_err(fatal)?;

        let store = ConfigStore::beside_executable();
        info!(path = %store.path().display(), "Using settings file");

        let kind = BackendKind::from_env();
        info!(backend = ?kind, "Selected playback backend");
        if kind == BackendKind::PowerShell {
            match PowerShellBackend::new().ensure_module_installed() {
                Ok(true) => info!("Installed the AudioDeviceCmdlets module"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Could not install the AudioDeviceCmdlets module"),
            }
        }

        let bridge = DeviceBridge::new(create_backend(kind), store.clone());

        if !store.load().is_configured() {
            info!("Devices not configured, opening settings");
            open_settings(&bridge, None);
        }

        let (triggers, trigger_rx) = trigger_channel();
        let hotkey_backend = GlobalHotkeyBackend::new(triggers)
            .context("Failed to start the hotkey service")
            .map_err(fatal)?;
        let hotkeys = HotkeyManager::new(Box::new(hotkey_backend), trigger_rx);

        let mut app = App::new(bridge, hotkeys);
        app.start_hotkey();

        let mut tray = TrayManager::new();
        tray.create()
            .context("Failed to create the tray icon")
            .map_err(fatal)?;

        let notifier = match Notifier::new() {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                warn!(error = %e, "Notifications unavailable");
                None
            }
        };

        info!("Audio Switcher running");

        let mut msg = MSG::default();
        while unsafe { GetMessageW(&mut msg, None, 0, 0) }.as_bool() {
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            tray.process_events();
            while let Ok(TrayEvent::MenuItemClicked { id }) = tray.events().try_recv() {
                match app.handle_menu_item(id) {
                    MenuOutcome::OpenSettings => {
                        let bridge = app.bridge().clone();
                        open_settings(&bridge, Some(app.hotkeys_mut()));
                    }
                    MenuOutcome::Notify(notification) => {
                        info!(title = notification.title, message = %notification.message, "Notify");
                        let shown = notifier
                            .as_ref()
                            .map(|n| n.notify(notification.title, &notification.message));
                        if let Some(Err(e)) = shown {
                            warn!(error = %e, "Failed to show notification");
                        }
                    }
                    MenuOutcome::Exit => {
                        app.request_exit();
                        tray.destroy();
                        drop(notifier);
                        std::process::exit(0);
                    }
                }
            }
        }

        app.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bridge::tests::MockBackend;
    use crate::config::ConfigStore;
    use crate::hotkey::manager::tests::{mock_manager, MockHotkeyBackend};
    use std::sync::mpsc::channel;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn configured_app(dir: &tempfile::TempDir) -> (App, Arc<MockBackend>, MockHotkeyBackend) {
        let store = ConfigStore::new(dir.path().join("config.json"));
        store.save(&Configuration {
            hotkey: "ctrl+alt+s".to_string(),
            device1_name: "Speakers".to_string(),
            device2_name: "Headphones".to_string(),
            device1_id: "spk".to_string(),
            device2_id: "hp".to_string(),
        });

        let backend = Arc::new(MockBackend::with_devices(&[
            ("spk", "Speakers"),
            ("hp", "Headphones"),
        ]));
        *backend.current.lock().unwrap() = Some("spk".to_string());

        let (hotkeys, hotkey_backend) = mock_manager();
        let app = App::new(DeviceBridge::new(backend.clone(), store), hotkeys);
        (app, backend, hotkey_backend)
    }

    #[test]
    fn test_switch_now_reports_new_device() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, _) = configured_app(&dir);

        let outcome = app.handle_menu_item(MenuItemId::SwitchNow);
        assert_eq!(
            outcome,
            MenuOutcome::Notify(Notification {
                title: "Switched",
                message: "Current device: Headphones".to_string(),
            })
        );
    }

    #[test]
    fn test_status_lists_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, _) = configured_app(&dir);

        let MenuOutcome::Notify(notification) = app.handle_menu_item(MenuItemId::Status) else {
            panic!("status should notify");
        };
        assert_eq!(notification.title, "Device Status");
        assert_eq!(
            notification.message,
            "Hotkey: ctrl+alt+s\nDevice 1: Speakers\nDevice 2: Headphones"
        );
    }

    #[test]
    fn test_settings_and_exit_are_left_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, backend, _) = configured_app(&dir);

        assert_eq!(app.handle_menu_item(MenuItemId::Settings), MenuOutcome::OpenSettings);
        assert_eq!(app.handle_menu_item(MenuItemId::Exit), MenuOutcome::Exit);
        assert!(backend.set_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_switch_with_unknown_current_device() {
        let dir = tempfile::tempdir().unwrap();
        let (app, backend, _) = configured_app(&dir);
        *backend.current.lock().unwrap() = None;

        assert_eq!(app.switch_now().message, "Current device: Speakers");
    }

    #[test]
    fn test_hotkey_press_switches_device() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, backend, hotkey_backend) = configured_app(&dir);

        assert!(app.start_hotkey());
        assert!(hotkey_backend.press("ctrl+alt+s"));

        let deadline = Instant::now() + Duration::from_secs(5);
        while backend.set_calls.lock().unwrap().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(*backend.set_calls.lock().unwrap(), vec!["hp".to_string()]);

        app.shutdown();
    }

    #[test]
    fn test_invalid_configured_hotkey_binds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, hotkey_backend) = configured_app(&dir);
        let mut config = app.bridge().store().load();
        config.hotkey = "ctrl+alt+".to_string();
        app.bridge().store().save(&config);

        assert!(!app.start_hotkey());
        assert_eq!(hotkey_backend.bound_count(), 0);

        // No callback was ever accepted, so there is nothing to reload.
        assert!(!app.hotkeys_mut().reload("ctrl+alt+d"));
        assert_eq!(hotkey_backend.bound_count(), 0);
        app.shutdown();
    }

    #[test]
    fn test_exit_does_not_wait_for_hotkey_switch() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, hotkey_backend) = configured_app(&dir);

        // A switch that hangs until released.
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let release_rx = Mutex::new(release_rx);
        let hung_switch: HotkeyCallback = Arc::new(move || {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(10));
        });

        assert!(app.hotkeys_mut().register("ctrl+alt+s", hung_switch));
        app.hotkeys_mut().start_listening();
        assert!(hotkey_backend.press("ctrl+alt+s"));
        assert!(started_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        let exiting = Instant::now();
        assert_eq!(app.handle_menu_item(MenuItemId::Exit), MenuOutcome::Exit);
        app.request_exit();
        assert!(exiting.elapsed() < Duration::from_millis(500));

        release_tx.send(()).unwrap();
        app.shutdown();
    }
}
