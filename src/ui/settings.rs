//! Device settings dialog.
//!
//! [`SettingsForm`] holds the editable state and the save rules; the egui
//! dialog only renders it. The hotkey is reloaded after the dialog closes.

use crate::audio::PlaybackDevice;
use crate::config::{ConfigStore, Configuration};
use crate::hotkey::{Combination, HotkeyManager};
use thiserror::Error;
use tracing::info;

/// Reasons a settings form cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Please select both devices")]
    MissingDevice,

    #[error("Device 1 and Device 2 must be different")]
    SameDevice,

    #[error("Please enter a hotkey")]
    EmptyHotkey,
}

/// Editable state of the settings dialog.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub devices: Vec<PlaybackDevice>,
    pub device1: Option<usize>,
    pub device2: Option<usize>,
    pub hotkey: String,
}

impl SettingsForm {
    /// Build a form pre-populated from the current configuration.
    ///
    /// Each selection matches the configured device by ID, then by name.
    /// Unmatched selections fall back to the first device the other
    /// selection does not use.
    pub fn new(devices: Vec<PlaybackDevice>, config: &Configuration) -> Self {
        let matched1 = find_device(&devices, &config.device1_id, &config.device1_name);
        let matched2 = find_device(&devices, &config.device2_id, &config.device2_name);
        let device1 = matched1.or_else(|| first_unused(devices.len(), matched2));
        let device2 = matched2.or_else(|| first_unused(devices.len(), device1));

        Self {
            devices,
            device1,
            device2,
            hotkey: config.hotkey.clone(),
        }
    }

    pub fn selected_device1(&self) -> Option<&PlaybackDevice> {
        self.device1.and_then(|i| self.devices.get(i))
    }

    pub fn selected_device2(&self) -> Option<&PlaybackDevice> {
        self.device2.and_then(|i| self.devices.get(i))
    }

    /// Check the form and build the configuration it describes.
    pub fn validate(&self) -> Result<Configuration, SettingsError> {
        let (device1, device2) = match (self.selected_device1(), self.selected_device2()) {
            (Some(d1), Some(d2)) if !d1.name.trim().is_empty() && !d2.name.trim().is_empty() => {
                (d1, d2)
            }
            _ => return Err(SettingsError::MissingDevice),
        };

        if device1.id == device2.id {
            return Err(SettingsError::SameDevice);
        }

        let hotkey = self.hotkey.trim().to_lowercase();
        if hotkey.is_empty() {
            return Err(SettingsError::EmptyHotkey);
        }

        Ok(Configuration {
            hotkey,
            device1_name: device1.name.trim().to_string(),
            device2_name: device2.name.trim().to_string(),
            device1_id: device1.id.clone(),
            device2_id: device2.id.clone(),
        })
    }

    /// Validate and persist. Nothing is written when validation fails.
    pub fn submit(&self, store: &ConfigStore) -> Result<Configuration, SettingsError> {
        let config = self.validate()?;
        store.save(&config);
        info!(
            device1 = %config.device1_name,
            device2 = %config.device2_name,
            hotkey = %config.hotkey,
            "Saved device settings"
        );
        Ok(config)
    }
}

fn first_unused(len: usize, taken: Option<usize>) -> Option<usize> {
    (0..len).find(|i| Some(*i) != taken)
}

fn find_device(devices: &[PlaybackDevice], id: &str, name: &str) -> Option<usize> {
    if !id.is_empty() {
        if let Some(i) = devices.iter().position(|d| d.id == id) {
            return Some(i);
        }
    }
    if !name.is_empty() {
        return devices.iter().position(|d| d.name == name);
    }
    None
}

/// Outcome of applying a saved hotkey to the running manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyChange {
    /// No manager supplied, or the hotkey is already bound
    Unchanged,
    /// Rebound to the given combination
    Updated(String),
    /// The manager refused the combination; nothing is bound now
    Rejected(String),
}

/// Rebind the manager if the saved hotkey differs from the bound one.
pub fn apply_hotkey_change(manager: Option<&mut HotkeyManager>, hotkey: &str) -> HotkeyChange {
    let Some(manager) = manager else {
        return HotkeyChange::Unchanged;
    };

    let canonical = hotkey
        .parse::<Combination>()
        .map(|c| c.to_string())
        .unwrap_or_else(|_| hotkey.to_string());

    if manager.current_combination() == Some(canonical.as_str()) {
        return HotkeyChange::Unchanged;
    }

    if manager.reload(hotkey) {
        HotkeyChange::Updated(canonical)
    } else {
        HotkeyChange::Rejected(hotkey.to_string())
    }
}

#[cfg(windows)]
pub use dialog::open_settings;

#[cfg(windows)]
mod dialog {
    use super::{apply_hotkey_change, HotkeyChange, SettingsForm};
    use crate::audio::{DeviceBridge, PlaybackDevice};
    use crate::config::{ConfigStore, Configuration};
    use crate::hotkey::HotkeyManager;
    use crate::platform::dialogs::{show_error, show_info};
    use eframe::egui;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing::{error, warn};

    const WINDOW_TITLE: &str = "Device Settings";

    struct SettingsDialog {
        form: SettingsForm,
        store: ConfigStore,
        saved: Rc<RefCell<Option<Configuration>>>,
    }

    impl SettingsDialog {
        fn device_picker(
            ui: &mut egui::Ui,
            salt: &str,
            devices: &[PlaybackDevice],
            selected: &mut Option<usize>,
        ) {
            let text = selected
                .and_then(|i| devices.get(i))
                .map(|d| d.name.as_str())
                .unwrap_or("");

            egui::ComboBox::from_id_salt(salt)
                .width(440.0)
                .selected_text(text)
                .show_ui(ui, |ui| {
                    for (i, device) in devices.iter().enumerate() {
                        ui.selectable_value(selected, Some(i), device.name.as_str());
                    }
                });
        }
    }

    impl eframe::App for SettingsDialog {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label("Device 1:");
                    Self::device_picker(ui, "device1", &self.form.devices, &mut self.form.device1);

                    ui.add_space(8.0);
                    ui.label("Device 2:");
                    Self::device_picker(ui, "device2", &self.form.devices, &mut self.form.device2);

                    ui.add_space(8.0);
                    ui.label("Hotkey:");
                    ui.add(egui::TextEdit::singleline(&mut self.form.hotkey).desired_width(160.0));

                    ui.add_space(20.0);
                    if ui.button("Save").clicked() {
                        match self.form.submit(&self.store) {
                            Ok(config) => {
                                *self.saved.borrow_mut() = Some(config);
                                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                            }
                            Err(e) => {
                                warn!(error = %e, "Settings not saved");
                                show_error(&format!("Invalid settings: {e}"));
                            }
                        }
                    }
                });
            });
        }
    }

    /// Show the settings dialog and block until it is closed.
    ///
    /// Returns the saved configuration, or `None` if the dialog was closed
    /// without saving or could not be shown.
    pub fn open_settings(
        bridge: &DeviceBridge,
        hotkeys: Option<&mut HotkeyManager>,
    ) -> Option<Configuration> {
        let devices = bridge.list_playback_devices();
        if devices.is_empty() {
            show_error("Unable to enumerate audio devices");
            return None;
        }

        let store = bridge.store().clone();
        let form = SettingsForm::new(devices, &store.load());
        let saved = Rc::new(RefCell::new(None));

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(WINDOW_TITLE)
                .with_inner_size([475.0, 300.0])
                .with_resizable(false),
            centered: true,
            run_and_return: true,
            ..Default::default()
        };

        let dialog_saved = Rc::clone(&saved);
        let result = eframe::run_native(
            WINDOW_TITLE,
            options,
            Box::new(move |_cc| {
                Ok(Box::new(SettingsDialog {
                    form,
                    store,
                    saved: dialog_saved,
                }))
            }),
        );

        if let Err(e) = result {
            error!(error = %e, "Settings dialog failed");
            show_error(&format!("Failed to open settings: {e}"));
            return None;
        }

        let config = saved.borrow_mut().take()?;
        match apply_hotkey_change(hotkeys, &config.hotkey) {
            HotkeyChange::Unchanged => {}
            HotkeyChange::Updated(hotkey) => show_info(&format!("Hotkey updated to: {hotkey}")),
            HotkeyChange::Rejected(_) => {
                show_error("Hotkey registration failed, check the key combination")
            }
        }
        Some(config)
    }
}
