//! System tray icon management.
//!
//! Manages the system tray icon, tooltip, and context menu.

use thiserror::Error;

/// Tooltip shown on the tray icon.
pub const TRAY_TOOLTIP: &str = "Audio Switcher";

/// Events from the system tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayEvent {
    /// Menu item selected
    MenuItemClicked { id: MenuItemId },
}

/// Menu item identifiers, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItemId {
    Settings,
    SwitchNow,
    Status,
    Exit,
}

impl MenuItemId {
    pub const ALL: [MenuItemId; 4] = [
        MenuItemId::Settings,
        MenuItemId::SwitchNow,
        MenuItemId::Status,
        MenuItemId::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItemId::Settings => "Settings",
            MenuItemId::SwitchNow => "Switch Now",
            MenuItemId::Status => "Status",
            MenuItemId::Exit => "Exit",
        }
    }
}

/// Tray service error types.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Failed to create tray icon: {0}")]
    CreateFailed(String),

    #[error("Failed to load icon resource: {0}")]
    IconLoadFailed(String),

    #[error("Failed to create menu: {0}")]
    MenuFailed(String),
}

#[cfg(windows)]
pub use manager::TrayManager;

#[cfg(windows)]
mod manager {
    use super::{MenuItemId, TrayError, TrayEvent, TRAY_TOOLTIP};
    use crate::platform::icons;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
    use tray_icon::{TrayIcon, TrayIconBuilder, TrayIconEvent};

    /// System tray manager.
    pub struct TrayManager {
        tray_icon: Option<TrayIcon>,
        event_sender: Sender<TrayEvent>,
        event_receiver: Receiver<TrayEvent>,
        menu_ids: Vec<(MenuId, MenuItemId)>,
    }

    impl TrayManager {
        pub fn new() -> Self {
            let (sender, receiver) = channel();
            Self {
                tray_icon: None,
                event_sender: sender,
                event_receiver: receiver,
                menu_ids: Vec::new(),
            }
        }

        /// Create and show the tray icon.
        pub fn create(&mut self) -> Result<(), TrayError> {
            let icon = icons::tray_icon().map_err(TrayError::IconLoadFailed)?;

            let menu = Menu::new();
            for id in MenuItemId::ALL {
                // Exit sits below a separator
                if id == MenuItemId::Exit {
                    menu.append(&PredefinedMenuItem::separator())
                        .map_err(|e| TrayError::MenuFailed(e.to_string()))?;
                }

                let item = MenuItem::new(id.label(), true, None);
                self.menu_ids.push((item.id().clone(), id));
                menu.append(&item)
                    .map_err(|e| TrayError::MenuFailed(e.to_string()))?;
            }

            let tray_icon = TrayIconBuilder::new()
                .with_icon(icon)
                .with_tooltip(TRAY_TOOLTIP)
                .with_menu(Box::new(menu))
                .build()
                .map_err(|e| TrayError::CreateFailed(e.to_string()))?;

            self.tray_icon = Some(tray_icon);

            Ok(())
        }

        /// Translate pending menu events. Call this from the event loop.
        pub fn process_events(&self) {
            // Click events are not used; drain them so they don't pile up.
            while TrayIconEvent::receiver().try_recv().is_ok() {}

            while let Ok(event) = MenuEvent::receiver().try_recv() {
                let clicked = self
                    .menu_ids
                    .iter()
                    .find(|(menu_id, _)| *menu_id == event.id)
                    .map(|(_, id)| *id);
                if let Some(id) = clicked {
                    let _ = self.event_sender.send(TrayEvent::MenuItemClicked { id });
                }
            }
        }

        /// Get the event receiver for tray events.
        pub fn events(&self) -> &Receiver<TrayEvent> {
            &self.event_receiver
        }

        /// Destroy the tray icon.
        pub fn destroy(&mut self) {
            self.tray_icon = None;
        }
    }

    impl Default for TrayManager {
        fn default() -> Self {
            Self::new()
        }
    }
}
