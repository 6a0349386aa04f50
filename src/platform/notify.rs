//! Balloon notifications.
//!
//! A hidden window owns a secondary notification-area icon that exists only
//! while a balloon is showing. The icon is removed once the balloon times
//! out, is dismissed, or is clicked.

use super::icons::{disc_bgra, ICON_SIZE};
use thiserror::Error;
use tracing::{debug, warn};
use windows::core::{w, Error as WinError};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_INFO, NIM_ADD, NIM_DELETE,
    NIN_BALLOONHIDE, NIN_BALLOONTIMEOUT, NIN_BALLOONUSERCLICK, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateIcon, CreateWindowExW, DefWindowProcW, DestroyIcon, DestroyWindow, LoadIconW,
    RegisterClassExW, CW_USEDEFAULT, HICON, IDI_APPLICATION, WINDOW_EX_STYLE, WM_USER, WNDCLASSEXW,
    WS_OVERLAPPEDWINDOW,
};

/// Callback message for the notification icon.
const WM_NOTIFY_ICON: u32 = WM_USER + 1;

/// Distinct from the tray icon's ID.
const NOTIFY_ICON_ID: u32 = 2;

const TOOLTIP: &str = "Audio Switcher";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to create notification window: {0}")]
    WindowFailed(#[from] WinError),

    #[error("Failed to show notification")]
    ShowFailed,
}

pub struct Notifier {
    hwnd: HWND,
    icon: HICON,
    owns_icon: bool,
}

impl Notifier {
    /// Create the hidden notification window. Must be called on the thread
    /// that runs the message loop.
    pub fn new() -> Result<Self, NotifyError> {
        unsafe {
            let instance = GetModuleHandleW(None)?;
            let hinstance: HINSTANCE = instance.into();

            let class_name = w!("AudioSwitcherNotifier");
            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(window_proc),
                hInstance: hinstance,
                lpszClassName: class_name,
                ..Default::default()
            };
            RegisterClassExW(&wc);

            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                w!("Audio Switcher Notifications"),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                instance,
                None,
            )?;

            let (icon, owns_icon) = match create_disc_icon(hinstance) {
                Ok(icon) => (icon, true),
                Err(e) => {
                    warn!(error = %e, "Falling back to the default application icon");
                    (LoadIconW(None, IDI_APPLICATION)?, false)
                }
            };

            Ok(Self {
                hwnd,
                icon,
                owns_icon,
            })
        }
    }

    /// Show a balloon, replacing any balloon still on screen.
    pub fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        remove_icon(self.hwnd);

        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: self.hwnd,
            uID: NOTIFY_ICON_ID,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP | NIF_INFO,
            uCallbackMessage: WM_NOTIFY_ICON,
            hIcon: self.icon,
            dwInfoFlags: NIIF_INFO,
            ..Default::default()
        };
        fill_wide(&mut nid.szTip, TOOLTIP);
        fill_wide(&mut nid.szInfoTitle, title);
        fill_wide(&mut nid.szInfo, message);

        if unsafe { Shell_NotifyIconW(NIM_ADD, &nid) }.as_bool() {
            debug!(title, "Showing notification");
            Ok(())
        } else {
            Err(NotifyError::ShowFailed)
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        remove_icon(self.hwnd);
        unsafe {
            if self.owns_icon {
                let _ = DestroyIcon(self.icon);
            }
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

fn create_disc_icon(instance: HINSTANCE) -> Result<HICON, WinError> {
    let color = disc_bgra(ICON_SIZE);
    // All-zero AND mask; transparency comes from the alpha channel.
    let mask = vec![0u8; (ICON_SIZE * ICON_SIZE / 8) as usize];
    unsafe {
        CreateIcon(
            instance,
            ICON_SIZE as i32,
            ICON_SIZE as i32,
            1,
            32,
            mask.as_ptr(),
            color.as_ptr(),
        )
    }
}

fn remove_icon(hwnd: HWND) {
    let nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: NOTIFY_ICON_ID,
        ..Default::default()
    };
    unsafe {
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

/// Copy `text` into a fixed UTF-16 buffer, truncating and NUL-terminating.
fn fill_wide(dst: &mut [u16], text: &str) {
    let Some(capacity) = dst.len().checked_sub(1) else {
        return;
    };
    let mut len = 0;
    for (slot, unit) in dst.iter_mut().zip(text.encode_utf16().take(capacity)) {
        *slot = unit;
        len += 1;
    }
    dst[len] = 0;
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NOTIFY_ICON {
        let event = (lparam.0 & 0xFFFF) as u32;
        if matches!(
            event,
            NIN_BALLOONTIMEOUT | NIN_BALLOONHIDE | NIN_BALLOONUSERCLICK
        ) {
            remove_icon(hwnd);
        }
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}
