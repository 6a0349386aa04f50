//! Message boxes.

use windows::core::PCWSTR;
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, MB_ICONERROR, MB_ICONINFORMATION, MB_OK, MESSAGEBOX_STYLE,
};

const ERROR_TITLE: &str = "Audio Switcher Error";
const INFO_TITLE: &str = "Audio Switcher";

pub fn show_error(msg: &str) {
    show(ERROR_TITLE, msg, MB_OK | MB_ICONERROR);
}

pub fn show_info(msg: &str) {
    show(INFO_TITLE, msg, MB_OK | MB_ICONINFORMATION);
}

fn show(title: &str, msg: &str, style: MESSAGEBOX_STYLE) {
    let msg_wide: Vec<u16> = msg.encode_utf16().chain(std::iter::once(0)).collect();
    let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();
    unsafe {
        MessageBoxW(
            None,
            PCWSTR(msg_wide.as_ptr()),
            PCWSTR(title_wide.as_ptr()),
            style,
        );
    }
}
