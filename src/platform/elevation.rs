//! Administrator elevation.
//!
//! Switching the default endpoint for every user session needs an elevated
//! process. A non-elevated start relaunches itself through the `runas` verb
//! and exits.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("Failed to locate the running executable: {0}")]
    CurrentExe(#[from] std::io::Error),

    #[error("Elevated relaunch failed with code {0}")]
    RelaunchFailed(isize),
}

/// Join arguments into a Windows command line, quoting where needed.
pub fn join_arguments<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| quote_argument(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_argument(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for ch in arg.chars() {
        match ch {
            '\\' => backslashes += 1,
            '"' => {
                // Backslashes before a quote are doubled, plus one for the quote.
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                backslashes = 0;
            }
        }
        if ch != '\\' {
            quoted.push(ch);
        }
    }
    // Trailing backslashes precede the closing quote.
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    quoted
}

#[cfg(windows)]
pub use native::{is_elevated, relaunch_elevated};

#[cfg(windows)]
mod native {
    use super::{join_arguments, ElevationError};
    use windows::core::{w, HSTRING, PCWSTR};
    use windows::Win32::UI::Shell::{IsUserAnAdmin, ShellExecuteW};
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    pub fn is_elevated() -> bool {
        unsafe { IsUserAnAdmin().as_bool() }
    }

    /// Start this executable again with an elevation prompt, forwarding the
    /// current arguments. The caller is expected to exit afterwards.
    pub fn relaunch_elevated() -> Result<(), ElevationError> {
        let exe = std::env::current_exe()?;
        let exe = HSTRING::from(exe.as_os_str());
        let params = HSTRING::from(join_arguments(std::env::args().skip(1)));

        let result = unsafe {
            ShellExecuteW(
                None,
                w!("runas"),
                &exe,
                &params,
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };

        // Values above 32 mean success.
        let code = result.0 as isize;
        if code > 32 {
            Ok(())
        } else {
            Err(ElevationError::RelaunchFailed(code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_arguments_are_unquoted() {
        assert_eq!(join_arguments(["--verbose", "C:\\dir\\file"]), "--verbose C:\\dir\\file");
        assert_eq!(join_arguments(Vec::<String>::new()), "");
    }

    #[test]
    fn test_arguments_with_spaces_or_quotes_are_quoted() {
        assert_eq!(join_arguments(["a b"]), "\"a b\"");
        assert_eq!(join_arguments([""]), "\"\"");
        assert_eq!(join_arguments(["say \"hi\""]), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_trailing_backslashes_are_doubled_inside_quotes() {
        assert_eq!(join_arguments(["C:\\My Dir\\"]), "\"C:\\My Dir\\\\\"");
        assert_eq!(join_arguments(["a\\\"b c"]), "\"a\\\\\\\"b c\"");
    }
}
