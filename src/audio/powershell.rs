//! Playback backend driven by PowerShell and the AudioDeviceCmdlets module.
//!
//! Every operation spawns a hidden `powershell` process, waits for it and
//! parses its standard output. Output encoding is forced to UTF-8 so device
//! names survive regardless of the system code page.

use super::backend::PlaybackBackend;
use super::device::{DeviceError, PlaybackDevice};
use serde::Deserialize;
use std::process::Command;
use tracing::{debug, info, warn};

/// Name of the PowerShell module providing the audio cmdlets.
pub const MODULE_NAME: &str = "AudioDeviceCmdlets";

const DEFAULT_PROGRAM: &str = "powershell";

// Prefixed to every script so stdout is decodable as UTF-8.
const UTF8_PREAMBLE: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; ";

/// PowerShell-based playback backend.
#[derive(Debug, Clone)]
pub struct PowerShellBackend {
    program: String,
}

impl PowerShellBackend {
    /// Backend using `powershell` from the PATH.
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Backend using a specific PowerShell executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run a script and return its trimmed standard output.
    fn run(&self, script: &str) -> Result<String, DeviceError> {
        let full_script = format!("{UTF8_PREAMBLE}{script}");
        debug!(program = %self.program, script, "Running PowerShell");

        let mut command = Command::new(&self.program);
        command.args(["-NoProfile", "-NonInteractive", "-Command", &full_script]);
        hide_console_window(&mut command);

        let output = command.output().map_err(|source| DeviceError::LaunchFailed {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout.trim().to_string())
    }

    /// Make sure the AudioDeviceCmdlets module is available, installing it
    /// for the current user if needed.
    ///
    /// Returns `true` if an install was performed.
    pub fn ensure_module_installed(&self) -> Result<bool, DeviceError> {
        let listing = self.run(&format!("Get-Module -ListAvailable -Name {MODULE_NAME}"))?;
        if listing.contains(MODULE_NAME) {
            return Ok(false);
        }

        info!("{MODULE_NAME} is not installed, installing for the current user");

        // Fails where group policy overrides the user scope.
        if let Err(e) =
            self.run("Set-ExecutionPolicy -Scope CurrentUser -ExecutionPolicy RemoteSigned -Force")
        {
            warn!(error = %e, "Could not relax the execution policy, installing anyway");
        }
        self.run(&format!(
            "Install-Module -Name {MODULE_NAME} -Scope CurrentUser -Force"
        ))?;

        info!("{MODULE_NAME} installed");
        Ok(true)
    }
}

impl Default for PowerShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackBackend for PowerShellBackend {
    fn list_devices(&self) -> Result<Vec<PlaybackDevice>, DeviceError> {
        let output = self.run(&format!(
            "Import-Module {MODULE_NAME}; \
             Get-AudioDevice -List | Where-Object {{ $_.Type -eq 'Playback' }} \
             | Select-Object Name, ID | ConvertTo-Json"
        ))?;
        parse_device_list(&output)
    }

    fn current_device_id(&self) -> Result<Option<String>, DeviceError> {
        let output = self.run(&format!(
            "Import-Module {MODULE_NAME}; (Get-AudioDevice -Playback).ID"
        ))?;
        Ok(if output.is_empty() { None } else { Some(output) })
    }

    fn set_default_device(&self, device_id: &str) -> Result<(), DeviceError> {
        self.run(&format!(
            "Import-Module {MODULE_NAME}; Set-AudioDevice -ID {} | Out-Null",
            quote(device_id)
        ))?;
        Ok(())
    }
}

/// A device as emitted by `Select-Object Name, ID | ConvertTo-Json`.
#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ID")]
    id: String,
}

/// `ConvertTo-Json` emits a bare object when the pipeline has one item.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDeviceList {
    Many(Vec<RawDevice>),
    One(RawDevice),
}

/// Parse the JSON device listing produced by the list script.
pub fn parse_device_list(output: &str) -> Result<Vec<PlaybackDevice>, DeviceError> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    let raw = match serde_json::from_str(output)? {
        RawDeviceList::Many(devices) => devices,
        RawDeviceList::One(device) => vec![device],
    };

    Ok(raw
        .into_iter()
        .map(|d| PlaybackDevice::new(d.id, d.name))
        .collect())
}

/// Quote a value as a PowerShell single-quoted string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_array() {
        let json = r#"[
            {"Name": "Speakers (Realtek(R) Audio)", "ID": "{0.0.0.00000000}.{1111}"},
            {"Name": "Headphones (USB)", "ID": "{0.0.0.00000000}.{2222}"}
        ]"#;

        let devices = parse_device_list(json).unwrap();
        assert_eq!(
            devices,
            vec![
                PlaybackDevice::new("{0.0.0.00000000}.{1111}", "Speakers (Realtek(R) Audio)"),
                PlaybackDevice::new("{0.0.0.00000000}.{2222}", "Headphones (USB)"),
            ]
        );
    }

    #[test]
    fn test_parse_single_device_object() {
        let json = r#"{"Name": "Speakers", "ID": "id-1"}"#;
        let devices = parse_device_list(json).unwrap();
        assert_eq!(devices, vec![PlaybackDevice::new("id-1", "Speakers")]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_device_list("").unwrap().is_empty());
        assert!(parse_device_list("  \r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_output() {
        assert!(matches!(
            parse_device_list("Import-Module : The specified module was not loaded"),
            Err(DeviceError::MalformedDeviceList(_))
        ));
        assert!(parse_device_list(r#"[{"Name": "Speakers"}]"#).is_err());
    }

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let backend = PowerShellBackend::with_program("audio-switcher-no-such-shell");

        assert!(matches!(
            backend.list_devices(),
            Err(DeviceError::LaunchFailed { .. })
        ));
        assert!(backend.current_device_id().is_err());
        assert!(backend.set_default_device("id-1").is_err());
        assert!(backend.ensure_module_installed().is_err());
    }

    /// Write a shell script standing in for PowerShell. It records every
    /// invocation and refuses to change the execution policy.
    #[cfg(unix)]
    fn policy_locked_shell(dir: &std::path::Path) -> (String, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let calls = dir.join("calls.log");
        let script = dir.join("fake-powershell");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\n\
                 echo \"$*\" >> '{}'\n\
                 case \"$*\" in\n\
                 *Set-ExecutionPolicy*) echo 'overridden by policy' >&2; exit 1 ;;\n\
                 esac\n\
                 exit 0\n",
                calls.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script.to_string_lossy().into_owned(), calls)
    }

    #[cfg(unix)]
    #[test]
    fn test_install_continues_when_execution_policy_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let (program, calls) = policy_locked_shell(dir.path());
        let backend = PowerShellBackend::with_program(program);

        assert!(backend.ensure_module_installed().unwrap());

        let calls = std::fs::read_to_string(calls).unwrap();
        assert!(calls.contains("Set-ExecutionPolicy"));
        assert!(calls.contains("Install-Module"));
    }
}
