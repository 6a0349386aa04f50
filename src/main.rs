#![windows_subsystem = "windows"]

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "audio-switcher.log";

/// The release binary has no console, so logs go to a file next to it.
fn log_file_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

fn init_logging() {
    let writer = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path())
    {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(writer)
        .init();
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use audio_switcher::platform::elevation;

    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Audio Switcher");

    if !elevation::is_elevated() {
        info!("Not running as administrator, relaunching elevated");
        if let Err(e) = elevation::relaunch_elevated() {
            tracing::error!(error = %e, "Elevated relaunch failed");
            return Err(e.into());
        }
        return Ok(());
    }

    audio_switcher::app::run()
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Audio Switcher");
    anyhow::bail!("Audio Switcher only runs on Windows")
}
