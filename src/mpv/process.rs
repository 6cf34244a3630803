//! mpv binary detection and process spawning.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("mpv executable not found")]
  NotFound,
  #[error("Failed to spawn {0}: {1}")]
  SpawnFailed(PathBuf, #[source] std::io::Error),
  #[error("Process has no {0} pipe")]
  MissingPipe(&'static str),
}

/// Find the mpv executable in PATH or the usual install locations.
pub fn find_mpv() -> Option<PathBuf> {
  if let Ok(path) = which::which("mpv") {
    return Some(path);
  }

  #[cfg(windows)]
  let common_paths: &[&str] = &[
    r"C:\Program Files\mpv\mpv.exe",
    r"C:\Program Files (x86)\mpv\mpv.exe",
    r"C:\mpv\mpv.exe",
  ];
  #[cfg(target_os = "macos")]
  let common_paths: &[&str] = &[
    "/usr/local/bin/mpv",
    "/opt/homebrew/bin/mpv",
    "/Applications/mpv.app/Contents/MacOS/mpv",
  ];
  #[cfg(not(any(windows, target_os = "macos")))]
  let common_paths: &[&str] = &["/usr/bin/mpv", "/usr/local/bin/mpv", "/snap/bin/mpv"];

  common_paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Configured path if set, otherwise whatever `find_mpv` turns up.
pub fn resolve_mpv(configured: Option<PathBuf>) -> Result<PathBuf, ProcessError> {
  configured.or_else(find_mpv).ok_or(ProcessError::NotFound)
}

/// Spawn mpv with all three standard streams piped. The child is killed if
/// its handle is dropped.
pub fn spawn_mpv(mpv: &Path, args: &[String]) -> Result<Child, ProcessError> {
  log::info!("Spawning mpv: {:?}", mpv);
  log::debug!("mpv arguments: {:?}", args);

  Command::new(mpv)
    .args(args)
    .env("LC_NUMERIC", "C")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|e| ProcessError::SpawnFailed(mpv.to_path_buf(), e))
}
