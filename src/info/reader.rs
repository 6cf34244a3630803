//! Capability probe for a player binary, cached in memory and on disk.
//!
//! A binary is identified by its path and file size. Two different builds of
//! the same size at the same path will share a cache entry.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::parse::{parse_codecs, parse_list, parse_options, parse_version, InfoItem};

/// Bumped whenever `PlayerInfo` changes shape.
const CACHE_FORMAT: u32 = 2;
const CACHE_SUBDIR: &str = "player_info";

#[derive(Error, Debug)]
pub enum InfoError {
  #[error("Cannot stat player binary {0}: {1}")]
  Binary(PathBuf, std::io::Error),
  #[error("Probe run failed: {0}")]
  Probe(#[from] std::io::Error),
}

/// Runs the player once with the given arguments and returns everything it printed.
pub trait ProbeRunner: Send + Sync {
  fn run(&self, bin: &Path, args: &[&str]) -> std::io::Result<String>;
}

/// Spawns the real binary.
#[derive(Debug, Default)]
pub struct CommandRunner;

impl ProbeRunner for CommandRunner {
  fn run(&self, bin: &Path, args: &[&str]) -> std::io::Result<String> {
    log::debug!("Probing {:?} {:?}", bin, args);
    let output = Command::new(bin)
      .args(args)
      .env("LC_ALL", "C")
      .stdin(Stdio::null())
      .output()?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
  }
}

/// What a player binary supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
  pub version: Option<String>,
  pub vo_list: Vec<InfoItem>,
  pub ao_list: Vec<InfoItem>,
  pub demuxer_list: Vec<InfoItem>,
  pub vc_list: Vec<InfoItem>,
  pub ac_list: Vec<InfoItem>,
  pub vf_list: Vec<InfoItem>,
  pub af_list: Vec<InfoItem>,
  pub option_list: Vec<String>,
}

impl PlayerInfo {
  pub fn is_option_available(&self, option: &str) -> bool {
    self.option_list.iter().any(|o| o == option)
  }

  pub fn has_vf(&self, name: &str) -> bool {
    self.vf_list.iter().any(|i| i.name == name)
  }

  pub fn has_af(&self, name: &str) -> bool {
    self.af_list.iter().any(|i| i.name == name)
  }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
  format: u32,
  path: String,
  size: u64,
  info: PlayerInfo,
}

struct Cached {
  path: PathBuf,
  size: u64,
  info: Arc<PlayerInfo>,
}

/// Answers capability questions for player binaries, probing each one at most once.
pub struct InfoReader {
  cache_dir: PathBuf,
  runner: Box<dyn ProbeRunner>,
  last: Mutex<Option<Cached>>,
}

impl InfoReader {
  pub fn new(cache_dir: PathBuf) -> Self {
    Self::with_runner(cache_dir, Box::new(CommandRunner))
  }

  pub fn with_runner(cache_dir: PathBuf, runner: Box<dyn ProbeRunner>) -> Self {
    Self {
      cache_dir,
      runner,
      last: Mutex::new(None),
    }
  }

  /// Capabilities of `bin`, from memory, the disk cache, or a fresh probe.
  pub fn get_info(&self, bin: &Path) -> Result<Arc<PlayerInfo>, InfoError> {
    let size = std::fs::metadata(bin)
      .map_err(|e| InfoError::Binary(bin.to_path_buf(), e))?
      .len();

    let mut last = self.last.lock();
    if let Some(cached) = last.as_ref() {
      if cached.path == bin && cached.size == size {
        return Ok(cached.info.clone());
      }
    }

    let info = match self.load_cached(bin, size) {
      Some(info) => {
        log::info!("Using cached capabilities for {}", bin.display());
        info
      }
      None => {
        log::info!("Probing capabilities of {} ({} bytes)", bin.display(), size);
        let info = self.probe(bin)?;
        self.store_cached(bin, size, &info);
        info
      }
    };

    let info = Arc::new(info);
    *last = Some(Cached {
      path: bin.to_path_buf(),
      size,
      info: info.clone(),
    });
    Ok(info)
  }

  fn probe(&self, bin: &Path) -> Result<PlayerInfo, InfoError> {
    let run = |args: &[&str]| self.runner.run(bin, args);
    Ok(PlayerInfo {
      version: parse_version(&run(&["--version"])?),
      vo_list: parse_list(&run(&["--vo=help"])?),
      ao_list: parse_list(&run(&["--ao=help"])?),
      demuxer_list: parse_list(&run(&["--demuxer=help"])?),
      vc_list: parse_codecs(&run(&["--vd=help"])?),
      ac_list: parse_codecs(&run(&["--ad=help"])?),
      vf_list: parse_list(&run(&["--vf=help"])?),
      af_list: parse_list(&run(&["--af=help"])?),
      option_list: parse_options(&run(&["--list-options"])?),
    })
  }

  fn cache_file(&self, bin: &Path) -> PathBuf {
    let key: String = bin
      .to_string_lossy()
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
      .collect();
    self.cache_dir.join(CACHE_SUBDIR).join(format!("{}.json", key))
  }

  fn load_cached(&self, bin: &Path, size: u64) -> Option<PlayerInfo> {
    let text = std::fs::read_to_string(self.cache_file(bin)).ok()?;
    let record: CacheRecord = match serde_json::from_str(&text) {
      Ok(record) => record,
      Err(e) => {
        log::warn!("Ignoring unreadable capability cache: {}", e);
        return None;
      }
    };
    (record.format == CACHE_FORMAT && record.size == size).then_some(record.info)
  }

  fn store_cached(&self, bin: &Path, size: u64, info: &PlayerInfo) {
    let file = self.cache_file(bin);
    let record = CacheRecord {
      format: CACHE_FORMAT,
      path: bin.to_string_lossy().into_owned(),
      size,
      info: info.clone(),
    };
    let result = file
      .parent()
      .map_or(Ok(()), std::fs::create_dir_all)
      .and_then(|_| {
        let json = serde_json::to_string(&record).map_err(std::io::Error::other)?;
        std::fs::write(&file, json)
      });
    if let Err(e) = result {
      log::warn!("Failed to write capability cache {}: {}", file.display(), e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  const PROBES_PER_RUN: usize = 9;

  struct CountingRunner(Arc<AtomicUsize>);

  impl ProbeRunner for CountingRunner {
    fn run(&self, _bin: &Path, args: &[&str]) -> std::io::Result<String> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(match args[0] {
        "--version" => "mpv 0.36.0\n".to_string(),
        "--vf=help" => "Available filters:\n  lavfi            libavfilter bridge\n  vflip\n".to_string(),
        "--list-options" => " --sub-ass-force-style   String list\n".to_string(),
        _ => String::new(),
      })
    }
  }

  fn fake_binary(dir: &Path, bytes: usize) -> PathBuf {
    let bin = dir.join("mpv");
    std::fs::write(&bin, vec![0u8; bytes]).unwrap();
    bin
  }

  #[test]
  fn test_same_size_is_not_reprobed() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_binary(dir.path(), 100);
    let count = Arc::new(AtomicUsize::new(0));
    let reader = InfoReader::with_runner(dir.path().join("cache"), Box::new(CountingRunner(count.clone())));

    let info = reader.get_info(&bin).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), PROBES_PER_RUN);
    assert_eq!(info.version.as_deref(), Some("0.36.0"));
    assert!(info.has_vf("lavfi"));
    assert!(info.is_option_available("sub-ass-force-style"));

    reader.get_info(&bin).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), PROBES_PER_RUN);

    fake_binary(dir.path(), 200);
    reader.get_info(&bin).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2 * PROBES_PER_RUN);
  }

  #[test]
  fn test_disk_cache_survives_new_reader() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_binary(dir.path(), 64);
    let count = Arc::new(AtomicUsize::new(0));

    let first = InfoReader::with_runner(dir.path().join("cache"), Box::new(CountingRunner(count.clone())));
    first.get_info(&bin).unwrap();

    let second = InfoReader::with_runner(dir.path().join("cache"), Box::new(CountingRunner(count.clone())));
    let info = second.get_info(&bin).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), PROBES_PER_RUN);
    assert!(info.has_vf("vflip"));
  }

  #[test]
  fn test_missing_binary_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let reader = InfoReader::new(dir.path().to_path_buf());
    assert!(matches!(
      reader.get_info(&dir.path().join("nope")),
      Err(InfoError::Binary(_, _))
    ));
  }
}
