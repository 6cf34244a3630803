//! Player configuration with persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";
const APP_DIR: &str = "wzplayer";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("Invalid config JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

/// Empirically tuned timings for working around player quirks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingConfig {
  /// Delay after playback starts before asking for bitrates.
  #[serde(default = "default_bitrate_request_delay_ms")]
  pub bitrate_request_delay_ms: u64,

  /// Extra time given to a disc title past its estimated end before forcing quit.
  #[serde(default = "default_end_of_title_margin_ms")]
  pub end_of_title_margin_ms: u64,

  /// The end-of-title countdown is only armed this close to the end.
  #[serde(default = "default_end_of_title_window_ms")]
  pub end_of_title_window_ms: u64,

  /// How long `stop()` waits after `quit` before killing the process.
  #[serde(default = "default_quit_timeout_ms")]
  pub quit_timeout_ms: u64,

  /// Position drop that counts as "the new title is on screen" after a switch.
  #[serde(default = "default_title_switch_tolerance_ms")]
  pub title_switch_tolerance_ms: u64,
}

fn default_bitrate_request_delay_ms() -> u64 {
  12_000
}

fn default_end_of_title_margin_ms() -> u64 {
  400
}

fn default_end_of_title_window_ms() -> u64 {
  5_000
}

fn default_quit_timeout_ms() -> u64 {
  5_000
}

fn default_title_switch_tolerance_ms() -> u64 {
  1_000
}

impl Default for TimingConfig {
  fn default() -> Self {
    Self {
      bitrate_request_delay_ms: default_bitrate_request_delay_ms(),
      end_of_title_margin_ms: default_end_of_title_margin_ms(),
      end_of_title_window_ms: default_end_of_title_window_ms(),
      quit_timeout_ms: default_quit_timeout_ms(),
      title_switch_tolerance_ms: default_title_switch_tolerance_ms(),
    }
  }
}

impl TimingConfig {
  pub fn bitrate_request_delay(&self) -> Duration {
    Duration::from_millis(self.bitrate_request_delay_ms)
  }

  pub fn end_of_title_margin(&self) -> Duration {
    Duration::from_millis(self.end_of_title_margin_ms)
  }

  pub fn end_of_title_window(&self) -> Duration {
    Duration::from_millis(self.end_of_title_window_ms)
  }

  pub fn quit_timeout(&self) -> Duration {
    Duration::from_millis(self.quit_timeout_ms)
  }

  pub fn title_switch_tolerance(&self) -> Duration {
    Duration::from_millis(self.title_switch_tolerance_ms)
  }
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
  /// Custom mpv executable path (None = auto-detect).
  #[serde(default)]
  pub mpv_path: Option<String>,

  /// Additional mpv command-line arguments.
  #[serde(default)]
  pub mpv_args: Vec<String>,

  /// Directory for the capability cache (None = platform cache dir).
  #[serde(default)]
  pub cache_dir: Option<String>,

  /// Cache sizes in KB. Values below the player minimum disable the cache.
  #[serde(default = "default_cache_kb")]
  pub cache_for_files: i64,

  #[serde(default = "default_cache_kb")]
  pub cache_for_streams: i64,

  #[serde(default)]
  pub cache_for_discs: i64,

  /// Hardware decoding mode passed to `--hwdec`.
  #[serde(default = "default_hwdec")]
  pub hwdec: String,

  /// Video output driver (empty = player default).
  #[serde(default)]
  pub vo: String,

  /// Audio output driver (empty = player default).
  #[serde(default)]
  pub ao: String,

  #[serde(default = "default_volume")]
  pub volume: i32,

  #[serde(default)]
  pub audio_lang: String,

  #[serde(default)]
  pub sub_lang: String,

  #[serde(default)]
  pub sub_font: String,

  #[serde(default = "default_scale")]
  pub sub_scale: f64,

  /// Force the subtitle font and scale onto styled (ASS) subtitles.
  #[serde(default)]
  pub ass_style_override: bool,

  /// 0 = exact filename match, 1 = fuzzy, 2 = all files in the folder.
  #[serde(default = "default_sub_fuzziness")]
  pub sub_fuzziness: i32,

  #[serde(default = "default_osd_level")]
  pub osd_level: i32,

  #[serde(default = "default_scale")]
  pub osd_scale: f64,

  #[serde(default)]
  pub screenshot_dir: Option<String>,

  #[serde(default = "default_screenshot_format")]
  pub screenshot_format: String,

  #[serde(default)]
  pub dvd_device: String,

  #[serde(default)]
  pub cdrom_device: String,

  #[serde(default)]
  pub bluray_device: String,

  /// Surface player crashes to the user.
  #[serde(default = "default_true")]
  pub report_player_crashes: bool,

  #[serde(default)]
  pub timing: TimingConfig,
}

fn default_cache_kb() -> i64 {
  2048
}

fn default_hwdec() -> String {
  "no".to_string()
}

fn default_volume() -> i32 {
  100
}

fn default_scale() -> f64 {
  1.0
}

fn default_sub_fuzziness() -> i32 {
  1
}

fn default_osd_level() -> i32 {
  1
}

fn default_screenshot_format() -> String {
  "png".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for PlayerConfig {
  fn default() -> Self {
    Self {
      mpv_path: None,
      mpv_args: Vec::new(),
      cache_dir: None,
      cache_for_files: default_cache_kb(),
      cache_for_streams: default_cache_kb(),
      cache_for_discs: 0,
      hwdec: default_hwdec(),
      vo: String::new(),
      ao: String::new(),
      volume: default_volume(),
      audio_lang: String::new(),
      sub_lang: String::new(),
      sub_font: String::new(),
      sub_scale: default_scale(),
      ass_style_override: false,
      sub_fuzziness: default_sub_fuzziness(),
      osd_level: default_osd_level(),
      osd_scale: default_scale(),
      screenshot_dir: None,
      screenshot_format: default_screenshot_format(),
      dvd_device: String::new(),
      cdrom_device: String::new(),
      bluray_device: String::new(),
      report_player_crashes: true,
      timing: TimingConfig::default(),
    }
  }
}

impl PlayerConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if !(0..=100).contains(&self.volume) {
      return Err("Volume must be between 0 and 100".to_string());
    }
    if !(0..=3).contains(&self.osd_level) {
      return Err("OSD level must be between 0 and 3".to_string());
    }
    if !(0..=2).contains(&self.sub_fuzziness) {
      return Err("Subtitle fuzziness must be 0, 1 or 2".to_string());
    }
    if self.sub_scale <= 0.0 || self.osd_scale <= 0.0 {
      return Err("Scale factors must be positive".to_string());
    }
    if self.cache_for_files < 0 || self.cache_for_streams < 0 || self.cache_for_discs < 0 {
      return Err("Cache sizes cannot be negative".to_string());
    }
    if self.timing.quit_timeout_ms == 0 {
      return Err("Quit timeout must be positive".to_string());
    }
    Ok(())
  }

  /// Default config file location.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
  }

  /// Load from `path`; a missing file yields defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      log::info!("No config at {}, using defaults", path.display());
      return Ok(Self::default());
    }
    let text = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&text)?;
    config.validate().map_err(ConfigError::Invalid)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
  }

  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    self.validate().map_err(ConfigError::Invalid)?;
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(self)?)?;
    Ok(())
  }

  /// Directory holding the capability cache.
  pub fn cache_dir(&self) -> PathBuf {
    self
      .cache_dir
      .as_ref()
      .filter(|s| !s.is_empty())
      .map(PathBuf::from)
      .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_DIR)))
      .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR))
  }

  pub fn mpv_path(&self) -> Option<PathBuf> {
    self
      .mpv_path
      .as_ref()
      .filter(|s| !s.is_empty())
      .map(PathBuf::from)
  }
}
