//! Launch argument vector for the player process.

use std::fmt;
use std::sync::Arc;

use super::filters::{audio_filter, video_filter, Translation};
use super::protocol::{playing_template, STATUS_TEMPLATE};
use crate::config::PlayerConfig;
use crate::info::PlayerInfo;
use crate::media::{DiscName, DiscType};

/// Cache sizes below this many KB turn the cache off.
pub const MIN_CACHE_KB: i64 = 32;

/// mplayer options with no mpv counterpart that are accepted and dropped quietly.
const IGNORED_OPTIONS: &[&str] = &["vfm", "afm", "mc", "colorkey", "nokeepaspect", "prefer-ipv4", "prefer-ipv6"];

/// Typed value of an abstract option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
  Flag,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

impl OptionValue {
  fn as_bool(&self) -> bool {
    match self {
      OptionValue::Flag => true,
      OptionValue::Bool(b) => *b,
      OptionValue::Int(i) => *i != 0,
      OptionValue::Float(f) => *f != 0.0,
      OptionValue::Str(s) => !matches!(s.as_str(), "" | "0" | "no" | "false"),
    }
  }

  fn as_int(&self) -> Option<i64> {
    match self {
      OptionValue::Int(i) => Some(*i),
      OptionValue::Float(f) => Some(f.round() as i64),
      OptionValue::Str(s) => s.trim().parse().ok(),
      OptionValue::Bool(b) => Some(*b as i64),
      OptionValue::Flag => None,
    }
  }
}

impl fmt::Display for OptionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionValue::Flag => Ok(()),
      OptionValue::Bool(b) => f.write_str(if *b { "yes" } else { "no" }),
      OptionValue::Int(i) => write!(f, "{}", i),
      OptionValue::Float(v) => write!(f, "{}", v),
      OptionValue::Str(s) => f.write_str(s),
    }
  }
}

impl From<bool> for OptionValue {
  fn from(value: bool) -> Self {
    OptionValue::Bool(value)
  }
}

impl From<i32> for OptionValue {
  fn from(value: i32) -> Self {
    OptionValue::Int(value as i64)
  }
}

impl From<i64> for OptionValue {
  fn from(value: i64) -> Self {
    OptionValue::Int(value)
  }
}

impl From<f64> for OptionValue {
  fn from(value: f64) -> Self {
    OptionValue::Float(value)
  }
}

impl From<&str> for OptionValue {
  fn from(value: &str) -> Self {
    OptionValue::Str(value.to_string())
  }
}

impl From<String> for OptionValue {
  fn from(value: String) -> Self {
    OptionValue::Str(value)
  }
}

/// Builds the argument vector for one player run.
#[derive(Debug, Clone)]
pub struct LaunchArgs {
  args: Vec<String>,
  media: Option<String>,
  info: Option<Arc<PlayerInfo>>,
  unsupported: Vec<String>,
}

impl LaunchArgs {
  /// Fixed options every run needs. `info` enables capability checks.
  pub fn new(info: Option<Arc<PlayerInfo>>) -> Self {
    let mut args = vec![
      "--no-config".to_string(),
      "--no-quiet".to_string(),
      "--terminal".to_string(),
      "--no-msg-color".to_string(),
      "--no-input-default-bindings".to_string(),
      "--input-vo-keyboard=no".to_string(),
      "--keep-open=no".to_string(),
      "--idle=no".to_string(),
    ];
    #[cfg(not(windows))]
    args.push("--input-file=/dev/stdin".to_string());
    #[cfg(windows)]
    args.push("--input-terminal=yes".to_string());
    args.push(format!("--term-status-msg={}", STATUS_TEMPLATE));

    Self {
      args,
      media: None,
      info,
      unsupported: Vec::new(),
    }
  }

  /// Fixed options plus everything the configuration asks for.
  pub fn from_config(config: &PlayerConfig, info: Option<Arc<PlayerInfo>>) -> Self {
    let mut launch = Self::new(info);
    if !config.vo.is_empty() {
      launch.set_option("vo", config.vo.as_str());
    }
    if !config.ao.is_empty() {
      launch.set_option("ao", config.ao.as_str());
    }
    launch.set_option("hwdec", config.hwdec.as_str());
    launch.set_option("volume", config.volume);
    if !config.audio_lang.is_empty() {
      launch.set_option("alang", config.audio_lang.as_str());
    }
    if !config.sub_lang.is_empty() {
      launch.set_option("slang", config.sub_lang.as_str());
    }
    if !config.sub_font.is_empty() {
      launch.set_option("sub-font", config.sub_font.as_str());
    }
    launch.set_option("sub-scale", config.sub_scale);
    launch.set_option("ass-style-override", config.ass_style_override);
    launch.set_option("sub-fuzziness", config.sub_fuzziness);
    launch.set_option("osdlevel", config.osd_level);
    launch.set_option("osd-scale", config.osd_scale);
    if let Some(dir) = config.screenshot_dir.as_deref().filter(|d| !d.is_empty()) {
      launch.set_option("screenshot_directory", dir);
    }
    launch.set_option("screenshot_format", config.screenshot_format.as_str());
    for arg in &config.mpv_args {
      launch.add_arg(arg);
    }
    launch
  }

  /// Full argument set for playing `target` with `config`.
  pub fn build(config: &PlayerConfig, info: Option<Arc<PlayerInfo>>, target: &str, is_playlist: bool) -> Self {
    let mut launch = Self::from_config(config, info);
    let disc = DiscName::parse(target);
    let cache = match &disc {
      Some(_) => config.cache_for_discs,
      None if target.contains("://") => config.cache_for_streams,
      None => config.cache_for_files,
    };
    launch.set_option("cache", cache);

    if disc.as_ref().is_some_and(|d| d.device.is_none()) {
      let device = match disc.as_ref().map(|d| d.disc_type) {
        Some(DiscType::BluRay) => ("bluray-device", &config.bluray_device),
        Some(DiscType::Vcd) | Some(DiscType::AudioCd) => ("cdrom-device", &config.cdrom_device),
        _ => ("dvd-device", &config.dvd_device),
      };
      if !device.1.is_empty() {
        launch.set_option(device.0, device.1.as_str());
      }
    }
    launch.set_media(target, is_playlist);
    launch
  }

  pub fn add_arg(&mut self, arg: impl Into<String>) {
    self.args.push(arg.into());
  }

  /// Set the media target and the property dump the parser relies on.
  pub fn set_media(&mut self, target: &str, is_playlist: bool) {
    self.args.push(format!("--term-playing-msg={}", playing_template()));

    if let Some(disc) = DiscName::parse(target) {
      if let Some(device) = &disc.device {
        let option = match disc.disc_type {
          DiscType::BluRay => "--bluray-device",
          DiscType::Vcd | DiscType::AudioCd => "--cdrom-device",
          DiscType::Dvd | DiscType::DvdNav => "--dvd-device",
        };
        self.args.push(format!("{}={}", option, device));
      }
      self.media = Some(disc.player_url());
    } else if is_playlist {
      self.media = Some(format!("--playlist={}", target));
    } else {
      self.media = Some(target.to_string());
    }
  }

  fn option_available(&self, option: &str) -> bool {
    self
      .info
      .as_ref()
      .map_or(true, |info| info.option_list.is_empty() || info.is_option_available(option))
  }

  fn push(&mut self, flag: &str, value: &OptionValue) {
    self.args.push(format!("--{}={}", flag, value));
  }

  fn push_toggle(&mut self, flag: &str, on: bool) {
    if on {
      self.args.push(format!("--{}", flag));
    } else {
      self.args.push(format!("--no-{}", flag));
    }
  }

  /// Map an abstract option to player flags. Unknown names are logged and dropped.
  pub fn set_option(&mut self, name: &str, value: impl Into<OptionValue>) {
    let value = value.into();
    match name {
      "cache" => match value.as_int() {
        Some(kb) if kb >= MIN_CACHE_KB => {
          self.args.push("--cache=yes".to_string());
          self.args.push(format!("--demuxer-max-bytes={}KiB", kb));
        }
        _ => self.args.push("--cache=no".to_string()),
      },
      "ss" | "start" => self.push("start", &value),
      "endpos" => self.push("length", &value),
      "title" => self.push("force-media-title", &value),
      "volume" | "speed" | "alang" | "slang" | "vo" | "ao" | "demuxer" | "monitorpixelaspect" | "user-agent"
      | "referrer" | "brightness" | "contrast" | "gamma" | "hue" | "saturation" | "sub-font" | "sub-scale"
      | "osd-scale" | "wid" | "dvd-device" | "cdrom-device" | "bluray-device" => self.push(name, &value),
      "aid" | "vid" | "sid" => match value.as_int() {
        Some(id) if id < 0 => self.args.push(format!("--{}=no", name)),
        _ => self.push(name, &value),
      },
      "mute" | "embeddedfonts" | "deinterlace" => self.push(name, &OptionValue::Bool(value.as_bool())),
      "audiofile" => self.push("audio-file", &value),
      "sub" => self.push("sub-file", &value),
      "subcp" => self.push("sub-codepage", &value),
      "subpos" => self.push("sub-pos", &value),
      "sub-fuzziness" => {
        let mode = match value.as_int() {
          Some(0) => "exact",
          Some(2) => "all",
          _ => "fuzzy",
        };
        self.args.push(format!("--sub-auto={}", mode));
      }
      "ass" => self.push_toggle("sub-ass", value.as_bool()),
      "ass-style-override" => {
        let mode = if value.as_bool() { "force" } else { "yes" };
        self.args.push(format!("--sub-ass-override={}", mode));
      }
      "ass-force-style" => {
        if self.option_available("sub-ass-force-style") {
          self.push("sub-ass-force-style", &value);
        } else {
          self.push("ass-force-style", &value);
        }
      }
      "stop-xscreensaver" => self.push("stop-screensaver", &OptionValue::Bool(value.as_bool())),
      "fs" => self.push_toggle("fs", value.as_bool()),
      "ontop" => self.push_toggle("ontop", value.as_bool()),
      "correct-pts" => self.push_toggle("correct-pts", value.as_bool()),
      "framedrop" => match value {
        OptionValue::Str(mode) => self.args.push(format!("--framedrop={}", mode)),
        other => {
          let mode = if other.as_bool() { "vo" } else { "no" };
          self.args.push(format!("--framedrop={}", mode));
        }
      },
      "hwdec" => {
        if self.option_available("hwdec") {
          self.push("hwdec", &value);
        } else {
          log::warn!("Player has no --hwdec, option ignored");
        }
      }
      "aspect" => self.push("video-aspect-override", &value),
      "vc" => self.push("vd", &value),
      "ac" => self.push("ad", &value),
      "idx" | "forceidx" => {
        let mode = if value.as_bool() { "recreate" } else { "default" };
        self.args.push(format!("--index={}", mode));
      }
      "channels" => self.push("audio-channels", &value),
      "loop" => {
        let count = match value.as_int() {
          Some(0) => "inf".to_string(),
          Some(n) if n > 0 => n.to_string(),
          _ => "no".to_string(),
        };
        self.args.push(format!("--loop-file={}", count));
      }
      "screenshot_template" => self.push("screenshot-template", &value),
      "screenshot_format" => self.push("screenshot-format", &value),
      "screenshot_directory" => self.push("screenshot-directory", &value),
      "osdlevel" => self.push("osd-level", &value),
      "verbose" => self.args.push("-v".to_string()),
      "softvol-max" => self.push("volume-max", &value),
      "tsprog" => self.push("ts-program", &value),
      "threads" => self.push("vd-lavc-threads", &value),
      "skiploopfilter" => self.args.push("--vd-lavc-skiploopfilter=all".to_string()),
      "fast" => self.args.push("--vd-lavc-fast".to_string()),
      _ if IGNORED_OPTIONS.contains(&name) => {
        log::debug!("Option '{}' has no mpv equivalent, skipped", name);
      }
      _ => log::warn!("Unknown player option '{}' ignored", name),
    }
  }

  /// Request a video filter by logical name.
  pub fn add_vf(&mut self, name: &str, option: &str) {
    let translation = video_filter(name, option);
    self.add_filter("vf", name, translation);
  }

  /// Request an audio filter by logical name.
  pub fn add_af(&mut self, name: &str, option: &str) {
    let translation = audio_filter(name, option);
    self.add_filter("af", name, translation);
  }

  fn add_filter(&mut self, kind: &str, name: &str, translation: Translation) {
    match &translation {
      Translation::Filter(chain) => {
        let base = translation.base_name().unwrap_or_default();
        let available = self.info.as_ref().map_or(true, |info| {
          let list = if kind == "vf" { &info.vf_list } else { &info.af_list };
          list.is_empty() || list.iter().any(|i| i.name == base)
        });
        if available {
          self.args.push(format!("--{}-add={}", kind, chain));
        } else {
          log::warn!("Filter '{}' ({}) not available in this player, skipped", name, base);
        }
      }
      Translation::Builtin => log::debug!("Filter '{}' not needed with mpv", name),
      Translation::Unsupported => {
        log::warn!("Filter '{}' is not supported by mpv", name);
        self.unsupported.push(name.to_string());
      }
      Translation::Unknown => log::warn!("Unknown {} filter '{}' ignored", kind, name),
    }
  }

  /// Filters that were requested but cannot be honored.
  pub fn unsupported_filters(&self) -> &[String] {
    &self.unsupported
  }

  /// Whether a start position was requested.
  pub fn has_start(&self) -> bool {
    self.args.iter().any(|a| a.starts_with("--start="))
  }

  /// The media target, once set.
  pub fn media(&self) -> Option<&str> {
    self.media.as_deref()
  }

  /// Final argument vector with the media target last.
  pub fn to_args(&self) -> Vec<String> {
    let mut args = self.args.clone();
    if let Some(media) = &self.media {
      args.push(media.clone());
    }
    args
  }
}
