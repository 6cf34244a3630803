//! Text command protocol spoken over the player's stdin, and the output
//! templates the player is told to print.
//!
//! The templates here and the grammars in `parser.rs` form one contract and
//! must change together.

use std::fmt;

/// Status line printed on every position tick.
pub const STATUS_TEMPLATE: &str =
  "STATUS: ${=time-pos:0} / ${=duration:${=length:0}} P: ${=pause} B: ${=paused-for-cache} I: ${=core-idle}";

/// Property dump printed once playback starts.
pub const PLAYING_TEMPLATE: &[&str] = &[
  "INFO_MEDIA_TITLE=${=media-title:}",
  "INFO_STREAM_PATH=${=stream-path:}",
  "INFO_VIDEO_WIDTH=${=width:0}",
  "INFO_VIDEO_HEIGHT=${=height:0}",
  "INFO_VIDEO_ASPECT=${=video-params/aspect:0}",
  "INFO_VIDEO_FPS=${=container-fps:${=fps:0}}",
  "INFO_VIDEO_FORMAT=${=video-format:}",
  "INFO_VIDEO_CODEC=${=video-codec:}",
  "INFO_AUDIO_FORMAT=${=audio-codec-name:}",
  "INFO_AUDIO_CODEC=${=audio-codec:}",
  "INFO_AUDIO_RATE=${=audio-params/samplerate:0}",
  "INFO_AUDIO_NCH=${=audio-params/channel-count:0}",
  "INFO_DEMUXER=${=current-demuxer:${=demuxer:}}",
  "INFO_LENGTH=${=duration:${=length:0}}",
  "INFO_CHAPTERS=${=chapters:0}",
  "INFO_TITLES=${=disc-titles:0}",
  "INFO_DISC_TITLE=${=disc-title:-1}",
  "INFO_OSD_MARGIN_X=${=osd-margin-x:0}",
  "INFO_OSD_MARGIN_Y=${=osd-margin-y:0}",
  "METADATA_TITLE=${metadata/by-key/title:}",
  "METADATA_ARTIST=${metadata/by-key/artist:}",
  "METADATA_ALBUM=${metadata/by-key/album:}",
  "METADATA_GENRE=${metadata/by-key/genre:}",
  "METADATA_DATE=${metadata/by-key/date:}",
  "METADATA_TRACK=${metadata/by-key/track:}",
  "METADATA_COPYRIGHT=${metadata/by-key/copyright:}",
  "METADATA_COMMENT=${metadata/by-key/comment:}",
  "METADATA_SOFTWARE=${metadata/by-key/encoder:}",
];

/// The full `--term-playing-msg` value.
pub fn playing_template() -> String {
  PLAYING_TEMPLATE.join("\n")
}

/// How a seek target is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
  Relative,
  AbsolutePercent,
  Absolute,
}

impl SeekMode {
  fn as_str(self) -> &'static str {
    match self {
      SeekMode::Relative => "relative",
      SeekMode::AbsolutePercent => "absolute-percent",
      SeekMode::Absolute => "absolute",
    }
  }
}

/// Disc menu navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscNav {
  Up,
  Down,
  Left,
  Right,
  Menu,
  Select,
  Prev,
  Mouse,
}

impl DiscNav {
  fn as_str(self) -> &'static str {
    match self {
      DiscNav::Up => "up",
      DiscNav::Down => "down",
      DiscNav::Left => "left",
      DiscNav::Right => "right",
      DiscNav::Menu => "menu",
      DiscNav::Select => "select",
      DiscNav::Prev => "prev",
      DiscNav::Mouse => "mouse",
    }
  }
}

/// Video equalizer properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEq {
  Brightness,
  Contrast,
  Gamma,
  Hue,
  Saturation,
}

impl VideoEq {
  fn as_str(self) -> &'static str {
    match self {
      VideoEq::Brightness => "brightness",
      VideoEq::Contrast => "contrast",
      VideoEq::Gamma => "gamma",
      VideoEq::Hue => "hue",
      VideoEq::Saturation => "saturation",
    }
  }
}

fn yes_no(value: bool) -> &'static str {
  if value {
    "yes"
  } else {
    "no"
  }
}

/// Quote a string argument for the input command parser.
fn quote(text: &str) -> String {
  format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// One line of the player's input command language. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpvCommand(String);

impl MpvCommand {
  pub fn raw(line: impl Into<String>) -> Self {
    Self(line.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn set_property(name: &str, value: impl fmt::Display) -> Self {
    Self(format!("set {} {}", name, value))
  }

  pub fn cycle(property: &str) -> Self {
    Self(format!("cycle {}", property))
  }

  pub fn add(property: &str, step: impl fmt::Display) -> Self {
    Self(format!("add {} {}", property, step))
  }

  pub fn set_pause(paused: bool) -> Self {
    Self::set_property("pause", yes_no(paused))
  }

  pub fn frame_step() -> Self {
    Self::raw("frame-step")
  }

  pub fn frame_back_step() -> Self {
    Self::raw("frame-back-step")
  }

  pub fn set_volume(volume: i32) -> Self {
    Self::set_property("volume", volume.clamp(0, 100))
  }

  pub fn set_mute(muted: bool) -> Self {
    Self::set_property("mute", yes_no(muted))
  }

  pub fn set_speed(speed: f64) -> Self {
    Self::set_property("speed", speed)
  }

  /// `exact` selects frame-accurate seeking; otherwise the nearest keyframe.
  pub fn seek(secs: f64, mode: SeekMode, exact: bool) -> Self {
    let precision = if exact { "exact" } else { "keyframes" };
    Self(format!("seek {} {} {}", secs, mode.as_str(), precision))
  }

  pub fn set_video_track(id: i32) -> Self {
    Self::set_property("vid", id)
  }

  pub fn set_audio_track(id: i32) -> Self {
    Self::set_property("aid", id)
  }

  /// `None` disables subtitles.
  pub fn set_subtitle(id: Option<i32>) -> Self {
    match id {
      Some(id) => Self::set_property("sid", id),
      None => Self::set_property("sid", "no"),
    }
  }

  pub fn set_secondary_subtitle(id: Option<i32>) -> Self {
    match id {
      Some(id) => Self::set_property("secondary-sid", id),
      None => Self::set_property("secondary-sid", "no"),
    }
  }

  pub fn load_subtitle(path: &str) -> Self {
    Self(format!("sub-add {}", quote(path)))
  }

  pub fn load_audio_file(path: &str) -> Self {
    Self(format!("audio-add {}", quote(path)))
  }

  /// Delay in seconds.
  pub fn set_audio_delay(secs: f64) -> Self {
    Self::set_property("audio-delay", secs)
  }

  pub fn set_sub_delay(secs: f64) -> Self {
    Self::set_property("sub-delay", secs)
  }

  pub fn set_sub_scale(scale: f64) -> Self {
    Self::set_property("sub-scale", scale)
  }

  /// Vertical subtitle position, 0 (top) to 100 (bottom).
  pub fn set_sub_pos(pos: i32) -> Self {
    Self::set_property("sub-pos", pos.clamp(0, 100))
  }

  pub fn sub_step(step: i32) -> Self {
    Self(format!("sub-step {}", step))
  }

  pub fn screenshot(include_subtitles: bool) -> Self {
    Self(format!("screenshot {}", if include_subtitles { "subtitles" } else { "video" }))
  }

  /// Start or stop saving every frame.
  pub fn screenshot_each_frame(include_subtitles: bool) -> Self {
    let mode = if include_subtitles { "subtitles" } else { "video" };
    Self(format!("screenshot {}+each-frame", mode))
  }

  /// `None` restores the original aspect.
  pub fn set_aspect(aspect: Option<f64>) -> Self {
    match aspect {
      Some(aspect) => Self::set_property("video-aspect-override", aspect),
      None => Self::set_property("video-aspect-override", -1),
    }
  }

  pub fn toggle_deinterlace() -> Self {
    Self::cycle("deinterlace")
  }

  pub fn set_zoom(zoom: f64) -> Self {
    Self::set_property("video-zoom", zoom)
  }

  pub fn set_pan(x: f64, y: f64) -> Vec<Self> {
    vec![
      Self::set_property("video-pan-x", x),
      Self::set_property("video-pan-y", y),
    ]
  }

  /// Equalizer value in -100..=100.
  pub fn set_video_eq(property: VideoEq, value: i32) -> Self {
    Self::set_property(property.as_str(), value.clamp(-100, 100))
  }

  /// `None` loops forever, `Some(0)` disables looping.
  pub fn set_loop(times: Option<u32>) -> Self {
    match times {
      None => Self::set_property("loop-file", "inf"),
      Some(0) => Self::set_property("loop-file", "no"),
      Some(n) => Self::set_property("loop-file", n),
    }
  }

  pub fn set_ab_loop(a: Option<f64>, b: Option<f64>) -> Vec<Self> {
    let point = |p: Option<f64>| p.map_or_else(|| "no".to_string(), |v| v.to_string());
    vec![
      Self::set_property("ab-loop-a", point(a)),
      Self::set_property("ab-loop-b", point(b)),
    ]
  }

  pub fn set_chapter(id: i32) -> Self {
    Self::set_property("chapter", id)
  }

  pub fn next_chapter() -> Self {
    Self::add("chapter", 1)
  }

  pub fn previous_chapter() -> Self {
    Self::add("chapter", -1)
  }

  /// Player title numbers are zero-based; `id` is one-based.
  pub fn set_title(id: i32) -> Self {
    Self::set_property("disc-title", id - 1)
  }

  pub fn disc_nav(key: DiscNav) -> Self {
    Self(format!("discnav {}", key.as_str()))
  }

  pub fn set_osd_level(level: i32) -> Self {
    Self::set_property("osd-level", level.clamp(0, 3))
  }

  pub fn show_osd_text(text: &str, duration_ms: u32, level: i32) -> Self {
    Self(format!("show-text {} {} {}", quote(text), duration_ms, level))
  }

  pub fn vf_add(filter: &str) -> Self {
    Self(format!("vf add {}", filter))
  }

  pub fn vf_remove(filter: &str) -> Self {
    Self(format!("vf del {}", filter))
  }

  pub fn af_add(filter: &str) -> Self {
    Self(format!("af add {}", filter))
  }

  pub fn af_remove(filter: &str) -> Self {
    Self(format!("af del {}", filter))
  }

  /// Ask the player to print `text` after property expansion.
  pub fn print_text(text: &str) -> Self {
    Self(format!("print-text {}", quote(text)))
  }

  /// Detail queries for one chapter, by zero-based index.
  pub fn query_chapter(index: i32) -> Vec<Self> {
    vec![
      Self::print_text(&format!("INFO_CHAPTER_{0}_NAME=${{chapter-list/{0}/title:}}", index)),
      Self::print_text(&format!("INFO_CHAPTER_{0}_START=${{=chapter-list/{0}/time:}}", index)),
    ]
  }

  /// Detail queries for one disc title, by zero-based index.
  pub fn query_title(index: i32) -> Vec<Self> {
    vec![
      Self::print_text(&format!("INFO_TITLE_{0}_LENGTH=${{=disc-title-list/{0}/length:}}", index)),
      Self::print_text(&format!("INFO_TITLE_{0}_NAME=${{disc-title-list/{0}/title:}}", index)),
    ]
  }

  pub fn query_bitrates() -> Vec<Self> {
    vec![
      Self::print_text("INFO_VIDEO_BITRATE=${=video-bitrate:0}"),
      Self::print_text("INFO_AUDIO_BITRATE=${=audio-bitrate:0}"),
    ]
  }

  pub fn quit(exit_code: i32) -> Self {
    Self(format!("quit {}", exit_code))
  }
}

impl fmt::Display for MpvCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Past this margin the OSD is centered on that axis instead.
pub const MAX_OSD_MARGIN: i32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisPos {
  Margin(i32),
  Centered,
}

/// Emulates pixel positioning of OSD text with margins and alignment,
/// remembering what was last written so repeated calls are silent.
#[derive(Debug, Default)]
pub struct OsdPositioner {
  x: Option<AxisPos>,
  y: Option<AxisPos>,
}

impl OsdPositioner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Forget the written state, e.g. for a new process.
  pub fn reset(&mut self) {
    self.x = None;
    self.y = None;
  }

  pub fn set_pos(&mut self, x: i32, y: i32) -> Vec<MpvCommand> {
    let mut commands = Vec::new();
    Self::axis(&mut self.x, x, "osd-align-x", "left", "osd-margin-x", &mut commands);
    Self::axis(&mut self.y, y, "osd-align-y", "top", "osd-margin-y", &mut commands);
    commands
  }

  fn axis(
    current: &mut Option<AxisPos>,
    value: i32,
    align_prop: &str,
    edge: &str,
    margin_prop: &str,
    commands: &mut Vec<MpvCommand>,
  ) {
    let wanted = if value <= MAX_OSD_MARGIN {
      AxisPos::Margin(value.max(0))
    } else {
      AxisPos::Centered
    };
    if *current == Some(wanted) {
      return;
    }

    let was_centered = matches!(current, Some(AxisPos::Centered));
    let first_write = current.is_none();
    match wanted {
      AxisPos::Margin(margin) => {
        if first_write || was_centered {
          commands.push(MpvCommand::set_property(align_prop, edge));
        }
        commands.push(MpvCommand::set_property(margin_prop, margin));
      }
      AxisPos::Centered => {
        commands.push(MpvCommand::set_property(align_prop, "center"));
      }
    }
    *current = Some(wanted);
  }
}
