//! Line parser for the player's terminal output.
//!
//! The status line is checked first on every line because it arrives on every
//! position tick. Everything else goes through an ordered table of grammars;
//! lines nothing matches are logged and dropped.

use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::events::PlayerEvent;
use super::protocol::MpvCommand;
use crate::media::{MediaState, SubtitleSource, Track, TrackKind};

static STATUS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^STATUS: ([0-9.\-]+) / ([0-9.\-]+) P: (yes|no) B: (yes|no) I: (yes|no)")
    .expect("status regex should compile")
});

/// Codecs the player uses for closed captions.
const CAPTION_CODECS: &[&str] = &["eia_608", "eia_708", "cc_dec"];

/// Upper bound on announced chapter and title counts.
const MAX_TABLE_SIZE: i32 = 999;

/// Signals for the lifecycle controller, produced alongside events.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
  /// First real playback tick of this media.
  Playing,
  /// Playback tick at this position.
  Position(f64),
  /// Paused or waiting for the cache.
  Stalled,
  EndOfFile,
  /// The player moved to another disc title (one-based).
  TitleSwitched(i32),
  TitleNotFound,
  /// Playlist mode moved on to the next entry.
  NewMedia,
}

/// Everything a parsed line can lead to.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
  Event(PlayerEvent),
  Command(MpvCommand),
  Delayed(Duration, MpvCommand),
  Signal(Signal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
  Unknown,
  Playing,
  Paused,
  Buffering,
}

type Handler = fn(&mut OutputParser, &Captures, &mut MediaState, &mut Vec<Output>);

struct Grammar {
  name: &'static str,
  regex: Regex,
  handler: Handler,
}

fn grammar(name: &'static str, pattern: &str, handler: Handler) -> Grammar {
  Grammar {
    name,
    regex: Regex::new(pattern).unwrap_or_else(|e| panic!("grammar {} should compile: {}", name, e)),
    handler,
  }
}

static GRAMMARS: Lazy<Vec<Grammar>> = Lazy::new(|| {
  vec![
    grammar(
      "track",
      r"^\s*(\(\+\)|●|○)?\s*(Video|Audio|Subs)\s+--(?:vid|aid|sid)=(\d+)(?:\s+--[avs]lang=([^\s']+))?(?:\s+\(\*\))?(?:\s+'(.*?)')?(?:\s+\(([^)]*)\))?(.*)$",
      OutputParser::on_track,
    ),
    grammar("chapter", r"^INFO_CHAPTER_(\d+)_(NAME|START)=(.*)$", OutputParser::on_chapter),
    grammar("title", r"^INFO_TITLE_(\d+)_(LENGTH|NAME)=(.*)$", OutputParser::on_title),
    grammar("property", r"^(INFO_[A-Z0-9_]+|METADATA_[A-Z]+)=(.*)$", OutputParser::on_property),
    grammar(
      "title_switch",
      r"^\[(?:dvdnav|dvd|bd|bluray)\]\s+(?:[Ss]witched to |[Nn]ew )?title:?\s+(\d+)",
      OutputParser::on_title_switch,
    ),
    grammar(
      "title_not_found",
      r"^\[(?:dvdnav|dvd|bd|bluray)\].*(?:[Tt]itle \d+ not found|[Ii]nvalid title|[Tt]itle not found)",
      OutputParser::on_title_not_found,
    ),
    grammar("stream_title", r"^\s*icy-title:\s*(.*)$", OutputParser::on_stream_title),
    grammar("playing", r"^Playing:\s+(.+)$", OutputParser::on_playing),
    grammar("end_of_file", r"^(?:Exiting\.\.\. \(End of file\)|ID_EXIT=EOF)", OutputParser::on_end_of_file),
    grammar("forbidden", r"(?:^|\s)HTTP error 403", OutputParser::on_forbidden),
    grammar("screenshot", r"^Screenshot: '(.*)'", OutputParser::on_screenshot),
    grammar(
      "error",
      r"^((?:Failed to open|Errors when loading file|Failed to recognize file format).*)$",
      OutputParser::on_error,
    ),
  ]
});

fn num<T: FromStr>(text: &str) -> Option<T> {
  text.trim().parse().ok()
}

fn table_size(text: &str) -> i32 {
  num::<i32>(text).unwrap_or(0).clamp(0, MAX_TABLE_SIZE)
}

fn same_kind(a: &PlayerEvent, b: &PlayerEvent) -> bool {
  match (a, b) {
    (PlayerEvent::TrackInfoChanged(x), PlayerEvent::TrackInfoChanged(y)) => x == y,
    _ => std::mem::discriminant(a) == std::mem::discriminant(b),
  }
}

/// Turns output lines into state changes, events and follow-up commands.
#[derive(Debug)]
pub struct OutputParser {
  bitrate_delay: Duration,
  loaded: bool,
  activity: Activity,
  prev_frame: Option<i64>,
  /// Change notifications held back until the media is fully loaded.
  pending: Vec<PlayerEvent>,
}

impl OutputParser {
  pub fn new(bitrate_delay: Duration) -> Self {
    Self {
      bitrate_delay,
      loaded: false,
      activity: Activity::Unknown,
      prev_frame: None,
      pending: Vec::new(),
    }
  }

  /// Back to the starting state for a new media.
  pub fn reset(&mut self) {
    self.loaded = false;
    self.activity = Activity::Unknown;
    self.prev_frame = None;
    self.pending.clear();
  }

  pub fn is_loaded(&self) -> bool {
    self.loaded
  }

  pub fn activity(&self) -> Activity {
    self.activity
  }

  pub fn parse_line(&mut self, line: &str, media: &mut MediaState) -> Vec<Output> {
    let mut out = Vec::new();
    let line = line.trim_end();
    if line.is_empty() {
      return out;
    }

    if let Some(caps) = STATUS.captures(line) {
      self.on_status(&caps, media, &mut out);
      return out;
    }

    for grammar in GRAMMARS.iter() {
      if let Some(caps) = grammar.regex.captures(line) {
        log::trace!("{} <- {}", grammar.name, line);
        (grammar.handler)(self, &caps, media, &mut out);
        return out;
      }
    }

    log::debug!("Unmatched player output: {}", line);
    out
  }

  /// Deliver a state change now, or hold it until the media is fully loaded.
  fn notify(&mut self, event: PlayerEvent, out: &mut Vec<Output>) {
    if self.loaded {
      out.push(Output::Event(event));
    } else {
      self.pending.retain(|p| !same_kind(p, &event));
      self.pending.push(event);
    }
  }

  fn start_playing(&mut self, media: &mut MediaState, out: &mut Vec<Output>) {
    self.loaded = true;
    if !media.has_video_dimensions() {
      media.no_video = true;
    }
    log::info!(
      "Playback started: {} (video: {})",
      media.display_name(),
      if media.no_video { "none" } else { "yes" }
    );
    out.extend(self.pending.drain(..).map(Output::Event));
    out.push(Output::Event(PlayerEvent::PlayerFullyLoaded));
    for command in MpvCommand::query_bitrates() {
      out.push(Output::Delayed(self.bitrate_delay, command));
    }
    out.push(Output::Signal(Signal::Playing));
  }

  fn on_status(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let position = num::<f64>(&caps[1]).unwrap_or(0.0).max(0.0);
    let duration = num::<f64>(&caps[2]).unwrap_or(0.0);
    let paused = &caps[3] == "yes";
    let buffering = &caps[4] == "yes";
    let idle = &caps[5] == "yes";

    if duration > 0.0 && duration != media.duration {
      media.duration = duration;
      self.notify(PlayerEvent::DurationChanged(duration), out);
    }

    if paused {
      if self.activity != Activity::Paused {
        self.activity = Activity::Paused;
        out.push(Output::Event(PlayerEvent::ReceivedPause));
        out.push(Output::Signal(Signal::Stalled));
      }
      return;
    }

    if buffering || idle {
      if self.activity != Activity::Buffering {
        self.activity = Activity::Buffering;
        out.push(Output::Event(PlayerEvent::ReceivedBuffering));
        out.push(Output::Signal(Signal::Stalled));
      }
      return;
    }

    let resumed = matches!(self.activity, Activity::Paused | Activity::Buffering);
    self.activity = Activity::Playing;
    if !self.loaded {
      self.start_playing(media, out);
    }
    if resumed {
      out.push(Output::Event(PlayerEvent::ReceivedBufferingEnded));
    }

    media.position = position;
    out.push(Output::Event(PlayerEvent::ReceivedCurrentSec(position)));
    if media.video.fps > 0.0 {
      let frame = (position * media.video.fps).round() as i64;
      if self.prev_frame != Some(frame) {
        self.prev_frame = Some(frame);
        out.push(Output::Event(PlayerEvent::ReceivedCurrentFrame(frame)));
      }
    }
    out.push(Output::Signal(Signal::Position(position)));
  }

  fn on_track(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let kind = match &caps[2] {
      "Video" => TrackKind::Video,
      "Audio" => TrackKind::Audio,
      _ => TrackKind::Subtitle,
    };
    let Some(id) = num::<i32>(&caps[3]) else {
      return;
    };
    let selected = caps.get(1).is_some_and(|m| m.as_str() != "○");
    let lang = caps.get(4).map_or("", |m| m.as_str());
    let title = caps.get(5).map_or("", |m| m.as_str());
    let codec = caps
      .get(6)
      .and_then(|m| m.as_str().split_whitespace().next())
      .unwrap_or("");
    let rest = caps.get(7).map_or("", |m| m.as_str());

    let name = Track::display_name(title, lang, codec);
    let tracks = media.tracks_mut(kind);
    let mut changed = tracks.update(id, &name, lang, selected);
    if kind == TrackKind::Subtitle {
      let (source, filename) = if rest.contains("(external)") {
        (SubtitleSource::File, Some(title.to_string()).filter(|t| !t.is_empty()))
      } else if CAPTION_CODECS.contains(&codec) {
        (SubtitleSource::ClosedCaption, None)
      } else {
        (SubtitleSource::Embedded, None)
      };
      changed |= tracks.set_source(id, source, filename);
    }

    if changed {
      self.notify(PlayerEvent::TrackInfoChanged(kind), out);
    }
  }

  fn on_chapter(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let Some(id) = num::<i32>(&caps[1]) else {
      return;
    };
    let value = &caps[3];
    let changed = match &caps[2] {
      "NAME" => media.chapters.set_title(id, value),
      _ => match num::<f64>(value) {
        Some(start) => media.chapters.set_start(id, start),
        None => false,
      },
    };
    if changed {
      self.notify(PlayerEvent::ChaptersChanged, out);
    }
  }

  fn on_title(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let Some(index) = num::<i32>(&caps[1]) else {
      return;
    };
    let Some(id) = index.checked_add(1) else {
      return;
    };
    let value = &caps[3];
    let changed = match &caps[2] {
      "LENGTH" => num::<f64>(value).is_some_and(|length| media.titles.set_duration(id, length)),
      _ => !value.is_empty() && media.titles.set_name(id, value),
    };
    if changed {
      self.notify(PlayerEvent::TitlesChanged, out);
    }
  }

  fn on_property(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let key = &caps[1];
    let value = caps[2].trim();

    if let Some(field) = key.strip_prefix("METADATA_") {
      let old = media.clip.clone();
      if media.clip.set(field, value) && media.clip != old {
        self.notify(PlayerEvent::MetadataChanged, out);
      }
      return;
    }

    match key {
      "INFO_MEDIA_TITLE" => media.media_title = value.to_string(),
      "INFO_STREAM_PATH" => media.stream_path = value.to_string(),
      "INFO_VIDEO_WIDTH" => media.video.width = num(value).unwrap_or(0),
      "INFO_VIDEO_HEIGHT" => media.video.height = num(value).unwrap_or(0),
      "INFO_VIDEO_ASPECT" => media.video.aspect = num(value).unwrap_or(0.0),
      "INFO_VIDEO_FPS" => media.video.fps = num(value).unwrap_or(0.0),
      "INFO_VIDEO_FORMAT" => media.video.format = value.to_string(),
      "INFO_VIDEO_CODEC" => media.video.codec = value.to_string(),
      "INFO_AUDIO_FORMAT" => media.audio.format = value.to_string(),
      "INFO_AUDIO_CODEC" => media.audio.codec = value.to_string(),
      "INFO_AUDIO_RATE" => media.audio.rate = num(value).unwrap_or(0),
      "INFO_AUDIO_NCH" => media.audio.channels = num(value).unwrap_or(0),
      "INFO_DEMUXER" => media.demuxer = value.to_string(),
      "INFO_LENGTH" => {
        let duration = num::<f64>(value).unwrap_or(0.0);
        if duration > 0.0 && duration != media.duration {
          media.duration = duration;
          self.notify(PlayerEvent::DurationChanged(duration), out);
        }
      }
      "INFO_CHAPTERS" => {
        let count = table_size(value);
        media.chapters.set_count(count);
        for index in 0..count {
          out.extend(MpvCommand::query_chapter(index).into_iter().map(Output::Command));
        }
        self.notify(PlayerEvent::ChaptersChanged, out);
      }
      "INFO_TITLES" => {
        let count = table_size(value);
        media.titles.set_count(count, 1);
        for index in 0..count {
          out.extend(MpvCommand::query_title(index).into_iter().map(Output::Command));
        }
        self.notify(PlayerEvent::TitlesChanged, out);
      }
      "INFO_DISC_TITLE" => {
        if let Some(title) = num::<i32>(value).filter(|i| *i >= 0).and_then(|i| i.checked_add(1)) {
          media.titles.selected = Some(title);
        }
      }
      "INFO_VIDEO_BITRATE" => {
        let bitrate = num::<f64>(value).unwrap_or(0.0) as i32;
        media.video.bitrate = bitrate;
        out.push(Output::Event(PlayerEvent::VideoBitrateChanged(bitrate)));
      }
      "INFO_AUDIO_BITRATE" => {
        let bitrate = num::<f64>(value).unwrap_or(0.0) as i32;
        media.audio.bitrate = bitrate;
        out.push(Output::Event(PlayerEvent::AudioBitrateChanged(bitrate)));
      }
      _ => {
        media.properties.insert(key.to_string(), value.to_string());
      }
    }
  }

  fn on_title_switch(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let Some(index) = num::<i32>(&caps[1]) else {
      return;
    };
    let Some(title) = index.checked_add(1) else {
      return;
    };
    if self.loaded {
      out.push(Output::Signal(Signal::TitleSwitched(title)));
    } else {
      media.titles.selected = Some(title);
    }
  }

  fn on_title_not_found(&mut self, _caps: &Captures, _media: &mut MediaState, out: &mut Vec<Output>) {
    out.push(Output::Signal(Signal::TitleNotFound));
  }

  fn on_stream_title(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let title = caps[1].trim().to_string();
    if title != media.clip.stream_title {
      media.clip.stream_title = title.clone();
      self.notify(PlayerEvent::StreamTitleChanged(title), out);
    }
  }

  fn on_playing(&mut self, caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    let file = caps[1].trim();
    if self.loaded {
      // Playlist mode: the next entry starts from scratch.
      let disc = media.disc.clone();
      *media = MediaState::new(file);
      media.disc = media.disc.take().or(disc);
      self.reset();
      out.push(Output::Signal(Signal::NewMedia));
    }
    out.push(Output::Event(PlayerEvent::NewMediaStarted(file.to_string())));
  }

  fn on_end_of_file(&mut self, _caps: &Captures, media: &mut MediaState, out: &mut Vec<Output>) {
    if !self.loaded {
      log::debug!("End of file before playback started");
      self.start_playing(media, out);
    }
    out.push(Output::Signal(Signal::EndOfFile));
  }

  fn on_forbidden(&mut self, _caps: &Captures, _media: &mut MediaState, out: &mut Vec<Output>) {
    out.push(Output::Event(PlayerEvent::ReceivedForbidden));
  }

  fn on_screenshot(&mut self, caps: &Captures, _media: &mut MediaState, out: &mut Vec<Output>) {
    out.push(Output::Event(PlayerEvent::ScreenshotTaken(caps[1].to_string())));
  }

  fn on_error(&mut self, caps: &Captures, _media: &mut MediaState, out: &mut Vec<Output>) {
    log::warn!("Player: {}", &caps[1]);
    out.push(Output::Event(PlayerEvent::Message(caps[1].to_string())));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parser() -> OutputParser {
    OutputParser::new(Duration::from_secs(12))
  }

  fn events(outputs: &[Output]) -> Vec<PlayerEvent> {
    outputs
      .iter()
      .filter_map(|o| match o {
        Output::Event(e) => Some(e.clone()),
        _ => None,
      })
      .collect()
  }

  fn feed(parser: &mut OutputParser, media: &mut MediaState, lines: &[&str]) -> Vec<Output> {
    lines.iter().flat_map(|l| parser.parse_line(l, media)).collect()
  }

  const PLAYING: &str = "STATUS: 1.0 / 100.0 P: no B: no I: no";

  #[test]
  fn test_video_track_codec_fallback_and_selection() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    p.parse_line(PLAYING, &mut media);

    let out = p.parse_line(" (+) Video --vid=1 (*) (h264 1920x1080 23.976fps)", &mut media);
    assert_eq!(events(&out), vec![PlayerEvent::TrackInfoChanged(TrackKind::Video)]);
    let track = media.video_tracks.get(1).unwrap();
    assert_eq!(track.name, "(h264)");
    assert_eq!(track.lang, "");
    assert!(track.selected);

    p.parse_line(" (+) Video --vid=2 (hevc 1280x720)", &mut media);
    assert!(!media.video_tracks.get(1).unwrap().selected);
    assert_eq!(media.video_tracks.selected_id(), Some(2));
  }

  #[test]
  fn test_repeated_track_line_is_silent() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    p.parse_line(PLAYING, &mut media);
    let line = " (+) Audio --aid=1 --alang=eng (*) 'English' (ac3 6ch 48000Hz)";
    assert_eq!(events(&p.parse_line(line, &mut media)).len(), 1);
    assert!(events(&p.parse_line(line, &mut media)).is_empty());
    let track = media.audio_tracks.get(1).unwrap();
    assert_eq!(track.name, "English");
    assert_eq!(track.lang, "eng");
  }

  #[test]
  fn test_external_subtitle_and_captions() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    p.parse_line("     Subs  --sid=3 'movie.srt' (subrip) (external)", &mut media);
    p.parse_line("     Subs  --sid=4 (eia_608)", &mut media);
    let ext = media.subtitles.get(3).unwrap();
    assert_eq!(ext.source, SubtitleSource::File);
    assert_eq!(ext.filename.as_deref(), Some("movie.srt"));
    assert!(!ext.selected);
    assert_eq!(media.subtitles.get(4).unwrap().source, SubtitleSource::ClosedCaption);
  }

  #[test]
  fn test_chapters_merge_out_of_order() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    let out = p.parse_line("INFO_CHAPTERS=3", &mut media);
    let queries = out.iter().filter(|o| matches!(o, Output::Command(_))).count();
    assert_eq!(queries, 6);

    feed(
      &mut p,
      &mut media,
      &[
        "INFO_CHAPTER_2_START=300.5",
        "INFO_CHAPTER_0_NAME=Opening",
        "INFO_CHAPTER_2_NAME=Finale",
        "INFO_CHAPTER_1_START=120.000000",
        "INFO_CHAPTER_0_START=0.000000",
        "INFO_CHAPTER_1_NAME=Middle",
      ],
    );
    assert_eq!(media.chapters.len(), 3);
    assert_eq!(media.chapters.get(1).unwrap().title, "Middle");
    assert_eq!(media.chapters.get(2).unwrap().start, Some(300.5));
  }

  #[test]
  fn test_out_of_range_indexes_are_ignored() {
    let mut p = parser();
    let mut media = MediaState::new("dvd://1");
    feed(
      &mut p,
      &mut media,
      &[
        "INFO_TITLE_2147483647_NAME=x",
        "INFO_DISC_TITLE=2147483647",
        "[dvdnav] title: 2147483647",
      ],
    );
    assert!(media.titles.is_empty());
    assert_eq!(media.titles.selected, None);

    let out = p.parse_line("INFO_TITLES=2147483647", &mut media);
    assert_eq!(media.titles.len(), MAX_TABLE_SIZE as usize);
    let queries = out.iter().filter(|o| matches!(o, Output::Command(_))).count();
    assert_eq!(queries, 2 * MAX_TABLE_SIZE as usize);

    p.parse_line("INFO_CHAPTERS=99999999", &mut media);
    assert_eq!(media.chapters.len(), MAX_TABLE_SIZE as usize);
    p.parse_line("INFO_CHAPTERS=-4", &mut media);
    assert!(media.chapters.is_empty());
  }

  #[test]
  fn test_pause_repeats_without_buffering_end() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    p.parse_line(PLAYING, &mut media);

    let paused = "STATUS: 5.0 / 100.0 P: yes B: no I: no";
    assert_eq!(events(&p.parse_line(paused, &mut media)), vec![PlayerEvent::ReceivedPause]);
    for _ in 0..5 {
      assert!(events(&p.parse_line(paused, &mut media)).is_empty());
      assert_eq!(p.activity(), Activity::Paused);
    }

    let half = "STATUS: 5.0 / 100.0 P: no B: no I: yes";
    let out = events(&p.parse_line(half, &mut media));
    assert!(!out.contains(&PlayerEvent::ReceivedBufferingEnded));

    let resumed = events(&p.parse_line("STATUS: 5.1 / 100.0 P: no B: no I: no", &mut media));
    assert!(resumed.contains(&PlayerEvent::ReceivedBufferingEnded));
    assert_eq!(p.activity(), Activity::Playing);
  }

  #[test]
  fn test_first_playing_tick_loads_media() {
    let mut p = parser();
    let mut media = MediaState::new("song.mp3");
    let early = feed(
      &mut p,
      &mut media,
      &["INFO_LENGTH=200.5", " (+) Audio --aid=1 (mp3 2ch 44100Hz)"],
    );
    assert!(events(&early).is_empty());

    let out = p.parse_line("STATUS: 0.1 / 200.5 P: no B: no I: no", &mut media);
    let evs = events(&out);
    assert!(evs.contains(&PlayerEvent::DurationChanged(200.5)));
    assert!(evs.contains(&PlayerEvent::TrackInfoChanged(TrackKind::Audio)));
    assert!(evs.contains(&PlayerEvent::PlayerFullyLoaded));
    assert!(media.no_video);
    assert!(out.contains(&Output::Signal(Signal::Playing)));
    assert!(out
      .iter()
      .any(|o| matches!(o, Output::Delayed(d, _) if *d == Duration::from_secs(12))));

    let again = events(&p.parse_line("STATUS: 0.2 / 200.5 P: no B: no I: no", &mut media));
    assert!(!again.contains(&PlayerEvent::PlayerFullyLoaded));
  }

  #[test]
  fn test_end_of_file_before_playing_forces_load() {
    let mut p = parser();
    let mut media = MediaState::new("dvd://1");
    p.parse_line("INFO_TITLES=4", &mut media);
    let out = p.parse_line("Exiting... (End of file)", &mut media);
    let loaded_at = out
      .iter()
      .position(|o| *o == Output::Event(PlayerEvent::PlayerFullyLoaded))
      .unwrap();
    let eof_at = out.iter().position(|o| *o == Output::Signal(Signal::EndOfFile)).unwrap();
    assert!(loaded_at < eof_at);
    assert!(events(&out).contains(&PlayerEvent::TitlesChanged));
    assert!(p.is_loaded());
  }

  #[test]
  fn test_frame_number_emulation() {
    let mut p = parser();
    let mut media = MediaState::new("movie.mkv");
    p.parse_line("INFO_VIDEO_FPS=25.000000", &mut media);
    let frames = |out: Vec<Output>| -> Vec<i64> {
      events(&out)
        .into_iter()
        .filter_map(|e| match e {
          PlayerEvent::ReceivedCurrentFrame(f) => Some(f),
          _ => None,
        })
        .collect()
    };
    assert_eq!(frames(p.parse_line("STATUS: 1.000 / 10 P: no B: no I: no", &mut media)), vec![25]);
    assert!(frames(p.parse_line("STATUS: 1.010 / 10 P: no B: no I: no", &mut media)).is_empty());
    assert_eq!(frames(p.parse_line("STATUS: 1.041 / 10 P: no B: no I: no", &mut media)), vec![26]);
  }

  #[test]
  fn test_misc_lines() {
    let mut p = parser();
    let mut media = MediaState::new("http://radio/stream");
    p.parse_line(PLAYING, &mut media);
    assert_eq!(
      events(&p.parse_line("icy-title: Artist - Song", &mut media)),
      vec![PlayerEvent::StreamTitleChanged("Artist - Song".into())]
    );
    assert_eq!(
      events(&p.parse_line("[ffmpeg] https: HTTP error 403 Forbidden", &mut media)),
      vec![PlayerEvent::ReceivedForbidden]
    );
    assert_eq!(
      events(&p.parse_line("Screenshot: 'mpv-shot0001.png'", &mut media)),
      vec![PlayerEvent::ScreenshotTaken("mpv-shot0001.png".into())]
    );
    assert!(p.parse_line("[cplayer] something unrelated", &mut media).is_empty());
  }

  #[test]
  fn test_metadata_and_unknown_properties() {
    let mut p = parser();
    let mut media = MediaState::new("song.flac");
    feed(
      &mut p,
      &mut media,
      &["METADATA_ARTIST=Someone", "INFO_OSD_MARGIN_X=25", "INFO_DEMUXER=flac"],
    );
    assert_eq!(media.clip.artist, "Someone");
    assert_eq!(media.properties.get("INFO_OSD_MARGIN_X").map(String::as_str), Some("25"));
    assert_eq!(media.demuxer, "flac");
  }

  #[test]
  fn test_every_template_key_has_a_grammar() {
    for entry in super::super::protocol::PLAYING_TEMPLATE {
      let key = entry.split('=').next().unwrap();
      let line = format!("{}=1", key);
      assert!(GRAMMARS.iter().any(|g| g.regex.is_match(&line)), "no grammar for {}", key);
    }
    assert!(STATUS.is_match("STATUS: 12.500000 / 3600.000000 P: no B: yes I: no"));
  }

  #[test]
  fn test_playlist_next_entry_resets() {
    let mut p = parser();
    let mut media = MediaState::new("a.mp3");
    p.parse_line("Playing: a.mp3", &mut media);
    p.parse_line(PLAYING, &mut media);
    p.parse_line(" (+) Audio --aid=1 (mp3)", &mut media);

    let out = p.parse_line("Playing: b.mp3", &mut media);
    assert!(out.contains(&Output::Signal(Signal::NewMedia)));
    assert_eq!(media.filename, "b.mp3");
    assert!(media.audio_tracks.is_empty());
    assert!(!p.is_loaded());
  }
}
