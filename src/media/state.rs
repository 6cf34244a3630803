//! Per-session media state, mutated only by the output parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::chapters::Chapters;
use super::disc::DiscName;
use super::titles::Titles;
use super::tracks::{TrackKind, TrackList};

/// Clip metadata reported by the container or stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
  pub title: String,
  pub artist: String,
  pub album: String,
  pub genre: String,
  pub date: String,
  pub track: String,
  pub copyright: String,
  pub comment: String,
  pub software: String,
  /// Current `icy-title` of a live stream.
  pub stream_title: String,
}

impl ClipInfo {
  /// Store a metadata field by its player key. Returns `false` for unknown keys.
  pub fn set(&mut self, key: &str, value: &str) -> bool {
    let field = match key {
      "TITLE" => &mut self.title,
      "ARTIST" => &mut self.artist,
      "ALBUM" => &mut self.album,
      "GENRE" => &mut self.genre,
      "DATE" => &mut self.date,
      "TRACK" => &mut self.track,
      "COPYRIGHT" => &mut self.copyright,
      "COMMENT" => &mut self.comment,
      "SOFTWARE" => &mut self.software,
      _ => return false,
    };
    *field = value.to_string();
    true
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
  pub width: i32,
  pub height: i32,
  pub aspect: f64,
  pub fps: f64,
  pub format: String,
  pub codec: String,
  pub bitrate: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
  pub format: String,
  pub codec: String,
  pub rate: i32,
  pub channels: i32,
  pub bitrate: i32,
}

/// Everything known about the media being played in the current session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaState {
  pub filename: String,
  pub stream_path: String,
  pub media_title: String,
  /// Seconds; 0 when unknown.
  pub duration: f64,
  pub position: f64,
  pub demuxer: String,
  pub video: VideoInfo,
  pub audio: AudioInfo,
  pub clip: ClipInfo,
  pub video_tracks: TrackList,
  pub audio_tracks: TrackList,
  pub subtitles: TrackList,
  pub chapters: Chapters,
  pub titles: Titles,
  pub disc: Option<DiscName>,
  pub no_video: bool,
  pub start_sec_set: bool,
  /// `INFO_` keys without a dedicated field, such as the OSD margins.
  pub properties: BTreeMap<String, String>,
}

impl MediaState {
  /// Fresh state for a new session on `filename`.
  pub fn new(filename: &str) -> Self {
    Self {
      filename: filename.to_string(),
      disc: DiscName::parse(filename),
      ..Self::default()
    }
  }

  pub fn tracks(&self, kind: TrackKind) -> &TrackList {
    match kind {
      TrackKind::Video => &self.video_tracks,
      TrackKind::Audio => &self.audio_tracks,
      TrackKind::Subtitle => &self.subtitles,
    }
  }

  pub fn tracks_mut(&mut self, kind: TrackKind) -> &mut TrackList {
    match kind {
      TrackKind::Video => &mut self.video_tracks,
      TrackKind::Audio => &mut self.audio_tracks,
      TrackKind::Subtitle => &mut self.subtitles,
    }
  }

  pub fn is_disc(&self) -> bool {
    self.disc.is_some()
  }

  pub fn has_video_dimensions(&self) -> bool {
    self.video.width > 0 && self.video.height > 0
  }

  /// Best effort title for display.
  pub fn display_name(&self) -> &str {
    if !self.clip.stream_title.is_empty() {
      &self.clip.stream_title
    } else if !self.clip.title.is_empty() {
      &self.clip.title
    } else if !self.media_title.is_empty() {
      &self.media_title
    } else {
      &self.filename
    }
  }
}
