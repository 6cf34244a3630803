//! Video, audio and subtitle track tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which table a track belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
  Video,
  Audio,
  Subtitle,
}

impl TrackKind {
  /// Property name the player uses to select a track of this kind.
  pub fn property(self) -> &'static str {
    match self {
      TrackKind::Video => "vid",
      TrackKind::Audio => "aid",
      TrackKind::Subtitle => "sid",
    }
  }
}

/// Where a subtitle track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubtitleSource {
  #[default]
  Embedded,
  File,
  ClosedCaption,
}

/// A single selectable stream. IDs are assigned by the player and need not be contiguous.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
  pub id: i32,
  pub name: String,
  pub lang: String,
  pub selected: bool,
  /// Only meaningful for subtitles.
  pub source: SubtitleSource,
  /// Source file for external subtitles.
  pub filename: Option<String>,
}

impl Track {
  /// Label shown to users: name, language, or the codec in parentheses as a last resort.
  pub fn display_name(name: &str, lang: &str, codec: &str) -> String {
    match (name.is_empty(), lang.is_empty(), codec.is_empty()) {
      (false, _, _) => name.to_string(),
      (true, false, _) => lang.to_string(),
      (true, true, false) => format!("({})", codec),
      (true, true, true) => String::new(),
    }
  }
}

/// Track table for one kind. Holds at most one selected track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackList {
  tracks: BTreeMap<i32, Track>,
}

impl TrackList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.tracks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tracks.is_empty()
  }

  pub fn get(&self, id: i32) -> Option<&Track> {
    self.tracks.get(&id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Track> {
    self.tracks.values()
  }

  pub fn selected(&self) -> Option<&Track> {
    self.tracks.values().find(|t| t.selected)
  }

  pub fn selected_id(&self) -> Option<i32> {
    self.selected().map(|t| t.id)
  }

  pub fn clear(&mut self) {
    self.tracks.clear();
  }

  /// Insert or update a track. Returns `true` only when something observable changed,
  /// so repeated reports of the same track list stay silent.
  pub fn update(&mut self, id: i32, name: &str, lang: &str, selected: bool) -> bool {
    if let Some(track) = self.tracks.get(&id) {
      if track.name == name && track.lang == lang && track.selected == selected {
        return false;
      }
    }

    if selected {
      for track in self.tracks.values_mut() {
        track.selected = false;
      }
    }

    let track = self.tracks.entry(id).or_insert_with(|| Track {
      id,
      ..Track::default()
    });
    track.name = name.to_string();
    track.lang = lang.to_string();
    track.selected = selected;
    true
  }

  /// Tag a subtitle track with its origin. Returns `true` on change.
  pub fn set_source(&mut self, id: i32, source: SubtitleSource, filename: Option<String>) -> bool {
    match self.tracks.get_mut(&id) {
      Some(track) if track.source != source || track.filename != filename => {
        track.source = source;
        track.filename = filename;
        true
      }
      _ => false,
    }
  }

  /// Mark `id` as the selected track (or none). Returns `true` on change.
  pub fn select(&mut self, id: Option<i32>) -> bool {
    if self.selected_id() == id {
      return false;
    }
    for track in self.tracks.values_mut() {
      track.selected = Some(track.id) == id;
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display_name_falls_back_to_codec() {
    assert_eq!(Track::display_name("", "", "h264"), "(h264)");
    assert_eq!(Track::display_name("", "eng", "ac3"), "eng");
    assert_eq!(Track::display_name("Commentary", "eng", "ac3"), "Commentary");
  }

  #[test]
  fn test_unchanged_update_is_noop() {
    let mut list = TrackList::new();
    assert!(list.update(1, "English", "eng", true));
    assert!(!list.update(1, "English", "eng", true));
    assert!(list.update(1, "English", "en", true));
  }

  #[test]
  fn test_new_selection_clears_previous() {
    let mut list = TrackList::new();
    list.update(1, "(h264)", "", true);
    list.update(2, "(hevc)", "", true);
    assert!(!list.get(1).unwrap().selected);
    assert_eq!(list.selected_id(), Some(2));
  }

  #[test]
  fn test_select_none() {
    let mut list = TrackList::new();
    list.update(3, "a", "", true);
    assert!(list.select(None));
    assert!(list.selected().is_none());
    assert!(!list.select(None));
  }
}
