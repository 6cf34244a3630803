//! Chapter table, filled in two phases: a count first, then per-chapter details by ID.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chapter {
  pub id: i32,
  /// Start time in seconds, `None` until the player reports it.
  pub start: Option<f64>,
  pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chapters {
  chapters: BTreeMap<i32, Chapter>,
  /// Chapter the player reports as current, if any.
  pub current: Option<i32>,
}

impl Chapters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.chapters.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chapters.is_empty()
  }

  pub fn get(&self, id: i32) -> Option<&Chapter> {
    self.chapters.get(&id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
    self.chapters.values()
  }

  pub fn clear(&mut self) {
    self.chapters.clear();
    self.current = None;
  }

  /// Create placeholder entries `0..count`, dropping anything beyond.
  pub fn set_count(&mut self, count: i32) {
    self.chapters.retain(|id, _| *id < count);
    for id in 0..count.max(0) {
      self.chapters.entry(id).or_insert_with(|| Chapter {
        id,
        ..Chapter::default()
      });
    }
  }

  /// Merge a title by chapter ID. Returns `true` on change.
  pub fn set_title(&mut self, id: i32, title: &str) -> bool {
    let chapter = self.entry(id);
    if chapter.title == title {
      return false;
    }
    chapter.title = title.to_string();
    true
  }

  /// Merge a start time by chapter ID. Returns `true` on change.
  pub fn set_start(&mut self, id: i32, start: f64) -> bool {
    let chapter = self.entry(id);
    if chapter.start == Some(start) {
      return false;
    }
    chapter.start = Some(start);
    true
  }

  /// Chapter containing `position`, by start time.
  pub fn at(&self, position: f64) -> Option<&Chapter> {
    self
      .chapters
      .values()
      .filter(|c| c.start.is_some_and(|s| s <= position))
      .last()
  }

  fn entry(&mut self, id: i32) -> &mut Chapter {
    self.chapters.entry(id).or_insert_with(|| Chapter {
      id,
      ..Chapter::default()
    })
  }
}
