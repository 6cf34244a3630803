//! Disc titles (DVD, Blu-ray, VCD, audio CD tracks).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Title {
  pub id: i32,
  pub duration: Option<f64>,
  pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Titles {
  titles: BTreeMap<i32, Title>,
  /// Title the player says it is playing.
  pub selected: Option<i32>,
}

impl Titles {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.titles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.titles.is_empty()
  }

  pub fn get(&self, id: i32) -> Option<&Title> {
    self.titles.get(&id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Title> {
    self.titles.values()
  }

  pub fn clear(&mut self) {
    self.titles.clear();
    self.selected = None;
  }

  /// Titles are numbered `first..first + count`.
  pub fn set_count(&mut self, count: i32, first: i32) {
    let end = first.saturating_add(count.max(0));
    self.titles.retain(|id, _| *id >= first && *id < end);
    for id in first..end {
      self.titles.entry(id).or_insert_with(|| Title {
        id,
        ..Title::default()
      });
    }
  }

  pub fn set_duration(&mut self, id: i32, duration: f64) -> bool {
    let title = self.entry(id);
    if title.duration == Some(duration) {
      return false;
    }
    title.duration = Some(duration);
    true
  }

  pub fn set_name(&mut self, id: i32, name: &str) -> bool {
    let title = self.entry(id);
    if title.name.as_deref() == Some(name) {
      return false;
    }
    title.name = Some(name.to_string());
    true
  }

  fn entry(&mut self, id: i32) -> &mut Title {
    self.titles.entry(id).or_insert_with(|| Title {
      id,
      ..Title::default()
    })
  }
}
