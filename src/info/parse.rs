//! Parsers for the player's `help` listings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\s+([A-Za-z0-9_\-\.]+)(?:\s+(.*))?$").expect("list item regex should compile")
});

static CODEC_ITEM: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\s+([A-Za-z0-9_\-]+):([A-Za-z0-9_\-\.]+)\s+-\s+(.*)$")
    .expect("codec item regex should compile")
});

static OPTION_ITEM: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\s*--([A-Za-z0-9_\-\.]+)").expect("option regex should compile"));

static VERSION: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^mpv\s+v?(\S+)").expect("version regex should compile"));

/// One entry of a driver, codec, demuxer or filter listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoItem {
  pub name: String,
  pub desc: String,
}

impl InfoItem {
  pub fn new(name: &str, desc: &str) -> Self {
    Self {
      name: name.to_string(),
      desc: desc.trim().to_string(),
    }
  }
}

/// Indented `name  description` entries (video/audio outputs, demuxers, filters).
pub fn parse_list(output: &str) -> Vec<InfoItem> {
  let mut items: Vec<InfoItem> = Vec::new();
  for line in output.lines() {
    if let Some(caps) = LIST_ITEM.captures(line) {
      let name = &caps[1];
      if items.iter().any(|i| i.name == name) {
        continue;
      }
      let desc = caps.get(2).map_or("", |m| m.as_str());
      items.push(InfoItem::new(name, desc));
    }
  }
  items
}

/// `family:codec - description` entries from the decoder listings.
pub fn parse_codecs(output: &str) -> Vec<InfoItem> {
  output
    .lines()
    .filter_map(|line| CODEC_ITEM.captures(line))
    .map(|caps| InfoItem::new(&caps[2], &caps[3]))
    .collect()
}

/// Option names from `--list-options`, without the leading dashes.
pub fn parse_options(output: &str) -> Vec<String> {
  output
    .lines()
    .filter_map(|line| OPTION_ITEM.captures(line))
    .map(|caps| caps[1].to_string())
    .collect()
}

pub fn parse_version(output: &str) -> Option<String> {
  output
    .lines()
    .find_map(|line| VERSION.captures(line))
    .map(|caps| caps[1].to_string())
}
