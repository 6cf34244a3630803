//! Disc URLs of the form `<protocol>://[title][/device]`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DISC_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(dvd|dvdnav|vcd|cdda|br)://(\d*)(?:/(.*))?$").expect("disc url regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscType {
  Dvd,
  DvdNav,
  Vcd,
  AudioCd,
  BluRay,
}

impl DiscType {
  pub fn protocol(self) -> &'static str {
    match self {
      DiscType::Dvd => "dvd",
      DiscType::DvdNav => "dvdnav",
      DiscType::Vcd => "vcd",
      DiscType::AudioCd => "cdda",
      DiscType::BluRay => "br",
    }
  }

  fn from_protocol(protocol: &str) -> Option<Self> {
    match protocol {
      "dvd" => Some(DiscType::Dvd),
      "dvdnav" => Some(DiscType::DvdNav),
      "vcd" => Some(DiscType::Vcd),
      "cdda" => Some(DiscType::AudioCd),
      "br" => Some(DiscType::BluRay),
      _ => None,
    }
  }

  /// VCD and audio CD titles are plain tracks without menus.
  pub fn is_track_based(self) -> bool {
    matches!(self, DiscType::Vcd | DiscType::AudioCd)
  }
}

/// Parsed disc URL. Titles are 1-based; `None` means "whole disc" or "menu".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscName {
  pub disc_type: DiscType,
  pub title: Option<i32>,
  pub device: Option<String>,
}

impl DiscName {
  pub fn new(disc_type: DiscType, title: Option<i32>, device: Option<String>) -> Self {
    Self {
      disc_type,
      title,
      device,
    }
  }

  /// Split a disc URL. Returns `None` for anything that is not a disc URL.
  pub fn parse(url: &str) -> Option<Self> {
    let caps = DISC_URL.captures(url)?;
    let disc_type = DiscType::from_protocol(&caps[1])?;
    let title = caps[2].parse::<i32>().ok().filter(|t| *t > 0);
    let device = caps
      .get(3)
      .map(|m| m.as_str().to_string())
      .filter(|d| !d.is_empty());
    Some(Self::new(disc_type, title, device))
  }

  /// URL understood by mpv. mpv numbers disc titles from zero and has no
  /// separate dvdnav protocol.
  pub fn player_url(&self) -> String {
    let protocol = match self.disc_type {
      DiscType::Dvd | DiscType::DvdNav => "dvd",
      DiscType::BluRay => "bd",
      DiscType::Vcd => "vcd",
      DiscType::AudioCd => "cdda",
    };
    match self.title {
      Some(title) if !self.disc_type.is_track_based() => format!("{}://{}", protocol, title - 1),
      Some(title) => format!("{}://{}", protocol, title),
      None => format!("{}://", protocol),
    }
  }
}

impl fmt::Display for DiscName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}://", self.disc_type.protocol())?;
    if let Some(title) = self.title {
      write!(f, "{}", title)?;
    }
    if let Some(device) = &self.device {
      write!(f, "/{}", device)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_with_device() {
    let disc = DiscName::parse("dvd://2//dev/sr0").unwrap();
    assert_eq!(disc.disc_type, DiscType::Dvd);
    assert_eq!(disc.title, Some(2));
    assert_eq!(disc.device.as_deref(), Some("/dev/sr0"));
    assert_eq!(disc.to_string(), "dvd://2//dev/sr0");
  }

  #[test]
  fn test_parse_menu() {
    let disc = DiscName::parse("dvdnav://").unwrap();
    assert_eq!(disc.disc_type, DiscType::DvdNav);
    assert_eq!(disc.title, None);
    assert_eq!(disc.device, None);
  }

  #[test]
  fn test_not_a_disc() {
    assert!(DiscName::parse("/home/user/movie.mkv").is_none());
    assert!(DiscName::parse("http://example.com/a.mp4").is_none());
  }

  #[test]
  fn test_player_url_is_zero_based_for_dvd() {
    assert_eq!(DiscName::parse("dvd://3").unwrap().player_url(), "dvd://2");
    assert_eq!(DiscName::parse("br://1").unwrap().player_url(), "bd://0");
    assert_eq!(DiscName::parse("cdda://4").unwrap().player_url(), "cdda://4");
  }
}
