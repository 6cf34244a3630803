//! Process lifecycle: disc title tracking, the stuck-at-end-of-title watchdog
//! and classification of how the process ended.

use std::time::{Duration, Instant};

use super::events::PlayerEvent;
use super::parser::Signal;
use super::protocol::MpvCommand;
use super::session::Action;
use crate::config::TimingConfig;
use crate::media::MediaState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
  NotStarted,
  Running,
  Finished,
  Killed,
}

/// How the subprocess went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
  /// Exited on its own with this code.
  Code(i32),
  /// Terminated by a signal, or the status could not be read.
  Crashed,
  /// We killed it.
  Killed,
}

/// A title switch the player announced before the old title finished on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingSwitch {
  title: i32,
  switch_time: f64,
  reported_at: f64,
}

#[derive(Debug)]
pub struct Lifecycle {
  timing: TimingConfig,
  state: ProcessState,
  end_of_file: bool,
  title_not_found: bool,
  pending_switch: Option<PendingSwitch>,
  quit_deadline: Option<Instant>,
  last_position: Option<f64>,
}

impl Lifecycle {
  pub fn new(timing: TimingConfig) -> Self {
    Self {
      timing,
      state: ProcessState::NotStarted,
      end_of_file: false,
      title_not_found: false,
      pending_switch: None,
      quit_deadline: None,
      last_position: None,
    }
  }

  pub fn state(&self) -> ProcessState {
    self.state
  }

  pub fn end_of_file(&self) -> bool {
    self.end_of_file
  }

  /// When the watchdog wants `on_timer` called, if armed.
  pub fn deadline(&self) -> Option<Instant> {
    self.quit_deadline
  }

  /// Clear everything from the previous run.
  pub fn reset(&mut self) {
    self.state = ProcessState::NotStarted;
    self.end_of_file = false;
    self.reset_media();
  }

  fn reset_media(&mut self) {
    self.title_not_found = false;
    self.pending_switch = None;
    self.quit_deadline = None;
    self.last_position = None;
  }

  pub fn started(&mut self) {
    self.state = ProcessState::Running;
  }

  pub fn killed(&mut self) {
    self.state = ProcessState::Killed;
  }

  pub fn handle(&mut self, signal: Signal, media: &mut MediaState, now: Instant) -> Vec<Action> {
    match signal {
      Signal::Playing => self.fix_title(media),
      Signal::Position(position) => self.on_position(position, media, now),
      Signal::Stalled => {
        self.quit_deadline = None;
        Vec::new()
      }
      Signal::EndOfFile => {
        self.end_of_file = true;
        self.quit_deadline = None;
        Vec::new()
      }
      Signal::TitleSwitched(title) => self.on_title_switched(title, media),
      Signal::TitleNotFound => {
        log::info!("Player could not find the requested title");
        self.title_not_found = true;
        Vec::new()
      }
      Signal::NewMedia => {
        self.reset_media();
        Vec::new()
      }
    }
  }

  /// On the first playing tick of a disc, settle which title is really playing.
  fn fix_title(&mut self, media: &mut MediaState) -> Vec<Action> {
    let Some(disc) = media.disc.clone() else {
      return Vec::new();
    };

    // Asking for a title past the last one makes the player fall back to
    // another title. Treat it as the end of the disc instead.
    if self.title_not_found && media.titles.len() > 1 {
      log::info!("Title {:?} not found on {}, ending playback", disc.title, disc);
      self.end_of_file = true;
      return vec![Action::Send(MpvCommand::quit(0))];
    }

    let title = match media.titles.selected {
      Some(title) => {
        if disc.title.is_some_and(|requested| requested != title) {
          log::debug!("Requested title {:?}, player is on {}", disc.title, title);
        }
        title
      }
      None => match disc.title {
        Some(title) => {
          media.titles.selected = Some(title);
          title
        }
        None => return Vec::new(),
      },
    };
    vec![Action::Emit(PlayerEvent::TitleChanged(title))]
  }

  fn on_title_switched(&mut self, title: i32, media: &mut MediaState) -> Vec<Action> {
    let position = media.position;
    // The old title is over unless its duration is still ahead of us.
    if media.duration <= position {
      media.titles.selected = Some(title);
      return vec![Action::Emit(PlayerEvent::TitleChanged(title))];
    }
    log::debug!("Title {} announced at {:.2}, expected at {:.2}", title, position, media.duration);
    self.pending_switch = Some(PendingSwitch {
      title,
      switch_time: media.duration,
      reported_at: position,
    });
    Vec::new()
  }

  fn on_position(&mut self, position: f64, media: &mut MediaState, now: Instant) -> Vec<Action> {
    let mut actions = Vec::new();

    if let Some(pending) = self.pending_switch {
      let tolerance = self.timing.title_switch_tolerance().as_secs_f64();
      if position >= pending.switch_time || position + tolerance < pending.reported_at {
        self.pending_switch = None;
        media.titles.selected = Some(pending.title);
        actions.push(Action::Emit(PlayerEvent::TitleChanged(pending.title)));
      }
    }

    let watched = media.disc.as_ref().is_some_and(|d| !d.disc_type.is_track_based());
    if watched && media.duration > 0.0 && !self.end_of_file {
      let remaining = (media.duration - position).max(0.0);
      if remaining > self.timing.end_of_title_window().as_secs_f64() {
        self.quit_deadline = None;
      } else if self.last_position != Some(position) {
        let wait = Duration::from_secs_f64(remaining) + self.timing.end_of_title_margin();
        self.quit_deadline = Some(now + wait);
      }
    }
    self.last_position = Some(position);

    actions
  }

  /// Called when the deadline passes. The player sat at the end of a title
  /// without moving on, so quit on its behalf.
  pub fn on_timer(&mut self, now: Instant) -> Vec<Action> {
    match self.quit_deadline {
      Some(deadline) if now >= deadline => {
        log::warn!("Player stuck at end of title, forcing quit");
        self.quit_deadline = None;
        self.end_of_file = true;
        vec![Action::Send(MpvCommand::quit(0))]
      }
      _ => Vec::new(),
    }
  }

  /// Events for a finished process. `ProcessFinished` is always last.
  pub fn on_exit(&mut self, status: ExitStatus) -> Vec<PlayerEvent> {
    let killed = self.state == ProcessState::Killed || status == ExitStatus::Killed;
    self.state = if killed { ProcessState::Killed } else { ProcessState::Finished };
    self.quit_deadline = None;

    let exit_code = match status {
      ExitStatus::Code(code) => Some(code),
      _ => None,
    };

    let mut events = Vec::new();
    if self.end_of_file {
      events.push(PlayerEvent::ReceivedEndOfFile);
    } else if !killed {
      match status {
        ExitStatus::Code(0) | ExitStatus::Code(255) => {}
        ExitStatus::Code(code) => events.push(PlayerEvent::FinishedWithError(code)),
        ExitStatus::Crashed => events.push(PlayerEvent::ProcessError("player crashed".into())),
        ExitStatus::Killed => {}
      }
    }
    events.push(PlayerEvent::ProcessFinished {
      exit_code,
      end_of_file: self.end_of_file,
    });
    events
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lifecycle() -> Lifecycle {
    let mut lc = Lifecycle::new(TimingConfig::default());
    lc.started();
    lc
  }

  fn disc_media(url: &str, duration: f64) -> MediaState {
    let mut media = MediaState::new(url);
    media.duration = duration;
    media
  }

  #[test]
  fn test_fix_title_uses_player_report() {
    let mut lc = lifecycle();
    let mut media = disc_media("dvd://3", 600.0);
    media.titles.set_count(5, 1);
    media.titles.selected = Some(2);
    let actions = lc.handle(Signal::Playing, &mut media, Instant::now());
    assert_eq!(actions, vec![Action::Emit(PlayerEvent::TitleChanged(2))]);
  }

  #[test]
  fn test_fix_title_falls_back_to_requested() {
    let mut lc = lifecycle();
    let mut media = disc_media("dvd://3", 600.0);
    let actions = lc.handle(Signal::Playing, &mut media, Instant::now());
    assert_eq!(actions, vec![Action::Emit(PlayerEvent::TitleChanged(3))]);
    assert_eq!(media.titles.selected, Some(3));

    let mut file = MediaState::new("movie.mkv");
    assert!(lc.handle(Signal::Playing, &mut file, Instant::now()).is_empty());
  }

  #[test]
  fn test_title_not_found_ends_playback() {
    let mut lc = lifecycle();
    let mut media = disc_media("dvd://9", 600.0);
    media.titles.set_count(4, 1);
    lc.handle(Signal::TitleNotFound, &mut media, Instant::now());
    let actions = lc.handle(Signal::Playing, &mut media, Instant::now());
    assert_eq!(actions, vec![Action::Send(MpvCommand::quit(0))]);
    assert!(lc.end_of_file());

    let events = lc.on_exit(ExitStatus::Code(0));
    assert_eq!(events[0], PlayerEvent::ReceivedEndOfFile);
  }

  #[test]
  fn test_deferred_title_switch_waits_for_end_of_title() {
    let mut lc = lifecycle();
    let now = Instant::now();
    let mut media = disc_media("dvdnav://1", 100.0);
    media.position = 97.0;
    assert!(lc.handle(Signal::TitleSwitched(2), &mut media, now).is_empty());

    assert!(lc.handle(Signal::Position(98.0), &mut media, now).is_empty());
    let actions = lc.handle(Signal::Position(100.0), &mut media, now);
    assert!(actions.contains(&Action::Emit(PlayerEvent::TitleChanged(2))));
    assert_eq!(media.titles.selected, Some(2));
  }

  #[test]
  fn test_deferred_title_switch_on_position_drop() {
    let mut lc = lifecycle();
    let now = Instant::now();
    let mut media = disc_media("dvdnav://1", 100.0);
    media.position = 97.0;
    lc.handle(Signal::TitleSwitched(2), &mut media, now);
    let actions = lc.handle(Signal::Position(0.5), &mut media, now);
    assert!(actions.contains(&Action::Emit(PlayerEvent::TitleChanged(2))));
  }

  #[test]
  fn test_title_switch_at_end_applies_at_once() {
    let mut lc = lifecycle();
    let now = Instant::now();
    let mut media = disc_media("dvdnav://1", 100.0);
    media.position = 100.0;
    let actions = lc.handle(Signal::TitleSwitched(2), &mut media, now);
    assert_eq!(actions, vec![Action::Emit(PlayerEvent::TitleChanged(2))]);
    assert_eq!(media.titles.selected, Some(2));

    // Unknown duration behaves the same way.
    let mut live = disc_media("dvdnav://1", 0.0);
    live.position = 12.0;
    let actions = lc.handle(Signal::TitleSwitched(3), &mut live, now);
    assert_eq!(actions, vec![Action::Emit(PlayerEvent::TitleChanged(3))]);
  }

  #[test]
  fn test_watchdog_arms_near_end_and_fires() {
    let mut lc = lifecycle();
    let start = Instant::now();
    let mut media = disc_media("dvd://1", 100.0);

    lc.handle(Signal::Position(50.0), &mut media, start);
    assert_eq!(lc.deadline(), None);

    lc.handle(Signal::Position(98.0), &mut media, start);
    let deadline = lc.deadline().unwrap();
    assert_eq!(deadline, start + Duration::from_millis(2400));

    // Same position again does not push the deadline out.
    lc.handle(Signal::Position(98.0), &mut media, start + Duration::from_secs(1));
    assert_eq!(lc.deadline(), Some(deadline));

    assert!(lc.on_timer(start + Duration::from_secs(2)).is_empty());
    let actions = lc.on_timer(start + Duration::from_secs(3));
    assert_eq!(actions, vec![Action::Send(MpvCommand::quit(0))]);
    assert!(lc.end_of_file());
    assert_eq!(lc.deadline(), None);
  }

  #[test]
  fn test_watchdog_cleared_by_pause_and_skips_cds() {
    let mut lc = lifecycle();
    let now = Instant::now();
    let mut media = disc_media("bd://1", 100.0);
    lc.handle(Signal::Position(99.0), &mut media, now);
    assert!(lc.deadline().is_some());
    lc.handle(Signal::Stalled, &mut media, now);
    assert_eq!(lc.deadline(), None);

    let mut cd = disc_media("cdda://2", 100.0);
    let mut lc = lifecycle();
    lc.handle(Signal::Position(99.0), &mut cd, now);
    assert_eq!(lc.deadline(), None);
  }

  #[test]
  fn test_exit_classification() {
    let mut lc = lifecycle();
    assert_eq!(
      lc.on_exit(ExitStatus::Code(2)),
      vec![
        PlayerEvent::FinishedWithError(2),
        PlayerEvent::ProcessFinished { exit_code: Some(2), end_of_file: false },
      ]
    );

    let mut lc = lifecycle();
    assert_eq!(lc.on_exit(ExitStatus::Code(255)).len(), 1);

    let mut lc = lifecycle();
    let events = lc.on_exit(ExitStatus::Crashed);
    assert!(matches!(events[0], PlayerEvent::ProcessError(_)));

    let mut lc = lifecycle();
    lc.killed();
    assert_eq!(
      lc.on_exit(ExitStatus::Crashed),
      vec![PlayerEvent::ProcessFinished { exit_code: None, end_of_file: false }]
    );
    assert_eq!(lc.state(), ProcessState::Killed);
  }
}
