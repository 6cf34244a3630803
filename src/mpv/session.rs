//! One playback session: the output parser and the lifecycle controller
//! sharing a `MediaState`. Synchronous and clock-free so it can be driven
//! line by line in tests; the driver turns its actions into I/O.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::events::PlayerEvent;
use super::lifecycle::{ExitStatus, Lifecycle, ProcessState};
use super::parser::{Output, OutputParser};
use super::protocol::MpvCommand;
use crate::config::TimingConfig;
use crate::media::MediaState;

/// Something the driver must do on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  Emit(PlayerEvent),
  Send(MpvCommand),
  SendAfter(Duration, MpvCommand),
}

pub struct Session {
  media: Arc<RwLock<MediaState>>,
  parser: OutputParser,
  lifecycle: Lifecycle,
}

impl Session {
  pub fn new(timing: TimingConfig) -> Self {
    Self::with_media(timing, Arc::new(RwLock::new(MediaState::default())))
  }

  /// Session writing into an existing shared state.
  pub fn with_media(timing: TimingConfig, media: Arc<RwLock<MediaState>>) -> Self {
    Self {
      media,
      parser: OutputParser::new(timing.bitrate_request_delay()),
      lifecycle: Lifecycle::new(timing),
    }
  }

  /// Shared handle to the media state. Readers must not hold it across awaits.
  pub fn media(&self) -> Arc<RwLock<MediaState>> {
    self.media.clone()
  }

  /// Reset everything for a new run on `target`.
  pub fn start(&mut self, target: &str) {
    *self.media.write() = MediaState::new(target);
    self.parser.reset();
    self.lifecycle.reset();
    self.lifecycle.started();
  }

  pub fn state(&self) -> ProcessState {
    self.lifecycle.state()
  }

  pub fn is_loaded(&self) -> bool {
    self.parser.is_loaded()
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.lifecycle.deadline()
  }

  pub fn feed_line(&mut self, line: &str, now: Instant) -> Vec<Action> {
    let mut media = self.media.write();
    let mut actions = Vec::new();
    for output in self.parser.parse_line(line, &mut media) {
      match output {
        Output::Event(event) => actions.push(Action::Emit(event)),
        Output::Command(command) => actions.push(Action::Send(command)),
        Output::Delayed(delay, command) => actions.push(Action::SendAfter(delay, command)),
        Output::Signal(signal) => actions.extend(self.lifecycle.handle(signal, &mut media, now)),
      }
    }
    actions
  }

  pub fn on_timer(&mut self, now: Instant) -> Vec<Action> {
    self.lifecycle.on_timer(now)
  }

  /// Mark the coming exit as one we caused.
  pub fn killed(&mut self) {
    self.lifecycle.killed();
  }

  pub fn on_exit(&mut self, status: ExitStatus) -> Vec<PlayerEvent> {
    self.lifecycle.on_exit(status)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn emitted(actions: &[Action]) -> Vec<PlayerEvent> {
    actions
      .iter()
      .filter_map(|a| match a {
        Action::Emit(e) => Some(e.clone()),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn test_end_of_file_before_playing() {
    let mut session = Session::new(TimingConfig::default());
    session.start("dvd://2");
    let now = Instant::now();

    session.feed_line("INFO_DISC_TITLE=1", now);
    let actions = session.feed_line("Exiting... (End of file)", now);
    let events = emitted(&actions);
    assert!(events.contains(&PlayerEvent::PlayerFullyLoaded));
    assert!(events.contains(&PlayerEvent::TitleChanged(2)));
    assert!(!events.contains(&PlayerEvent::ReceivedEndOfFile));

    let exit = session.on_exit(ExitStatus::Code(0));
    assert_eq!(
      exit,
      vec![
        PlayerEvent::ReceivedEndOfFile,
        PlayerEvent::ProcessFinished { exit_code: Some(0), end_of_file: true },
      ]
    );
    assert_eq!(session.state(), ProcessState::Finished);
  }

  #[test]
  fn test_start_resets_previous_run() {
    let mut session = Session::new(TimingConfig::default());
    session.start("a.mkv");
    let now = Instant::now();
    session.feed_line("INFO_VIDEO_WIDTH=640", now);
    session.feed_line("STATUS: 1.0 / 10.0 P: no B: no I: no", now);
    session.feed_line("ID_EXIT=EOF", now);
    session.on_exit(ExitStatus::Code(0));

    session.start("b.mkv");
    assert!(!session.is_loaded());
    assert_eq!(session.state(), ProcessState::Running);
    let media = session.media();
    let media = media.read();
    assert_eq!(media.filename, "b.mkv");
    assert_eq!(media.video.width, 0);
    drop(media);

    let exit = session.on_exit(ExitStatus::Code(0));
    assert_eq!(exit, vec![PlayerEvent::ProcessFinished { exit_code: Some(0), end_of_file: false }]);
  }

  #[test]
  fn test_bitrate_query_is_delayed() {
    let mut session = Session::new(TimingConfig::default());
    session.start("movie.mkv");
    let actions = session.feed_line("STATUS: 0.0 / 10.0 P: no B: no I: no", Instant::now());
    let delayed: Vec<_> = actions
      .iter()
      .filter_map(|a| match a {
        Action::SendAfter(delay, command) => Some((*delay, command.as_str().to_string())),
        _ => None,
      })
      .collect();
    assert_eq!(delayed.len(), 2);
    assert!(delayed.iter().all(|(d, _)| *d == Duration::from_secs(12)));
    assert!(delayed[0].1.contains("INFO_VIDEO_BITRATE"));
  }
}
