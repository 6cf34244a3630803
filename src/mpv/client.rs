//! `PlayerDriver`: runs one mpv process at a time and exposes the runtime
//! command set.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender, WeakReceiver};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::args::LaunchArgs;
use super::events::PlayerEvent;
use super::filters::{audio_filter, video_filter, Translation};
use super::lifecycle::ExitStatus;
use super::process::{resolve_mpv, spawn_mpv, ProcessError};
use super::protocol::{DiscNav, MpvCommand, OsdPositioner, SeekMode, VideoEq};
use super::session::{Action, Session};
use crate::config::PlayerConfig;
use crate::info::PlayerInfo;
use crate::media::MediaState;

#[derive(Error, Debug)]
pub enum DriverError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),
  #[error("Player is not running")]
  NotRunning,
  #[error("Player input closed")]
  InputClosed,
}

/// Writer channel message.
enum WriteMessage {
  Command(MpvCommand),
  Close,
}

enum Control {
  Kill,
}

/// Handles for the process currently running.
struct Run {
  write_tx: Sender<WriteMessage>,
  control_tx: Sender<Control>,
  task: JoinHandle<()>,
}

impl Run {
  fn is_running(&self) -> bool {
    !self.task.is_finished()
  }

  /// Kill the process and wait until its session has sent `ProcessFinished`.
  async fn kill(self) {
    let _ = self.control_tx.try_send(Control::Kill);
    if let Err(e) = self.task.await {
      log::error!("Player session task failed: {}", e);
    }
  }
}

/// Drives mpv over its terminal interface. Events arrive on `events()`;
/// `media()` can be read at any time and is complete once
/// `PlayerFullyLoaded` has been sent.
pub struct PlayerDriver {
  config: PlayerConfig,
  info: Option<Arc<PlayerInfo>>,
  media: Arc<RwLock<MediaState>>,
  event_tx: Sender<PlayerEvent>,
  /// Held until the first `events()` call so early events are kept.
  unclaimed_rx: Mutex<Option<Receiver<PlayerEvent>>>,
  event_rx: WeakReceiver<PlayerEvent>,
  run: Mutex<Option<Run>>,
  osd: Mutex<OsdPositioner>,
}

impl PlayerDriver {
  /// `info` enables capability checks for options and filters.
  pub fn new(config: PlayerConfig, info: Option<Arc<PlayerInfo>>) -> Self {
    let (event_tx, event_rx) = async_channel::unbounded();
    Self {
      config,
      info,
      media: Arc::new(RwLock::new(MediaState::default())),
      event_tx,
      event_rx: event_rx.downgrade(),
      unclaimed_rx: Mutex::new(Some(event_rx)),
      run: Mutex::new(None),
      osd: Mutex::new(OsdPositioner::new()),
    }
  }

  /// The event stream. All receivers share one queue and the driver keeps
  /// none for itself, so callers must drain it: position updates arrive
  /// several times a second. Once every receiver is dropped, events are
  /// discarded and later calls return a closed receiver.
  pub fn events(&self) -> Receiver<PlayerEvent> {
    if let Some(rx) = self.unclaimed_rx.lock().take() {
      return rx;
    }
    self
      .event_rx
      .upgrade()
      .unwrap_or_else(|| async_channel::unbounded().1)
  }

  pub fn media(&self) -> Arc<RwLock<MediaState>> {
    self.media.clone()
  }

  pub fn config(&self) -> &PlayerConfig {
    &self.config
  }

  pub fn is_running(&self) -> bool {
    self.run.lock().as_ref().is_some_and(Run::is_running)
  }

  /// Launch arguments for `target` under the current configuration.
  pub fn launch_args(&self, target: &str, is_playlist: bool) -> LaunchArgs {
    LaunchArgs::build(&self.config, self.info.clone(), target, is_playlist)
  }

  /// Play `target` with arguments derived from the configuration.
  pub async fn start(&self, target: &str, is_playlist: bool) -> Result<(), DriverError> {
    let args = self.launch_args(target, is_playlist);
    self.start_with(target, args).await
  }

  /// Play `target` with prepared arguments. A player that is still running is
  /// killed first, and its `ProcessFinished` is sent before the new
  /// `ProcessStarted`.
  pub async fn start_with(&self, target: &str, args: LaunchArgs) -> Result<(), DriverError> {
    let previous = self.run.lock().take();
    if let Some(previous) = previous {
      if previous.is_running() {
        log::warn!("Player already running, killing it before starting {}", target);
        previous.kill().await;
      }
    }

    let mut session = Session::with_media(self.config.timing.clone(), self.media.clone());
    session.start(target);
    self.media.write().start_sec_set = args.has_start();
    self.osd.lock().reset();

    let spawned = resolve_mpv(self.config.mpv_path()).and_then(|mpv| spawn_mpv(&mpv, &args.to_args()));
    let mut child = match spawned {
      Ok(child) => child,
      Err(e) => {
        log::error!("Could not start player: {}", e);
        let _ = self.event_tx.try_send(PlayerEvent::ProcessError(e.to_string()));
        return Err(e.into());
      }
    };

    let stdin = child.stdin.take().ok_or(ProcessError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;
    log::info!("Player started (pid: {:?})", child.id());

    let _ = self.event_tx.try_send(PlayerEvent::ProcessStarted);
    for name in args.unsupported_filters() {
      let _ = self.event_tx.try_send(PlayerEvent::FilterNotSupported(name.clone()));
    }

    let (write_tx, write_rx) = async_channel::unbounded();
    let (control_tx, control_rx) = async_channel::unbounded();
    tokio::spawn(writer_loop(stdin, write_rx));

    let io = SessionIo {
      write_tx: write_tx.clone(),
      event_tx: self.event_tx.clone(),
      cancel: CancellationToken::new(),
    };
    let task = tokio::spawn(session_loop(child, stdout, stderr, session, control_rx, io));

    *self.run.lock() = Some(Run {
      write_tx,
      control_tx,
      task,
    });
    Ok(())
  }

  /// Queue one command line for the player. Fire-and-forget.
  pub fn send(&self, command: MpvCommand) -> Result<(), DriverError> {
    let guard = self.run.lock();
    let run = guard
      .as_ref()
      .filter(|r| r.is_running())
      .ok_or(DriverError::NotRunning)?;
    log::debug!("-> {}", command);
    run
      .write_tx
      .try_send(WriteMessage::Command(command))
      .map_err(|_| DriverError::InputClosed)
  }

  fn send_all(&self, commands: Vec<MpvCommand>) -> Result<(), DriverError> {
    for command in commands {
      self.send(command)?;
    }
    Ok(())
  }

  pub fn set_pause(&self, paused: bool) -> Result<(), DriverError> {
    self.send(MpvCommand::set_pause(paused))
  }

  pub fn frame_step(&self) -> Result<(), DriverError> {
    self.send(MpvCommand::frame_step())
  }

  pub fn frame_back_step(&self) -> Result<(), DriverError> {
    self.send(MpvCommand::frame_back_step())
  }

  pub fn set_volume(&self, volume: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_volume(volume))
  }

  pub fn set_mute(&self, muted: bool) -> Result<(), DriverError> {
    self.send(MpvCommand::set_mute(muted))
  }

  pub fn set_speed(&self, speed: f64) -> Result<(), DriverError> {
    self.send(MpvCommand::set_speed(speed))
  }

  pub fn seek(&self, secs: f64, mode: SeekMode, exact: bool) -> Result<(), DriverError> {
    self.send(MpvCommand::seek(secs, mode, exact))
  }

  pub fn set_video_track(&self, id: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_video_track(id))
  }

  pub fn set_audio_track(&self, id: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_audio_track(id))
  }

  /// `None` disables subtitles.
  pub fn set_subtitle(&self, id: Option<i32>) -> Result<(), DriverError> {
    self.send(MpvCommand::set_subtitle(id))
  }

  pub fn set_secondary_subtitle(&self, id: Option<i32>) -> Result<(), DriverError> {
    self.send(MpvCommand::set_secondary_subtitle(id))
  }

  pub fn load_subtitle(&self, path: &str) -> Result<(), DriverError> {
    self.send(MpvCommand::load_subtitle(path))
  }

  pub fn load_audio_file(&self, path: &str) -> Result<(), DriverError> {
    self.send(MpvCommand::load_audio_file(path))
  }

  pub fn set_audio_delay(&self, secs: f64) -> Result<(), DriverError> {
    self.send(MpvCommand::set_audio_delay(secs))
  }

  pub fn set_sub_delay(&self, secs: f64) -> Result<(), DriverError> {
    self.send(MpvCommand::set_sub_delay(secs))
  }

  pub fn set_sub_scale(&self, scale: f64) -> Result<(), DriverError> {
    self.send(MpvCommand::set_sub_scale(scale))
  }

  pub fn set_sub_pos(&self, pos: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_sub_pos(pos))
  }

  pub fn sub_step(&self, step: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::sub_step(step))
  }

  pub fn screenshot(&self, include_subtitles: bool) -> Result<(), DriverError> {
    self.send(MpvCommand::screenshot(include_subtitles))
  }

  pub fn screenshot_each_frame(&self, include_subtitles: bool) -> Result<(), DriverError> {
    self.send(MpvCommand::screenshot_each_frame(include_subtitles))
  }

  /// `None` restores the stream's own aspect.
  pub fn set_aspect(&self, aspect: Option<f64>) -> Result<(), DriverError> {
    self.send(MpvCommand::set_aspect(aspect))
  }

  pub fn toggle_deinterlace(&self) -> Result<(), DriverError> {
    self.send(MpvCommand::toggle_deinterlace())
  }

  pub fn set_zoom(&self, zoom: f64) -> Result<(), DriverError> {
    self.send(MpvCommand::set_zoom(zoom))
  }

  pub fn set_pan(&self, x: f64, y: f64) -> Result<(), DriverError> {
    self.send_all(MpvCommand::set_pan(x, y))
  }

  pub fn set_video_eq(&self, property: VideoEq, value: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_video_eq(property, value))
  }

  pub fn set_loop(&self, times: Option<u32>) -> Result<(), DriverError> {
    self.send(MpvCommand::set_loop(times))
  }

  pub fn set_ab_loop(&self, a: Option<f64>, b: Option<f64>) -> Result<(), DriverError> {
    self.send_all(MpvCommand::set_ab_loop(a, b))
  }

  pub fn set_chapter(&self, id: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_chapter(id))
  }

  pub fn next_chapter(&self) -> Result<(), DriverError> {
    self.send(MpvCommand::next_chapter())
  }

  pub fn previous_chapter(&self) -> Result<(), DriverError> {
    self.send(MpvCommand::previous_chapter())
  }

  /// Switch disc title; `id` is one-based.
  pub fn set_title(&self, id: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_title(id))
  }

  pub fn disc_nav(&self, key: DiscNav) -> Result<(), DriverError> {
    self.send(MpvCommand::disc_nav(key))
  }

  pub fn set_osd_level(&self, level: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::set_osd_level(level))
  }

  pub fn show_osd_text(&self, text: &str, duration_ms: u32, level: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::show_osd_text(text, duration_ms, level))
  }

  /// Move OSD text to pixel offsets, writing only what changed.
  pub fn set_osd_pos(&self, x: i32, y: i32) -> Result<(), DriverError> {
    let commands = self.osd.lock().set_pos(x, y);
    self.send_all(commands)
  }

  /// Add or remove a video filter by logical name while playing.
  pub fn change_vf(&self, name: &str, enable: bool, option: &str) -> Result<(), DriverError> {
    let translation = video_filter(name, option);
    match self.filter_chain("vf", name, translation) {
      Some(chain) if enable => self.send(MpvCommand::vf_add(&chain)),
      Some(chain) => self.send(MpvCommand::vf_remove(&chain)),
      None => Ok(()),
    }
  }

  /// Add or remove an audio filter by logical name while playing.
  pub fn change_af(&self, name: &str, enable: bool, option: &str) -> Result<(), DriverError> {
    let translation = audio_filter(name, option);
    match self.filter_chain("af", name, translation) {
      Some(chain) if enable => self.send(MpvCommand::af_add(&chain)),
      Some(chain) => self.send(MpvCommand::af_remove(&chain)),
      None => Ok(()),
    }
  }

  fn filter_chain(&self, kind: &str, name: &str, translation: Translation) -> Option<String> {
    let base = translation.base_name().unwrap_or_default().to_string();
    match translation {
      Translation::Filter(chain) => {
        let available = self.info.as_ref().map_or(true, |info| match kind {
          "vf" => info.vf_list.is_empty() || info.has_vf(&base),
          _ => info.af_list.is_empty() || info.has_af(&base),
        });
        if available {
          Some(chain)
        } else {
          log::warn!("Filter '{}' ({}) not available in this player", name, base);
          let _ = self.event_tx.try_send(PlayerEvent::FilterNotSupported(name.to_string()));
          None
        }
      }
      Translation::Builtin => None,
      Translation::Unsupported => {
        log::warn!("Filter '{}' is not supported by mpv", name);
        let _ = self.event_tx.try_send(PlayerEvent::FilterNotSupported(name.to_string()));
        None
      }
      Translation::Unknown => {
        log::warn!("Unknown filter '{}' ignored", name);
        None
      }
    }
  }

  /// Ask the player to quit with `exit_code` and let it exit on its own.
  pub fn quit(&self, exit_code: i32) -> Result<(), DriverError> {
    self.send(MpvCommand::quit(exit_code))
  }

  /// Kill the process without asking.
  pub fn kill(&self) {
    if let Some(run) = self.run.lock().as_ref() {
      let _ = run.control_tx.try_send(Control::Kill);
    }
  }

  /// Quit gracefully, killing the process if it is still there after `timeout`.
  pub async fn stop(&self, timeout: Duration) {
    let Some(mut run) = self.run.lock().take() else {
      return;
    };
    if !run.is_running() {
      return;
    }

    log::info!("Stopping player");
    let _ = run.write_tx.try_send(WriteMessage::Command(MpvCommand::quit(0)));
    if tokio::time::timeout(timeout, &mut run.task).await.is_ok() {
      return;
    }

    log::warn!("Player did not quit within {:?}, killing it", timeout);
    run.kill().await;
  }
}

async fn writer_loop(mut stdin: ChildStdin, write_rx: Receiver<WriteMessage>) {
  while let Ok(msg) = write_rx.recv().await {
    match msg {
      WriteMessage::Command(command) => {
        let line = format!("{}\n", command);
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
          log::error!("Player input write error: {}", e);
          break;
        }
        if let Err(e) = stdin.flush().await {
          log::error!("Player input flush error: {}", e);
          break;
        }
      }
      WriteMessage::Close => break,
    }
  }
  log::debug!("Player input closed");
}

/// Where a session's actions go.
struct SessionIo {
  write_tx: Sender<WriteMessage>,
  event_tx: Sender<PlayerEvent>,
  cancel: CancellationToken,
}

impl SessionIo {
  fn apply(&self, actions: Vec<Action>) {
    for action in actions {
      match action {
        Action::Emit(event) => {
          let _ = self.event_tx.try_send(event);
        }
        Action::Send(command) => {
          let _ = self.write_tx.try_send(WriteMessage::Command(command));
        }
        Action::SendAfter(delay, command) => {
          let write_tx = self.write_tx.clone();
          let cancel = self.cancel.clone();
          tokio::spawn(async move {
            tokio::select! {
              _ = cancel.cancelled() => {}
              _ = tokio::time::sleep(delay) => {
                let _ = write_tx.send(WriteMessage::Command(command)).await;
              }
            }
          });
        }
      }
    }
  }

  /// Lines can carry several carriage-return separated status updates.
  fn feed(&self, session: &mut Session, line: &str) {
    for part in line.split('\r').filter(|p| !p.trim().is_empty()) {
      let actions = session.feed_line(part, Instant::now().into_std());
      self.apply(actions);
    }
  }
}

/// Time to wait for buffered output once the process has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

async fn session_loop(
  mut child: Child,
  stdout: tokio::process::ChildStdout,
  stderr: tokio::process::ChildStderr,
  mut session: Session,
  control_rx: Receiver<Control>,
  io: SessionIo,
) {
  let mut out_lines = BufReader::new(stdout).lines();
  let mut err_lines = BufReader::new(stderr).lines();
  let mut out_open = true;
  let mut err_open = true;

  let status = loop {
    let deadline = session.deadline().map(Instant::from_std);
    tokio::select! {
      line = out_lines.next_line(), if out_open => match line {
        Ok(Some(line)) => io.feed(&mut session, &line),
        Ok(None) => out_open = false,
        Err(e) => {
          log::warn!("Player stdout read error: {}", e);
          out_open = false;
        }
      },
      line = err_lines.next_line(), if err_open => match line {
        Ok(Some(line)) => io.feed(&mut session, &line),
        Ok(None) => err_open = false,
        Err(e) => {
          log::warn!("Player stderr read error: {}", e);
          err_open = false;
        }
      },
      _ = sleep_until(deadline), if deadline.is_some() => {
        let actions = session.on_timer(Instant::now().into_std());
        io.apply(actions);
      }
      Ok(Control::Kill) = control_rx.recv() => {
        log::info!("Killing player");
        session.killed();
        if let Err(e) = child.start_kill() {
          log::error!("kill() failed: {}", e);
        }
      }
      status = child.wait() => break status,
    }
  };

  // Output written just before exit may still be in the pipes.
  while out_open {
    match tokio::time::timeout(DRAIN_TIMEOUT, out_lines.next_line()).await {
      Ok(Ok(Some(line))) => io.feed(&mut session, &line),
      _ => out_open = false,
    }
  }
  while err_open {
    match tokio::time::timeout(DRAIN_TIMEOUT, err_lines.next_line()).await {
      Ok(Ok(Some(line))) => io.feed(&mut session, &line),
      _ => err_open = false,
    }
  }

  io.cancel.cancel();
  let _ = io.write_tx.try_send(WriteMessage::Close);

  let exit = match status {
    Ok(status) => {
      log::info!("Player exited with: {}", status);
      match status.code() {
        Some(code) => ExitStatus::Code(code),
        None => ExitStatus::Crashed,
      }
    }
    Err(e) => {
      log::error!("wait() failed: {}", e);
      ExitStatus::Crashed
    }
  };
  for event in session.on_exit(exit) {
    let _ = io.event_tx.try_send(event);
  }
}

async fn sleep_until(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}

impl Drop for PlayerDriver {
  fn drop(&mut self) {
    if let Some(run) = self.run.lock().take() {
      let _ = run.control_tx.try_send(Control::Kill);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::info::InfoItem;

  fn driver_with_info(vf: &[&str]) -> PlayerDriver {
    let info = PlayerInfo {
      vf_list: vf.iter().map(|n| InfoItem::new(n, "")).collect(),
      ..PlayerInfo::default()
    };
    PlayerDriver::new(PlayerConfig::default(), Some(Arc::new(info)))
  }

  #[test]
  fn test_send_requires_running_player() {
    let driver = PlayerDriver::new(PlayerConfig::default(), None);
    assert!(!driver.is_running());
    assert!(matches!(driver.set_pause(true), Err(DriverError::NotRunning)));
  }

  #[test]
  fn test_unsupported_filter_notice() {
    let driver = driver_with_info(&["vflip"]);
    let events = driver.events();

    assert!(driver.change_vf("tfields", true, "").is_ok());
    assert_eq!(events.try_recv().ok(), Some(PlayerEvent::FilterNotSupported("tfields".into())));

    // lavfi is not in the list, so blur is refused before anything is sent.
    assert!(driver.change_vf("blur", true, "").is_ok());
    assert_eq!(events.try_recv().ok(), Some(PlayerEvent::FilterNotSupported("blur".into())));

    // Available filters need a running player.
    assert!(matches!(driver.change_vf("flip", true, ""), Err(DriverError::NotRunning)));
  }

  #[test]
  fn test_events_close_when_every_receiver_is_dropped() {
    let driver = driver_with_info(&["vflip"]);
    driver.change_vf("tfields", true, "").unwrap();

    let events = driver.events();
    let shared = driver.events();
    assert_eq!(shared.try_recv().ok(), Some(PlayerEvent::FilterNotSupported("tfields".into())));
    assert!(events.is_empty());

    drop(events);
    drop(shared);
    driver.change_vf("tfields", true, "").unwrap();
    assert!(driver.events().is_closed());
  }

  #[tokio::test]
  async fn test_start_with_missing_binary_reports_error() {
    let config = PlayerConfig {
      mpv_path: Some("/nonexistent/mpv-binary".into()),
      ..PlayerConfig::default()
    };
    let driver = PlayerDriver::new(config, None);
    let events = driver.events();

    let result = driver.start("movie.mkv", false).await;
    assert!(matches!(result, Err(DriverError::Process(ProcessError::SpawnFailed(..)))));
    assert!(matches!(events.try_recv(), Ok(PlayerEvent::ProcessError(_))));
    assert!(!driver.is_running());
  }

  /// A shell script standing in for mpv; it ignores its arguments.
  #[cfg(unix)]
  fn scripted_player(dir: &std::path::Path, body: &str) -> PlayerConfig {
    use std::os::unix::fs::PermissionsExt;
    let script = dir.join("fake-mpv");
    std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    PlayerConfig {
      mpv_path: Some(script.to_string_lossy().into_owned()),
      ..PlayerConfig::default()
    }
  }

  async fn next_event(events: &Receiver<PlayerEvent>) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
      .await
      .unwrap()
      .unwrap()
  }

  fn queued(events: &Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_session_with_scripted_player() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_player(
      dir.path(),
      "echo 'INFO_VIDEO_WIDTH=640'\n\
       echo 'INFO_VIDEO_HEIGHT=480'\n\
       echo ' (+) Video --vid=1 (h264)'\n\
       echo 'STATUS: 0.5 / 10.0 P: no B: no I: no' >&2\n\
       echo 'Exiting... (End of file)'\n\
       exit 0\n",
    );
    let driver = PlayerDriver::new(config, None);
    let events = driver.events();
    driver.start("movie.mkv", false).await.unwrap();

    let mut seen = Vec::new();
    loop {
      let event = next_event(&events).await;
      let done = matches!(event, PlayerEvent::ProcessFinished { .. });
      seen.push(event);
      if done {
        break;
      }
    }

    assert_eq!(seen.first(), Some(&PlayerEvent::ProcessStarted));
    assert!(seen.contains(&PlayerEvent::PlayerFullyLoaded));
    assert!(seen.contains(&PlayerEvent::ReceivedEndOfFile));
    assert_eq!(
      seen.last(),
      Some(&PlayerEvent::ProcessFinished { exit_code: Some(0), end_of_file: true })
    );
    assert_eq!(driver.media().read().video.width, 640);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_stop_quits_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_player(
      dir.path(),
      "while read line; do\n  case \"$line\" in quit*) exit 0 ;; esac\ndone\nexit 3\n",
    );
    let driver = PlayerDriver::new(config, None);
    let events = driver.events();
    driver.start("movie.mkv", false).await.unwrap();
    assert_eq!(next_event(&events).await, PlayerEvent::ProcessStarted);

    driver.stop(Duration::from_secs(5)).await;
    assert!(!driver.is_running());
    assert_eq!(
      queued(&events),
      vec![PlayerEvent::ProcessFinished { exit_code: Some(0), end_of_file: false }]
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_stop_kills_unresponsive_player() {
    let dir = tempfile::tempdir().unwrap();
    let driver = PlayerDriver::new(scripted_player(dir.path(), "exec sleep 30\n"), None);
    let events = driver.events();
    driver.start("movie.mkv", false).await.unwrap();
    assert_eq!(next_event(&events).await, PlayerEvent::ProcessStarted);

    let started = std::time::Instant::now();
    driver.stop(Duration::from_millis(200)).await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!driver.is_running());
    assert_eq!(
      queued(&events),
      vec![PlayerEvent::ProcessFinished { exit_code: None, end_of_file: false }]
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_restart_finishes_previous_run_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_player(dir.path(), "echo 'INFO_VIDEO_WIDTH=640'\nexec sleep 30\n");
    let driver = PlayerDriver::new(config, None);
    let events = driver.events();

    driver.start("old.mkv", false).await.unwrap();
    assert_eq!(next_event(&events).await, PlayerEvent::ProcessStarted);
    tokio::time::sleep(Duration::from_millis(100)).await;

    driver.start("new.mkv", false).await.unwrap();
    assert_eq!(
      queued(&events),
      vec![
        PlayerEvent::ProcessFinished { exit_code: None, end_of_file: false },
        PlayerEvent::ProcessStarted,
      ]
    );
    assert!(driver.is_running());
    assert_eq!(driver.media().read().filename, "new.mkv");

    driver.stop(Duration::from_millis(200)).await;
    assert_eq!(
      queued(&events),
      vec![PlayerEvent::ProcessFinished { exit_code: None, end_of_file: false }]
    );
  }
}
