//! Notifications emitted by the player driver.

use crate::media::TrackKind;

/// Something the player reported, or a change in the process itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
  /// The subprocess is running.
  ProcessStarted,
  /// First real playback tick; `MediaState` is now complete enough to show.
  PlayerFullyLoaded,
  /// A new item started in playlist mode.
  NewMediaStarted(String),
  DurationChanged(f64),
  ReceivedCurrentSec(f64),
  /// Emulated from position and frame rate.
  ReceivedCurrentFrame(i64),
  ReceivedPause,
  ReceivedBuffering,
  ReceivedBufferingEnded,
  TrackInfoChanged(TrackKind),
  ChaptersChanged,
  TitlesChanged,
  /// The disc title now on screen.
  TitleChanged(i32),
  VideoBitrateChanged(i32),
  AudioBitrateChanged(i32),
  /// Live stream (icy) title.
  StreamTitleChanged(String),
  MetadataChanged,
  ScreenshotTaken(String),
  FilterNotSupported(String),
  /// HTTP 403 from the stream source.
  ReceivedForbidden,
  /// Player diagnostics worth showing, e.g. a file that cannot be opened.
  Message(String),
  /// Playback reached the end of the media. Delivered after the process exits.
  ReceivedEndOfFile,
  /// The process exited with a code other than 0 or 255 and without reaching end of file.
  FinishedWithError(i32),
  /// The process exited; always sent last.
  ProcessFinished { exit_code: Option<i32>, end_of_file: bool },
  /// OS-level failure: the process could not be started or crashed.
  ProcessError(String),
}
