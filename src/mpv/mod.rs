//! mpv driver: launches the player, feeds it commands over stdin and turns
//! its terminal output back into media state.
//!
//! - `args.rs` - launch argument vector (fixed options, options, filters, media)
//! - `filters.rs` - logical filter names to mpv filter chains
//! - `protocol.rs` - runtime command lines and the output templates
//! - `parser.rs` - output line grammars
//! - `lifecycle.rs` - disc title tracking, end of title watchdog, exit handling
//! - `session.rs` - parser and lifecycle for one run, without I/O
//! - `client.rs` - `PlayerDriver`, the process and its I/O tasks

mod args;
mod client;
mod events;
mod filters;
mod lifecycle;
mod parser;
mod process;
mod protocol;
mod session;

pub use args::{LaunchArgs, OptionValue, MIN_CACHE_KB};
pub use client::{DriverError, PlayerDriver};
pub use events::PlayerEvent;
pub use filters::{audio_filter, video_filter, Translation};
pub use lifecycle::{ExitStatus, ProcessState};
pub use parser::{Activity, Output, OutputParser, Signal};
pub use process::{find_mpv, resolve_mpv, ProcessError};
pub use protocol::{
  playing_template, DiscNav, MpvCommand, OsdPositioner, SeekMode, VideoEq, MAX_OSD_MARGIN, PLAYING_TEMPLATE,
  STATUS_TEMPLATE,
};
pub use session::{Action, Session};
