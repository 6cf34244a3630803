//! Player capability probing.

mod parse;
mod reader;

pub use parse::InfoItem;
pub use reader::{CommandRunner, InfoError, InfoReader, PlayerInfo, ProbeRunner};
