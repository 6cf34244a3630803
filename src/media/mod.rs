//! Media state model: tracks, chapters, disc titles and clip metadata.

mod chapters;
mod disc;
mod state;
mod titles;
mod tracks;

pub use chapters::{Chapter, Chapters};
pub use disc::{DiscName, DiscType};
pub use state::{AudioInfo, ClipInfo, MediaState, VideoInfo};
pub use titles::{Title, Titles};
pub use tracks::{SubtitleSource, Track, TrackKind, TrackList};
