pub mod config;
pub mod info;
pub mod media;
pub mod mpv;

pub use config::{ConfigError, PlayerConfig, TimingConfig};
pub use info::{InfoReader, PlayerInfo};
pub use media::MediaState;
pub use mpv::{DriverError, PlayerDriver, PlayerEvent};
