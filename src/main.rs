use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use wzplayer_lib::info::{InfoReader, PlayerInfo};
use wzplayer_lib::mpv::{resolve_mpv, MpvCommand, PlayerDriver, PlayerEvent};
use wzplayer_lib::PlayerConfig;

#[derive(Parser)]
#[command(name = "wzplayer")]
#[command(about = "Play media through mpv and print what the player reports")]
struct Cli {
  /// Configuration file (defaults to the user config directory)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Path to the mpv binary
  #[arg(long, global = true)]
  mpv: Option<PathBuf>,

  /// Debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Play a file, stream or disc URL. Lines typed on stdin are sent to the player.
  Play {
    target: String,
    /// Treat the target as a playlist file
    #[arg(long)]
    playlist: bool,
    /// Start position in seconds
    #[arg(long)]
    start: Option<f64>,
  },
  /// Print what the mpv binary supports
  Probe,
}

fn load_config(cli: &Cli) -> Result<PlayerConfig, Box<dyn std::error::Error>> {
  let path = cli.config.clone().or_else(PlayerConfig::default_path);
  let mut config = match path {
    Some(path) => PlayerConfig::load(&path)?,
    None => PlayerConfig::default(),
  };
  if let Some(mpv) = &cli.mpv {
    config.mpv_path = Some(mpv.to_string_lossy().into_owned());
  }
  config.validate()?;
  Ok(config)
}

fn probe(config: &PlayerConfig) -> Result<Arc<PlayerInfo>, Box<dyn std::error::Error>> {
  let mpv = resolve_mpv(config.mpv_path())?;
  let reader = InfoReader::new(config.cache_dir());
  Ok(reader.get_info(&mpv)?)
}

fn print_info(info: &PlayerInfo) {
  println!("version: {}", info.version.as_deref().unwrap_or("unknown"));
  let lists = [
    ("video outputs", &info.vo_list),
    ("audio outputs", &info.ao_list),
    ("demuxers", &info.demuxer_list),
    ("video codecs", &info.vc_list),
    ("audio codecs", &info.ac_list),
    ("video filters", &info.vf_list),
    ("audio filters", &info.af_list),
  ];
  for (label, items) in lists {
    println!("{}: {}", label, items.len());
    for item in items {
      println!("  {:<20} {}", item.name, item.desc);
    }
  }
  println!("options: {}", info.option_list.len());
}

async fn play(
  config: PlayerConfig,
  target: &str,
  playlist: bool,
  start: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
  let info = match probe(&config) {
    Ok(info) => Some(info),
    Err(e) => {
      log::warn!("Capability probe failed, options will not be checked: {}", e);
      None
    }
  };

  let report_crashes = config.report_player_crashes;
  let quit_timeout = config.timing.quit_timeout();
  let driver = PlayerDriver::new(config, info);
  let events = driver.events();

  let mut args = driver.launch_args(target, playlist);
  if let Some(start) = start {
    args.set_option("start", start);
  }
  driver.start_with(target, args).await?;

  let mut input = BufReader::new(tokio::io::stdin()).lines();
  let mut input_open = true;
  loop {
    tokio::select! {
      event = events.recv() => {
        let Ok(event) = event else { break };
        match &event {
          PlayerEvent::ReceivedCurrentSec(_) | PlayerEvent::ReceivedCurrentFrame(_) => {}
          PlayerEvent::PlayerFullyLoaded => {
            let media = driver.media();
            let media = media.read();
            println!("Loaded: {} ({:.1}s)", media.display_name(), media.duration);
          }
          PlayerEvent::ProcessError(reason) => {
            if report_crashes {
              eprintln!("Player error: {}", reason);
            }
          }
          other => println!("{:?}", other),
        }
        if matches!(event, PlayerEvent::ProcessFinished { .. }) {
          break;
        }
      }
      line = input.next_line(), if input_open => match line {
        Ok(Some(line)) if !line.trim().is_empty() => {
          if let Err(e) = driver.send(MpvCommand::raw(line.trim())) {
            log::warn!("Command not sent: {}", e);
          }
        }
        Ok(Some(_)) => {}
        _ => input_open = false,
      },
      _ = tokio::signal::ctrl_c() => {
        driver.stop(quit_timeout).await;
      }
    }
  }
  Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();
  let level = if cli.verbose { "debug" } else { "info" };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

  let config = load_config(&cli)?;
  match &cli.command {
    Commands::Play {
      target,
      playlist,
      start,
    } => play(config, target, *playlist, *start).await?,
    Commands::Probe => print_info(&*probe(&config)?),
  }
  Ok(())
}
