mod config;
mod dbus;
mod error;
mod player;

use crate::config::{Config, EndCapture};
use crate::error::App;
use crate::player::gst_logic::Gst;
use crate::player::text_track;
use crate::player::Player;
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::{
    sync::{mpsc, watch},
    task,
};

#[derive(Parser, Debug)]
#[command(
    name = "cueloop",
    about = "Loop a video and reflect its active captions.",
    version = "1.0.0"
)]
struct Args {
    /// Media file to loop, overrides `media.path`
    media: Option<PathBuf>,

    #[arg(short = 's', long = "subtitles", help = "WebVTT or SubRip file for the video")]
    subtitles: Option<PathBuf>,

    #[arg(short = 'c', long = "config", help = "Configuration file to read")]
    config: Option<PathBuf>,

    #[arg(long = "captions", action = clap::ArgAction::SetTrue, help = "Reflect active captions into the caption log")]
    captions: bool,

    #[arg(long = "start", help = "Loop start in seconds")]
    start: Option<f64>,

    #[arg(long = "end", help = "Loop end in seconds, defaults to the media duration")]
    end: Option<f64>,

    #[arg(long = "end-capture", value_enum, help = "When to read the media duration")]
    end_capture: Option<EndCapture>,

    #[arg(long = "log-level", help = "Log specification, e.g. info or debug")]
    log_level: Option<String>,

    #[arg(short = 'f', long = "foreground", action = clap::ArgAction::SetTrue, help = "Also log to stderr")]
    foreground: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(media) = &self.media {
            config.media.path = Some(media.clone());
        }
        if let Some(subtitles) = &self.subtitles {
            config.media.subtitles = Some(subtitles.clone());
        }
        if self.captions {
            config.captions.enabled = true;
        }
        if let Some(start) = self.start {
            config.looper.start = start;
        }
        if let Some(end) = self.end {
            config.looper.end = Some(end);
        }
        if let Some(end_capture) = self.end_capture {
            config.looper.end_capture = end_capture;
        }
        if let Some(level) = &self.log_level {
            config.log.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), App> {
    let args = Args::parse();
    let home_dir = std::env::var("HOME")
        .map_err(|e| App::Config(format!("Failed to get HOME environment variable: {e}")))?;
    let config_dir = PathBuf::from(format!("{home_dir}/.config/cueloop"));

    // Create an empty configuration on first run
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            fs::create_dir_all(&config_dir).await?;
            let path = config_dir.join("config.toml");
            if !path.exists() {
                fs::write(&path, "").await?;
            }
            path
        }
    };

    let mut config = Config::load_from_file(&config_path).await?;
    args.apply(&mut config);
    config.validate()?;

    let log_dir = config
        .log
        .directory
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    fs::create_dir_all(&log_dir).await?;

    // Logger setup
    let _logger = Logger::try_with_str(&config.log.level)?
        .log_to_file(FileSpec::default().directory(&log_dir))
        .rotate(
            Criterion::Size(1_000_000),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(if args.foreground {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    let media_path = config
        .media
        .path
        .clone()
        .ok_or_else(|| App::Config("No media file given".to_string()))?;
    let cues = load_cues(&config).await?;
    let rendered_subtitles = config
        .media
        .subtitles
        .as_deref()
        .filter(|_| config.media.render_subtitles);

    let media = Gst::open(
        &media_path,
        rendered_subtitles,
        Duration::from_millis(config.looper.tick_ms),
    )?;
    let player = Arc::new(Player::start(media, &config, cues)?);

    let (stop_sender, mut stop_receiver) = watch::channel(());
    let (command_sender, command_receiver) = mpsc::channel(8);
    let _commands = Arc::clone(&player).listen_for_commands(command_receiver, stop_sender.clone());

    task::spawn(async move {
        if let Err(e) = dbus::run_dbus_server(command_sender, stop_sender).await {
            error!("DBus server error: {}", e);
        }
    });

    tokio::select! {
        _ = stop_receiver.changed() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }
    info!("Shutting down");
    Ok(())
}

async fn load_cues(config: &Config) -> Result<Option<Vec<text_track::Cue>>, App> {
    if !config.captions.enabled {
        return Ok(None);
    }
    match &config.media.subtitles {
        Some(path) => Ok(Some(text_track::load_from_file(path).await?)),
        None => Ok(None),
    }
}
