mod error;

use clap::{Parser, Subcommand};
use error::App;
use serde::Serialize;
use std::path::PathBuf;
use tokio::process::Command;
use zbus::{proxy, Connection};

type StdResult<T> = std::result::Result<T, App>;

#[proxy(
    interface = "org.cueloop.Looper",
    default_service = "org.cueloop.Looper",
    default_path = "/org/cueloop/Looper"
)]
trait Looper {
    async fn test_connection(&self) -> zbus::Result<()>;
    async fn play(&self) -> zbus::Result<()>;
    async fn pause(&self) -> zbus::Result<()>;
    async fn stop(&self) -> zbus::Result<()>;
    async fn status(&self) -> zbus::Result<(f64, f64, f64)>;
    async fn caption_log(&self) -> zbus::Result<Vec<String>>;
}

#[derive(Parser)]
#[command(name = "clq", about = "Control the cueloop looper.", version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start cueloop in the background")]
    Start(StartCommand),

    #[command(about = "Resume playback")]
    Play,

    #[command(about = "Pause playback")]
    Pause,

    #[command(about = "Stop cueloop")]
    Stop,

    #[command(about = "Show the playback position and loop bounds")]
    Status(JsonFlag),

    #[command(about = "Show reflected captions, most recent first")]
    Captions(JsonFlag),
}

#[derive(Parser)]
struct StartCommand {
    #[arg(help = "Media file to loop")]
    media: Option<PathBuf>,
    #[arg(short = 's', long = "subtitles", help = "WebVTT or SubRip file for the video")]
    subtitles: Option<PathBuf>,
    #[arg(long = "captions", action = clap::ArgAction::SetTrue, help = "Reflect active captions")]
    captions: bool,
}

#[derive(Parser)]
struct JsonFlag {
    #[arg(short = 'j', long = "json", action = clap::ArgAction::SetTrue, help = "Print as JSON")]
    json: bool,
}

#[derive(Serialize, Debug, PartialEq)]
struct StatusReport {
    position: f64,
    start: f64,
    end: Option<f64>,
}

impl StatusReport {
    fn from_wire((position, start, end): (f64, f64, f64)) -> Self {
        Self {
            position,
            start,
            end: (end >= 0.0).then_some(end),
        }
    }

    fn describe(&self) -> String {
        match self.end {
            Some(end) => format!(
                "Position {:.2}s, looping {}s-{}s",
                self.position, self.start, end
            ),
            None => format!(
                "Position {:.2}s, loop end not known yet, not looping",
                self.position
            ),
        }
    }
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let cli = Cli::parse();
    let connection = Connection::session().await?;
    let proxy = LooperProxy::new(&connection).await?;
    handle_command(cli, proxy).await
}

async fn handle_command(cli: Cli, proxy: LooperProxy<'_>) -> StdResult<()> {
    match cli.command {
        Commands::Start(start_cmd) => start_cueloop(start_cmd, &proxy).await,
        Commands::Play => handle_play_command(&proxy).await,
        Commands::Pause => handle_pause_command(&proxy).await,
        Commands::Stop => handle_stop_command(&proxy).await,
        Commands::Status(flag) => handle_status_command(flag, &proxy).await,
        Commands::Captions(flag) => handle_captions_command(flag, &proxy).await,
    }
}

async fn handle_play_command(proxy: &LooperProxy<'_>) -> StdResult<()> {
    if is_cueloop_running(proxy).await? {
        proxy.play().await?;
        println!("Playing");
    } else {
        eprintln!("cueloop is not running");
    }
    Ok(())
}

async fn handle_pause_command(proxy: &LooperProxy<'_>) -> StdResult<()> {
    if is_cueloop_running(proxy).await? {
        proxy.pause().await?;
        println!("Paused");
    } else {
        eprintln!("cueloop is not running");
    }
    Ok(())
}

async fn handle_stop_command(proxy: &LooperProxy<'_>) -> StdResult<()> {
    if is_cueloop_running(proxy).await? {
        proxy.stop().await?;
        println!("cueloop stopped");
    } else {
        eprintln!("cueloop is not running");
    }
    Ok(())
}

async fn handle_status_command(flag: JsonFlag, proxy: &LooperProxy<'_>) -> StdResult<()> {
    if !is_cueloop_running(proxy).await? {
        eprintln!("cueloop is not running");
        return Ok(());
    }
    let report = StatusReport::from_wire(proxy.status().await?);
    if flag.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.describe());
    }
    Ok(())
}

async fn handle_captions_command(flag: JsonFlag, proxy: &LooperProxy<'_>) -> StdResult<()> {
    if !is_cueloop_running(proxy).await? {
        eprintln!("cueloop is not running");
        return Ok(());
    }
    let lines = proxy.caption_log().await?;
    if flag.json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else if lines.is_empty() {
        println!("No captions reflected yet");
    } else {
        for line in lines {
            println!("{line}");
        }
    }
    Ok(())
}

async fn is_cueloop_running(proxy: &LooperProxy<'_>) -> StdResult<bool> {
    match proxy.test_connection().await {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

fn start_arguments(start_cmd: &StartCommand) -> Vec<String> {
    let mut arguments = Vec::new();
    if let Some(media) = &start_cmd.media {
        arguments.push(media.display().to_string());
    }
    if let Some(subtitles) = &start_cmd.subtitles {
        arguments.push("--subtitles".to_string());
        arguments.push(subtitles.display().to_string());
    }
    if start_cmd.captions {
        arguments.push("--captions".to_string());
    }
    arguments
}

async fn start_cueloop(start_cmd: StartCommand, proxy: &LooperProxy<'_>) -> StdResult<()> {
    if is_cueloop_running(proxy).await? {
        println!("cueloop is already running");
        return Ok(());
    }

    let current_exe_path = std::env::current_exe()?;
    let exe_dir = current_exe_path.parent().ok_or_else(|| {
        App::InvalidInput("Failed to get the directory of the executable".to_string())
    })?;
    let cueloop_path = exe_dir.join("cueloop");

    if !cueloop_path.exists() {
        return Err(App::InvalidInput(
            "cueloop executable not found in the same directory".to_string(),
        ));
    }

    let child = Command::new(cueloop_path)
        .args(start_arguments(&start_cmd))
        .spawn()
        .map_err(App::Io)?;
    println!("cueloop started, process ID: {:?}", child.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_end_means_not_known() {
        let report = StatusReport::from_wire((3.5, 0.0, -1.0));
        assert_eq!(report.end, None);
        assert_eq!(
            report.describe(),
            "Position 3.50s, loop end not known yet, not looping"
        );
    }

    #[test]
    fn known_end_is_described() {
        let report = StatusReport::from_wire((12.0, 0.0, 120.0));
        assert_eq!(report.describe(), "Position 12.00s, looping 0s-120s");
    }

    #[test]
    fn start_forwards_flags_to_the_daemon() {
        let cli = Cli::parse_from(["clq", "start", "clip.mp4", "-s", "clip.vtt", "--captions"]);
        let Commands::Start(start_cmd) = cli.command else {
            panic!("expected start command");
        };
        assert_eq!(
            start_arguments(&start_cmd),
            vec!["clip.mp4", "--subtitles", "clip.vtt", "--captions"]
        );
    }

    #[test]
    fn captions_json_flag_parses() {
        let cli = Cli::parse_from(["clq", "captions", "--json"]);
        assert!(matches!(cli.command, Commands::Captions(JsonFlag { json: true })));
    }

    #[test]
    fn status_report_serializes_unknown_end_as_null() {
        let report = StatusReport::from_wire((1.0, 0.0, -1.0));
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"position":1.0,"start":0.0,"end":null}"#
        );
    }
}
