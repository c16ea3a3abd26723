pub mod captions;
#[cfg(test)]
pub mod fake;
pub mod gst_logic;
pub mod looper;
pub mod media;
pub mod text_track;

use crate::config::Config;
use crate::error::App;
use crate::player::captions::{CaptionLog, CaptionReflector};
use crate::player::looper::Looper;
use crate::player::media::{MediaElement, Subscription};
use crate::player::text_track::{Cue, TextTrack};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, RwLock};

pub enum Command {
    Play,
    Pause,
    Stop,
    Status(oneshot::Sender<Status>),
    CaptionLog(oneshot::Sender<Vec<String>>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Status {
    pub position: f64,
    pub start: f64,
    pub end: Option<f64>,
}

/// A media element with its looper and, when enabled, its caption reflector.
pub struct Player {
    media: Arc<dyn MediaElement>,
    looper: Looper,
    captions: Option<Captions>,
}

struct Captions {
    reflector: CaptionReflector,
    _track: Subscription,
}

impl Player {
    /// Starts the caption reflector (when `cues` are given and captions are
    /// enabled) ahead of the looper, so the first active cue is not missed.
    pub fn start(
        media: Arc<dyn MediaElement>,
        config: &Config,
        cues: Option<Vec<Cue>>,
    ) -> Result<Self, App> {
        let captions = match (config.captions.enabled, cues) {
            (true, Some(cues)) => {
                let track = TextTrack::new(cues);
                let log = Arc::new(RwLock::new(CaptionLog::new(config.captions.capacity)));
                let reflector = CaptionReflector::start(&track, log);
                let following = track.follow(media.as_ref());
                info!("Caption reflector enabled with {} cues", track.cues().len());
                Some(Captions {
                    reflector,
                    _track: following,
                })
            }
            (true, None) => {
                warn!("Captions are enabled but no subtitles were given");
                None
            }
            (false, _) => None,
        };

        let looper = Looper::start(Arc::clone(&media), &config.looper)?;
        Ok(Self {
            media,
            looper,
            captions,
        })
    }

    pub async fn status(&self) -> Status {
        let bounds = self.looper.bounds().await;
        Status {
            position: self.media.current_time(),
            start: bounds.start,
            end: bounds.end,
        }
    }

    pub async fn caption_lines(&self) -> Vec<String> {
        match &self.captions {
            Some(captions) => captions.reflector.lines().await,
            None => Vec::new(),
        }
    }

    pub async fn handle(&self, command: Command) -> Result<(), App> {
        match command {
            Command::Play => {
                info!("Resume playback");
                self.media.play()
            }
            Command::Pause => self.media.pause(),
            Command::Stop => self.media.stop(),
            Command::Status(reply) => reply
                .send(self.status().await)
                .map_err(|_| App::Channel("Status requester went away".to_string())),
            Command::CaptionLog(reply) => reply
                .send(self.caption_lines().await)
                .map_err(|_| App::Channel("Caption log requester went away".to_string())),
        }
    }

    /// Serves commands until the sender closes or `Stop` arrives.
    pub fn listen_for_commands(
        self: Arc<Self>,
        mut command_receiver: mpsc::Receiver<Command>,
        stop_signal: watch::Sender<()>,
    ) -> Subscription {
        Subscription::spawn("commands", async move {
            while let Some(command) = command_receiver.recv().await {
                let stop = matches!(command, Command::Stop);
                if let Err(e) = self.handle(command).await {
                    error!("Failed to handle command: {}", e);
                }
                if stop {
                    let _ = stop_signal.send(());
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::{settle, FakeMedia};
    use crate::player::text_track::parse;

    fn captions_config() -> Config {
        let mut config = Config::default();
        config.captions.enabled = true;
        config
    }

    #[tokio::test]
    async fn end_to_end_loop_and_caption() {
        let media = FakeMedia::new(Some(120.0));
        let cues = parse("WEBVTT\n\n00:05.000 --> 00:08.000\nHello\n").unwrap();
        let player = Player::start(media.clone(), &captions_config(), Some(cues)).unwrap();

        for t in [0.0, 5.0, 30.0, 60.0, 119.9, 120.0] {
            media.advance(t);
            settle().await;
        }

        assert_eq!(media.position(), 0.0);
        assert_eq!(media.plays(), 1);
        assert_eq!(player.caption_lines().await, vec!["5-8: Hello"]);
        assert_eq!(
            player.status().await,
            Status {
                position: 0.0,
                start: 0.0,
                end: Some(120.0)
            }
        );
    }

    #[tokio::test]
    async fn captions_stay_off_unless_enabled() {
        let media = FakeMedia::new(Some(20.0));
        let cues = parse("00:05.000 --> 00:08.000\nHello\n").unwrap();
        let player = Player::start(media.clone(), &Config::default(), Some(cues)).unwrap();

        media.advance(6.0);
        settle().await;

        assert!(player.caption_lines().await.is_empty());
    }

    #[tokio::test]
    async fn commands_reach_the_media() {
        let media = FakeMedia::new(Some(20.0));
        let player = Arc::new(Player::start(media.clone(), &Config::default(), None).unwrap());
        let (command_sender, command_receiver) = mpsc::channel(4);
        let (stop_sender, mut stop_receiver) = watch::channel(());
        let _commands = Arc::clone(&player).listen_for_commands(command_receiver, stop_sender);

        command_sender.send(Command::Pause).await.unwrap();
        command_sender.send(Command::Play).await.unwrap();
        let (reply, status) = oneshot::channel();
        command_sender.send(Command::Status(reply)).await.unwrap();
        assert_eq!(status.await.unwrap().end, Some(20.0));

        command_sender.send(Command::Stop).await.unwrap();
        stop_receiver.changed().await.unwrap();

        assert_eq!(media.pauses(), 1);
        assert_eq!(media.plays(), 2);
        assert_eq!(media.stops(), 1);
    }
}
