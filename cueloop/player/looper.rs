use crate::config::{EndCapture, LooperConfig};
use crate::error::App;
use crate::player::media::{next_event, ready_duration, MediaElement, MediaEvent, Subscription};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Playback cycles within `[start, end)`. An unknown `end` never loops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopBounds {
    pub start: f64,
    pub end: Option<f64>,
}

impl LoopBounds {
    pub fn should_loop(&self, position: f64) -> bool {
        self.end.is_some_and(|end| position >= end)
    }

    fn capture_end(&mut self, duration: Option<f64>) {
        match ready_duration(duration) {
            Some(end) if end > self.start => {
                info!("Loop end captured at {end}s");
                self.end = Some(end);
            }
            Some(end) => {
                warn!(
                    "Media duration {end}s does not reach loop start {}s, looping disabled",
                    self.start
                );
            }
            None => {
                warn!("Media duration is not known yet, looping disabled");
            }
        }
    }
}

pub struct Looper {
    bounds: Arc<RwLock<LoopBounds>>,
    _subscription: Subscription,
}

impl Looper {
    /// Subscribes to `media`, captures the loop end and starts playback once.
    pub fn start(media: Arc<dyn MediaElement>, config: &LooperConfig) -> Result<Self, App> {
        let mut events = media.subscribe();

        let mut bounds = LoopBounds {
            start: config.start,
            end: None,
        };
        let mut awaiting_metadata = false;
        if let Some(end) = config.end {
            bounds.end = Some(end);
        } else {
            match config.end_capture {
                EndCapture::Immediate => bounds.capture_end(media.duration()),
                EndCapture::OnMetadata => {
                    if ready_duration(media.duration()).is_some() {
                        bounds.capture_end(media.duration());
                    } else {
                        info!("Waiting for media metadata before capturing loop end");
                        awaiting_metadata = true;
                    }
                }
            }
        }

        let bounds = Arc::new(RwLock::new(bounds));
        let subscription = Subscription::spawn("looper", {
            let bounds = Arc::clone(&bounds);
            let media = Arc::clone(&media);
            async move {
                while let Some(event) = next_event(&mut events, "looper").await {
                    match event {
                        MediaEvent::MetadataLoaded(duration) if awaiting_metadata => {
                            awaiting_metadata = false;
                            bounds.write().await.capture_end(Some(duration));
                        }
                        MediaEvent::TimeProgressed(position) => {
                            let current = *bounds.read().await;
                            if current.should_loop(position) {
                                info!("Reached {position}s, looping back to {}s", current.start);
                                if let Err(e) = media.set_current_time(current.start) {
                                    error!("Failed to loop back: {}", e);
                                }
                            }
                        }
                        MediaEvent::Ended => {
                            warn!("Reached the end of the media without looping back");
                        }
                        MediaEvent::MetadataLoaded(_) => (),
                    }
                }
            }
        });

        media.play()?;
        Ok(Self {
            bounds,
            _subscription: subscription,
        })
    }

    pub async fn bounds(&self) -> LoopBounds {
        *self.bounds.read().await
    }
}
