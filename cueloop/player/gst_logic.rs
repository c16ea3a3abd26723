use crate::error::App;
use crate::player::media::{MediaElement, MediaEvent, Subscription};
use futures_util::stream::StreamExt;
use gstreamer::prelude::*;
use gstreamer::{ClockTime, Element, MessageView, SeekFlags, State};
use log::{error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// `MediaElement` backed by a GStreamer `playbin`.
pub struct Gst {
    playbin: Element,
    events: broadcast::Sender<MediaEvent>,
    _bus: Subscription,
    _ticker: Subscription,
}

impl Gst {
    /// Builds a paused `playbin` for `media`. The pipeline prerolls so the
    /// duration becomes available without starting playback.
    pub fn open(media: &Path, subtitles: Option<&Path>, tick: Duration) -> Result<Arc<Self>, App> {
        gstreamer::init()?;

        let uri = file_uri(media)?;
        let playbin = gstreamer::ElementFactory::make("playbin")
            .name("cueloop-playbin")
            .property("uri", uri.as_str())
            .build()
            .map_err(|_| App::Element("Failed to create playbin element".to_string()))?;
        if let Some(subtitles) = subtitles {
            playbin.set_property("suburi", file_uri(subtitles)?.as_str());
        }
        info!("Opened {uri}");

        let (events, _) = broadcast::channel(64);
        let bus = listen_to_bus(&playbin, &events)?;
        let ticker = publish_progress(&playbin, &events, tick);

        playbin
            .set_state(State::Paused)
            .map_err(|_| App::State("Failed to set pipeline to Paused".to_string()))?;

        Ok(Arc::new(Self {
            playbin,
            events,
            _bus: bus,
            _ticker: ticker,
        }))
    }

    fn set_state(&self, state: State) -> Result<(), App> {
        self.playbin
            .set_state(state)
            .map(|_| ())
            .map_err(|_| App::State(format!("Failed to set pipeline to {state:?}")))
    }
}

impl MediaElement for Gst {
    fn current_time(&self) -> f64 {
        self.playbin
            .query_position::<ClockTime>()
            .map_or(0.0, to_seconds)
    }

    fn set_current_time(&self, seconds: f64) -> Result<(), App> {
        self.playbin
            .seek_simple(SeekFlags::FLUSH | SeekFlags::KEY_UNIT, from_seconds(seconds))
            .map_err(|e| App::Seek(e.message.to_string()))
    }

    fn duration(&self) -> Option<f64> {
        self.playbin.query_duration::<ClockTime>().map(to_seconds)
    }

    fn play(&self) -> Result<(), App> {
        info!("Start playback");
        self.set_state(State::Playing)
    }

    fn pause(&self) -> Result<(), App> {
        info!("Pause");
        self.set_state(State::Paused)
    }

    fn stop(&self) -> Result<(), App> {
        info!("Stop");
        self.set_state(State::Null)
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

impl Drop for Gst {
    fn drop(&mut self) {
        if let Err(e) = self.playbin.set_state(State::Null) {
            warn!("Failed to release pipeline: {}", e);
        }
    }
}

fn file_uri(path: &Path) -> Result<String, App> {
    let absolute = std::fs::canonicalize(path)?;
    glib::filename_to_uri(&absolute, None)
        .map(|uri| uri.to_string())
        .map_err(|e| App::Config(format!("Invalid media path {}: {e}", absolute.display())))
}

fn listen_to_bus(
    playbin: &Element,
    events: &broadcast::Sender<MediaEvent>,
) -> Result<Subscription, App> {
    let bus = playbin
        .bus()
        .ok_or_else(|| App::Pipeline("Failed to get GStreamer bus".to_string()))?;
    let playbin = playbin.clone();
    let events = events.clone();
    let metadata_sent = Arc::new(AtomicBool::new(false));

    Ok(Subscription::spawn(
        "gstreamer bus",
        bus.stream().for_each(move |msg| {
            match msg.view() {
                MessageView::DurationChanged(_) | MessageView::AsyncDone(_) => {
                    if !metadata_sent.load(Ordering::SeqCst) {
                        if let Some(duration) = playbin.query_duration::<ClockTime>() {
                            metadata_sent.store(true, Ordering::SeqCst);
                            let duration = to_seconds(duration);
                            info!("Metadata loaded, duration {duration}s");
                            let _ = events.send(MediaEvent::MetadataLoaded(duration));
                        }
                    }
                }
                MessageView::Eos(_) => {
                    info!("EOS message received");
                    for event in end_of_stream(playbin.query_duration::<ClockTime>()) {
                        let _ = events.send(event);
                    }
                }
                MessageView::Error(err) => {
                    error!(
                        "Error from GStreamer pipeline: {} ({:?})",
                        err.error(),
                        err.debug()
                    );
                }
                _ => (),
            }
            std::future::ready(())
        }),
    ))
}

/// The ticker can stop short of the last frame, so the final position is
/// published before `Ended` for listeners watching the end of the media.
fn end_of_stream(duration: Option<ClockTime>) -> Vec<MediaEvent> {
    duration
        .map(|duration| MediaEvent::TimeProgressed(to_seconds(duration)))
        .into_iter()
        .chain(std::iter::once(MediaEvent::Ended))
        .collect()
}

fn publish_progress(
    playbin: &Element,
    events: &broadcast::Sender<MediaEvent>,
    tick: Duration,
) -> Subscription {
    let playbin = playbin.clone();
    let events = events.clone();
    Subscription::spawn("gstreamer ticker", async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            if playbin.current_state() != State::Playing {
                continue;
            }
            if let Some(position) = playbin.query_position::<ClockTime>() {
                let _ = events.send(MediaEvent::TimeProgressed(to_seconds(position)));
            }
        }
    })
}

#[allow(clippy::cast_precision_loss)]
fn to_seconds(time: ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_seconds(seconds: f64) -> ClockTime {
    ClockTime::from_nseconds((seconds.max(0.0) * 1_000_000_000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_round_trips_through_seconds() {
        assert_eq!(to_seconds(ClockTime::from_mseconds(119_900)), 119.9);
        assert_eq!(from_seconds(0.0), ClockTime::ZERO);
        assert_eq!(from_seconds(2.5), ClockTime::from_mseconds(2_500));
    }

    #[test]
    fn negative_positions_clamp_to_zero() {
        assert_eq!(from_seconds(-3.0), ClockTime::ZERO);
    }

    #[test]
    fn end_of_stream_reports_the_final_position_first() {
        assert_eq!(
            end_of_stream(Some(ClockTime::from_mseconds(12_500))),
            vec![MediaEvent::TimeProgressed(12.5), MediaEvent::Ended]
        );
        assert_eq!(end_of_stream(None), vec![MediaEvent::Ended]);
    }
}
