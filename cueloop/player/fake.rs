use crate::error::App;
use crate::player::media::{MediaElement, MediaEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task;

/// In-memory media element driven by the test.
pub struct FakeMedia {
    position: Mutex<f64>,
    duration: Mutex<Option<f64>>,
    seeks: Mutex<Vec<f64>>,
    plays: AtomicUsize,
    pauses: AtomicUsize,
    stops: AtomicUsize,
    events: broadcast::Sender<MediaEvent>,
}

impl FakeMedia {
    pub fn new(duration: Option<f64>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            position: Mutex::new(0.0),
            duration: Mutex::new(duration),
            seeks: Mutex::new(Vec::new()),
            plays: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            events,
        })
    }

    /// Moves playback to `seconds` and publishes the tick.
    pub fn advance(&self, seconds: f64) {
        *self.position.lock().unwrap() = seconds;
        let _ = self.events.send(MediaEvent::TimeProgressed(seconds));
    }

    pub fn load_metadata(&self, duration: f64) {
        *self.duration.lock().unwrap() = Some(duration);
        let _ = self.events.send(MediaEvent::MetadataLoaded(duration));
    }

    pub fn position(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaElement for FakeMedia {
    fn current_time(&self) -> f64 {
        self.position()
    }

    fn set_current_time(&self, seconds: f64) -> Result<(), App> {
        *self.position.lock().unwrap() = seconds;
        self.seeks.lock().unwrap().push(seconds);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        *self.duration.lock().unwrap()
    }

    fn play(&self) -> Result<(), App> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<(), App> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), App> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

/// Lets spawned subscriptions drain their queues on the current-thread runtime.
pub async fn settle() {
    for _ in 0..20 {
        task::yield_now().await;
    }
}
