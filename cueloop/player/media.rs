use crate::error::App;
use log::{debug, warn};
use std::future::Future;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{self, JoinHandle};

/// Notifications published by a media element while it plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaEvent {
    /// Total duration became known. Published at most once per element.
    MetadataLoaded(f64),
    /// Playback advanced to the given position, in seconds.
    TimeProgressed(f64),
    Ended,
}

/// A playable resource with a mutable position and a read-only duration.
///
/// Positions and durations are seconds. `duration` is `None` until the
/// element knows it.
pub trait MediaElement: Send + Sync {
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64) -> Result<(), App>;
    fn duration(&self) -> Option<f64>;
    fn play(&self) -> Result<(), App>;
    fn pause(&self) -> Result<(), App>;
    fn stop(&self) -> Result<(), App>;
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;
}

/// A background reaction bound to the lifetime of this handle.
///
/// The task is aborted when the handle is dropped.
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn spawn<F>(name: &'static str, reaction: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("Subscribing {name}");
        Self {
            name,
            handle: task::spawn(reaction),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("Unsubscribing {}", self.name);
        self.handle.abort();
    }
}

/// Receives the next event, skipping over lag. Returns `None` once the
/// sender is gone.
pub async fn next_event<T: Clone>(receiver: &mut broadcast::Receiver<T>, name: &str) -> Option<T> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("{name} lagged behind, {skipped} notifications skipped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// A duration counts as known only when it is finite and positive.
pub fn ready_duration(duration: Option<f64>) -> Option<f64> {
    duration.filter(|d| d.is_finite() && *d > 0.0)
}
