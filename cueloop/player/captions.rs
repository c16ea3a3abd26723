use crate::player::media::{next_event, Subscription};
use crate::player::text_track::{Cue, TextTrack, TrackEvent};
use log::info;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Caption lines, most recent first, bounded to `capacity`.
#[derive(Debug)]
pub struct CaptionLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl CaptionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity,
        }
    }

    pub fn prepend(&mut self, line: String) {
        self.lines.push_front(line);
        self.lines.truncate(self.capacity);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// `<start>-<end>: <text>`, with numbers in their shortest form and the
/// payload flattened onto one line.
pub fn format_cue(cue: &Cue) -> String {
    format!("{}-{}: {}", cue.start, cue.end, cue.text.replace('\n', " "))
}

/// Prepends the first active cue to the log each time the active set changes.
pub struct CaptionReflector {
    log: Arc<RwLock<CaptionLog>>,
    _subscription: Subscription,
}

impl CaptionReflector {
    pub fn start(track: &TextTrack, log: Arc<RwLock<CaptionLog>>) -> Self {
        let mut events = track.subscribe();
        let subscription = Subscription::spawn("caption reflector", {
            let log = Arc::clone(&log);
            async move {
                while let Some(TrackEvent::CuesChanged(first)) =
                    next_event(&mut events, "caption reflector").await
                {
                    let Some(cue) = first else {
                        continue;
                    };
                    let line = format_cue(&cue);
                    info!("Caption: {line}");
                    log.write().await.prepend(line);
                }
            }
        });
        Self {
            log,
            _subscription: subscription,
        }
    }

    pub async fn lines(&self) -> Vec<String> {
        self.log.read().await.lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::{settle, FakeMedia};

    fn cue(start: f64, end: f64, text: &str) -> Cue {
        Cue {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn reflector(cues: Vec<Cue>) -> (Arc<TextTrack>, CaptionReflector) {
        let track = TextTrack::new(cues);
        let log = Arc::new(RwLock::new(CaptionLog::new(50)));
        let reflector = CaptionReflector::start(&track, log);
        (track, reflector)
    }

    #[test]
    fn formats_numbers_in_shortest_form() {
        assert_eq!(format_cue(&cue(5.0, 8.0, "Hello")), "5-8: Hello");
        assert_eq!(format_cue(&cue(1.5, 2.25, "a\nb")), "1.5-2.25: a b");
    }

    #[test]
    fn log_keeps_most_recent_first_within_capacity() {
        let mut log = CaptionLog::new(2);
        log.prepend("one".to_string());
        log.prepend("two".to_string());
        log.prepend("three".to_string());
        assert_eq!(log.lines(), vec!["three", "two"]);
    }

    #[test]
    fn huge_capacity_allocates_lazily() {
        let mut log = CaptionLog::new(usize::MAX / 8);
        log.prepend("only".to_string());
        assert_eq!(log.lines(), vec!["only"]);
    }

    #[tokio::test]
    async fn back_to_back_changes_each_reflect_their_own_cue() {
        let (track, reflector) = reflector(vec![cue(1.0, 2.0, "Earlier"), cue(5.0, 8.0, "Hello")]);

        track.update(1.5).await;
        track.update(6.0).await;
        track.update(9.0).await;
        settle().await;

        assert_eq!(reflector.lines().await, vec!["5-8: Hello", "1-2: Earlier"]);
    }

    #[tokio::test]
    async fn active_caption_is_prepended() {
        let (track, reflector) = reflector(vec![cue(1.0, 2.0, "Earlier"), cue(5.0, 8.0, "Hello")]);

        track.update(1.5).await;
        settle().await;
        track.update(6.0).await;
        settle().await;

        assert_eq!(reflector.lines().await, vec!["5-8: Hello", "1-2: Earlier"]);
    }

    #[tokio::test]
    async fn unchanged_active_set_adds_nothing() {
        let (track, reflector) = reflector(vec![cue(5.0, 8.0, "Hello")]);

        for t in [5.0, 5.5, 6.0, 7.9] {
            track.update(t).await;
        }
        settle().await;

        assert_eq!(reflector.lines().await, vec!["5-8: Hello"]);
    }

    #[tokio::test]
    async fn no_active_caption_is_a_no_op() {
        let (track, reflector) = reflector(vec![cue(5.0, 8.0, "Hello")]);

        track.update(6.0).await;
        settle().await;
        track.update(9.0).await;
        settle().await;

        assert_eq!(reflector.lines().await, vec!["5-8: Hello"]);
    }

    #[tokio::test]
    async fn only_the_first_active_cue_is_reflected() {
        let (track, reflector) = reflector(vec![cue(0.0, 10.0, "first"), cue(0.0, 10.0, "second")]);

        track.update(1.0).await;
        settle().await;

        assert_eq!(reflector.lines().await, vec!["0-10: first"]);
    }

    #[tokio::test]
    async fn reflects_captions_from_playback() {
        let media = FakeMedia::new(Some(20.0));
        let (track, reflector) = reflector(vec![cue(5.0, 8.0, "Hello")]);
        let _following = track.follow(media.as_ref());

        for t in [0.0, 2.5, 5.0, 7.5, 10.0] {
            media.advance(t);
            settle().await;
        }

        assert_eq!(reflector.lines().await, vec!["5-8: Hello"]);
    }
}
