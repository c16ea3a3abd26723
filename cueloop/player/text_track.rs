use crate::error::App;
use crate::player::media::{next_event, MediaElement, MediaEvent, Subscription};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

#[derive(Clone, Debug, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn is_active_at(&self, position: f64) -> bool {
        self.start <= position && position < self.end
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrackEvent {
    /// The set of active cues differs from the previous notification.
    /// Carries the first cue of the new set, if any.
    CuesChanged(Option<Cue>),
}

/// Timed cues attached to a media element.
///
/// The active set is every cue containing the current position, in track order.
pub struct TextTrack {
    cues: Vec<Cue>,
    active: RwLock<Vec<usize>>,
    events: broadcast::Sender<TrackEvent>,
}

impl TextTrack {
    pub fn new(cues: Vec<Cue>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            cues,
            active: RwLock::new(Vec::new()),
            events,
        })
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.events.subscribe()
    }

    pub async fn active_cues(&self) -> Vec<Cue> {
        self.active
            .read()
            .await
            .iter()
            .map(|&index| self.cues[index].clone())
            .collect()
    }

    /// Recomputes the active set for `position`. Returns whether it changed.
    pub async fn update(&self, position: f64) -> bool {
        let now_active: Vec<usize> = self
            .cues
            .iter()
            .enumerate()
            .filter(|(_, cue)| cue.is_active_at(position))
            .map(|(index, _)| index)
            .collect();

        let mut active = self.active.write().await;
        if *active == now_active {
            return false;
        }
        debug!("Active cues at {position}s: {now_active:?}");
        let first = now_active.first().map(|&index| self.cues[index].clone());
        *active = now_active;
        // Sent under the lock so notifications keep the order of the changes.
        let _ = self.events.send(TrackEvent::CuesChanged(first));
        true
    }

    /// Keeps the active set in step with `media` playback.
    pub fn follow(self: &Arc<Self>, media: &dyn MediaElement) -> Subscription {
        let mut events = media.subscribe();
        let track = Arc::clone(self);
        Subscription::spawn("text track", async move {
            while let Some(event) = next_event(&mut events, "text track").await {
                if let MediaEvent::TimeProgressed(position) = event {
                    track.update(position).await;
                }
            }
        })
    }
}

pub async fn load_from_file(file_path: &Path) -> Result<Vec<Cue>, App> {
    info!("Loading subtitles from {}", file_path.display());
    let content = tokio::fs::read_to_string(file_path).await?;
    let cues = parse(&content)?;
    info!("Loaded {} cues", cues.len());
    Ok(cues)
}

/// Parses `WebVTT` or `SubRip` text into cues in file order.
pub fn parse(content: &str) -> Result<Vec<Cue>, App> {
    let content = content.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if let Some(cue) = parse_block(&block)? {
                cues.push(cue);
            }
            block.clear();
        } else {
            block.push((index + 1, line));
        }
    }
    if let Some(cue) = parse_block(&block)? {
        cues.push(cue);
    }
    Ok(cues)
}

fn parse_block(block: &[(usize, &str)]) -> Result<Option<Cue>, App> {
    let Some(&(first_line, first)) = block.first() else {
        return Ok(None);
    };
    if is_header_or_comment(first) {
        return Ok(None);
    }

    let Some(timing) = block.iter().take(2).position(|(_, line)| line.contains("-->")) else {
        warn!("Skipping block without timing at line {first_line}");
        return Ok(None);
    };
    let (line_number, timing_line) = block[timing];
    let (start, end) = parse_timing(timing_line).map_err(|reason| App::SubtitleParsing {
        line: line_number,
        reason,
    })?;
    if end < start {
        return Err(App::SubtitleParsing {
            line: line_number,
            reason: format!("cue ends at {end}s before it starts at {start}s"),
        });
    }

    let text = block[timing + 1..]
        .iter()
        .map(|(_, line)| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Some(Cue { start, end, text }))
}

/// `WEBVTT`, `NOTE`, `STYLE` and `REGION` only count as a whole word.
fn is_header_or_comment(line: &str) -> bool {
    ["WEBVTT", "NOTE", "STYLE", "REGION"].iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

fn parse_timing(line: &str) -> Result<(f64, f64), String> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| "missing '-->'".to_string())?;
    let end = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| "missing end timestamp".to_string())?;
    Ok((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// Accepts `hh:mm:ss.mmm`, `mm:ss.mmm` and the `SubRip` comma form.
fn parse_timestamp(stamp: &str) -> Result<f64, String> {
    let normalized = stamp.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(format!("invalid timestamp '{stamp}'")),
    };

    let invalid = || format!("invalid timestamp '{stamp}'");
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 || !seconds.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    if seconds >= 60.0 {
        return Err(invalid());
    }
    Ok(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}
