use crate::error::App;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub looper: LooperConfig,
    pub captions: CaptionsConfig,
    pub log: LogConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    pub path: Option<PathBuf>,
    pub subtitles: Option<PathBuf>,
    /// Let the player draw subtitles over the video as well.
    pub render_subtitles: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            path: None,
            subtitles: None,
            render_subtitles: true,
        }
    }
}

/// When the looper reads the end of the loop from the media duration.
#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndCapture {
    /// Wait until the media reports its metadata.
    #[default]
    OnMetadata,
    /// Read the duration as soon as the looper starts, ready or not.
    Immediate,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LooperConfig {
    pub start: f64,
    pub end: Option<f64>,
    pub end_capture: EndCapture,
    pub tick_ms: u64,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: None,
            end_capture: EndCapture::OnMetadata,
            tick_ms: 250,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CaptionsConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 200,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    pub async fn load_from_file(file_path: &Path) -> Result<Self, App> {
        log::info!("Loading configuration from {}", file_path.display());
        let content = tokio::fs::read_to_string(file_path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, App> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), App> {
        let looper = &self.looper;
        if !looper.start.is_finite() || looper.start < 0.0 {
            return Err(App::Config(format!(
                "Loop start must be a non-negative number, got {}",
                looper.start
            )));
        }
        if let Some(end) = looper.end {
            if !end.is_finite() || end <= looper.start {
                return Err(App::Config(format!(
                    "Loop end {end} must come after loop start {}",
                    looper.start
                )));
            }
        }
        if looper.tick_ms == 0 {
            return Err(App::Config("tick_ms must be at least 1".to_string()));
        }
        if self.captions.capacity == 0 {
            return Err(App::Config(
                "Caption log capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
