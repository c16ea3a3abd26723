use flexi_logger::FlexiLoggerError;
use std::io;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum App {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    TomlParsing(String),

    #[error("Subtitle parsing error at line {line}: {reason}")]
    SubtitleParsing { line: usize, reason: String },

    #[error("GStreamer initialization error: {0}")]
    Init(String),

    #[error("GStreamer element error: {0}")]
    Element(String),

    #[error("GStreamer state error: {0}")]
    State(String),

    #[error("GStreamer seek error: {0}")]
    Seek(String),

    #[error("GStreamer pipeline error: {0}")]
    Pipeline(String),

    #[error("Logger initialization error: {0}")]
    Logger(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("ZBus error: {0}")]
    ZBus(String),
}

impl From<io::Error> for App {
    fn from(error: io::Error) -> Self {
        App::Io(error.to_string())
    }
}

impl From<toml::de::Error> for App {
    fn from(error: toml::de::Error) -> Self {
        App::TomlParsing(error.to_string())
    }
}

impl From<FlexiLoggerError> for App {
    fn from(error: FlexiLoggerError) -> Self {
        App::Logger(error.to_string())
    }
}

impl From<glib::Error> for App {
    fn from(error: glib::Error) -> Self {
        App::Init(error.to_string())
    }
}

impl From<ZbusError> for App {
    fn from(error: ZbusError) -> Self {
        App::ZBus(error.to_string())
    }
}
