use serde_json::Error as JsonError;
use std::io::Error as IoError;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed")]
    Io(#[from] IoError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("JSON serialization error")]
    Json(#[from] JsonError),
    #[error("Zbus error")]
    Zbus(#[from] ZbusError),
}
