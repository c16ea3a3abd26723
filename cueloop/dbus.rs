use log::info;
use tokio::sync::{mpsc, oneshot, watch};
use zbus::{fdo, interface, ConnectionBuilder};

use crate::error::App;
use crate::player::Command;

pub const BUS_NAME: &str = "org.cueloop.Looper";
pub const OBJECT_PATH: &str = "/org/cueloop/Looper";

#[derive(Clone)]
pub struct LooperDBus {
    tx: mpsc::Sender<Command>,
    stop_signal: watch::Sender<()>,
}

#[interface(name = "org.cueloop.Looper")]
impl LooperDBus {
    async fn test_connection(&self) -> fdo::Result<()> {
        Ok(())
    }

    async fn play(&self) -> fdo::Result<()> {
        self.send(Command::Play).await
    }

    async fn pause(&self) -> fdo::Result<()> {
        self.send(Command::Pause).await
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.send(Command::Stop).await?;
        self.stop_signal
            .send(())
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    /// Position, loop start and loop end in seconds. An unknown end is -1.
    async fn status(&self) -> fdo::Result<(f64, f64, f64)> {
        let (reply, status) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        let status = status
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        Ok((status.position, status.start, status.end.unwrap_or(-1.0)))
    }

    async fn caption_log(&self) -> fdo::Result<Vec<String>> {
        let (reply, lines) = oneshot::channel();
        self.send(Command::CaptionLog(reply)).await?;
        lines.await.map_err(|e| fdo::Error::Failed(e.to_string()))
    }
}

impl LooperDBus {
    async fn send(&self, command: Command) -> fdo::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }
}

pub async fn run_dbus_server(
    command_sender: mpsc::Sender<Command>,
    stop_signal: watch::Sender<()>,
) -> Result<(), App> {
    let looper_dbus = LooperDBus {
        tx: command_sender,
        stop_signal: stop_signal.clone(),
    };

    let _connection = ConnectionBuilder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, looper_dbus)?
        .build()
        .await?;

    let mut stop_receiver = stop_signal.subscribe();

    // Wait for the stop signal
    tokio::select! {
        _ = stop_receiver.changed() => {
            info!("Stop signal received, shutting down DBus server...");
        }
    }

    Ok(())
}
