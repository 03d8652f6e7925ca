use crate::prelude::*;
use crate::owl::Handler;

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::error::RecvError;

#[derive(Clone, Debug)]
pub enum ChannelData {
    Message(SocketAddr, Box<Message>),
    Shutdown,
}

/// Handler that queues every decoded message for the [`DatalogWriter`] task.
#[derive(Clone, Debug)]
pub struct Datalog {
    channels: Channels,
}

impl Datalog {
    pub fn new(channels: Channels) -> Self {
        Self { channels }
    }
}

impl Handler for Datalog {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()> {
        self.channels
            .to_datalog
            .send(ChannelData::Message(from, Box::new(message)))
            .map_err(|_| anyhow!("datalog writer is not running"))?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct DatalogWriter {
    file: std::fs::File,
    path: String,
    messages_written: u64,
    receiver: broadcast::Receiver<ChannelData>,
}

impl DatalogWriter {
    pub fn new(path: &str, channels: &Channels) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to open datalog file {}: {}", path, e);
                return Err(e.into());
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
                error!("Failed to set permissions on datalog file {}: {}", path, e);
                return Err(e.into());
            }
        }

        Ok(Self {
            file,
            path: path.to_string(),
            messages_written: 0,
            receiver: channels.to_datalog.subscribe(),
        })
    }

    pub async fn start(mut self) -> Result<()> {
        loop {
            match self.receiver.recv().await {
                Ok(ChannelData::Message(from, message)) => {
                    if let Err(e) = self.write_message(from, &message) {
                        error!("Failed to write to datalog file {}: {:#}", self.path, e);
                    }
                }
                Ok(ChannelData::Shutdown) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("datalog writer fell behind, {} messages dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!(
            "datalog writer exiting, {} messages stored in {}",
            self.messages_written, self.path
        );

        Ok(())
    }

    pub fn write_message(&mut self, from: SocketAddr, message: &Message) -> Result<()> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let mut json_data = match serde_json::to_value(message)? {
            serde_json::Value::Object(map) => map,
            other => bail!("unexpected JSON for message: {}", other),
        };
        json_data.insert(
            "utc_timestamp".to_string(),
            serde_json::Value::Number(timestamp.into()),
        );
        json_data.insert(
            "source".to_string(),
            serde_json::Value::String(from.to_string()),
        );

        let json_string = serde_json::to_string(&json_data)?;

        writeln!(self.file, "{}", json_string)?;
        self.file.flush()?;

        self.messages_written += 1;
        trace!("Total messages stored in datalog file: {}", self.messages_written);

        Ok(())
    }
}
