use crate::prelude::*;
use crate::forwarder::{Sink, UpdateRecord};

use tokio::process::Command;
use tokio::sync::broadcast::error::RecvError;

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ChannelData {
    Update(String),
    Shutdown,
}

/// [`Sink`] half of the rrd writer: queues records for the [`Rrd`] task.
///
/// `update` fails only when no writer is subscribed. rrdtool errors show up in
/// the writer's log and [`RrdStats`], not here.
#[derive(Clone, Debug)]
pub struct RrdSink {
    channels: Channels,
}

impl RrdSink {
    pub fn new(channels: Channels) -> Self {
        Self { channels }
    }
}

impl Sink for RrdSink {
    fn update(&mut self, record: &UpdateRecord) -> Result<()> {
        self.channels
            .to_rrd
            .send(ChannelData::Update(record.to_string()))
            .map_err(|_| anyhow!("rrd writer is not running"))?;
        Ok(())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RrdStats {
    pub updates_written: u64,
    pub update_errors: u64,
}

/// Runs `rrdtool update` for each queued record, one at a time.
///
/// A single writer per RRD file is assumed; nothing here locks the file.
pub struct Rrd {
    config: config::Forwarder,
    receiver: broadcast::Receiver<ChannelData>,
    stats: RrdStats,
}

impl Rrd {
    /// Subscribes immediately so no update sent after this call is missed.
    pub fn new(config: config::Forwarder, channels: &Channels) -> Self {
        Self {
            config,
            receiver: channels.to_rrd.subscribe(),
            stats: RrdStats::default(),
        }
    }

    pub async fn start(mut self) -> Result<RrdStats> {
        use ChannelData::*;

        info!("rrd writer started for {}", self.config.rrd_path());

        loop {
            match self.receiver.recv().await {
                Ok(Update(record)) => match self.update(&record).await {
                    Ok(()) => {
                        self.stats.updates_written += 1;
                        debug!("rrd update {}", record);
                    }
                    Err(err) => {
                        self.stats.update_errors += 1;
                        error!("rrd update {} failed: {:#}", record, err);
                    }
                },
                Ok(Shutdown) => {
                    info!("rrd writer received shutdown signal");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("rrd writer fell behind, {} updates dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }

        info!(
            "rrd writer exiting: {} updates written, {} failed",
            self.stats.updates_written, self.stats.update_errors
        );

        Ok(self.stats)
    }

    async fn update(&self, record: &str) -> Result<()> {
        let output = Command::new(self.config.rrdtool())
            .arg("update")
            .arg(self.config.rrd_path())
            .arg(record)
            .output()
            .await
            .with_context(|| format!("running {}", self.config.rrdtool()))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.config.rrdtool(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}
