use crate::prelude::*;
use crate::{datalog_writer, rrd};

/// Queues between the (non-blocking) message handlers and the tasks that do
/// the slow I/O.
#[derive(Debug, Clone)]
pub struct Channels {
    pub to_rrd: broadcast::Sender<rrd::ChannelData>,
    pub to_datalog: broadcast::Sender<datalog_writer::ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_rrd: Self::channel(),
            to_datalog: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
