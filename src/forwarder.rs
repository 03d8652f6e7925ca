use crate::prelude::*;
use crate::owl::{Electricity, Handler};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Destination for update records. Must not block.
///
/// An `Err` only means the record could not be accepted. Implementations that
/// queue the record for another task, such as [`crate::rrd::RrdSink`], return
/// `Ok` once it is queued; a later write failure is logged and counted by that
/// task and never comes back through here.
pub trait Sink: Send {
    fn update(&mut self, record: &UpdateRecord) -> Result<()>;
}

/// One rrdtool update: `N:<ch0 current>:<ch0 day>:<ch1 current>:...`.
///
/// Channels are ordered by id because the RRD's data sources are positional
/// and fixed when the file is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRecord {
    values: Vec<i64>,
}

impl UpdateRecord {
    pub fn new(values: Vec<i64>) -> Self {
        Self { values }
    }

    pub fn from_electricity(message: &Electricity) -> Result<Self> {
        if message.channels().is_empty() {
            bail!("electricity message has no channels");
        }

        let mut channels: Vec<_> = message.channels().values().collect();
        channels.sort_by(|a, b| a.channel_id().cmp(b.channel_id()));

        let mut values = Vec::with_capacity(channels.len() * 2);
        for channel in channels {
            values.push(integral(channel.current_w())?);
            values.push(integral(channel.daily_wh())?);
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

impl fmt::Display for UpdateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("N")?;
        for value in &self.values {
            write!(f, ":{}", value)?;
        }
        Ok(())
    }
}

/// Round half to even, so 2.5 -> 2 and 3.5 -> 4. Every value written to the
/// sink goes through here.
pub fn integral(value: Decimal) -> Result<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or_else(|| anyhow!("{} does not fit in an integer", value))
}

/// Writes electricity readings from one OWL gateway to a [`Sink`].
pub struct Forwarder<S> {
    source: Option<IpAddr>,
    sink: S,
}

impl<S: Sink> Forwarder<S> {
    pub fn new(source: Option<IpAddr>, sink: S) -> Self {
        match source {
            Some(source) => info!("forwarding electricity readings from {}", source),
            None => warn!("no source address configured, forwarding readings from any sender"),
        }

        Self { source, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: Sink> Handler for Forwarder<S> {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()> {
        if let Some(source) = self.source {
            if from.ip() != source {
                bail!("dropping message from {}, expected source {}", from.ip(), source);
            }
        }

        let electricity = match message {
            Message::Electricity(electricity) => electricity,
            other => {
                debug!("{}: not forwarding {} message", from, other.kind());
                return Ok(());
            }
        };

        let record = UpdateRecord::from_electricity(&electricity)?;
        trace!("{}: update {}", from, record);

        self.sink
            .update(&record)
            .with_context(|| format!("writing update {}", record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(integral(Decimal::new(25, 1)).unwrap(), 2);
        assert_eq!(integral(Decimal::new(35, 1)).unwrap(), 4);
        assert_eq!(integral(Decimal::new(1713, 2)).unwrap(), 17);
        assert_eq!(integral(Decimal::new(25700, 2)).unwrap(), 257);
        assert_eq!(integral(Decimal::new(2551, 2)).unwrap(), 26);
        assert_eq!(integral(Decimal::new(-5, 1)).unwrap(), 0);
        assert_eq!(integral(Decimal::new(-15, 1)).unwrap(), -2);
    }

    #[test]
    fn too_big_for_integer() {
        assert!(integral(Decimal::MAX).is_err());
    }
}
