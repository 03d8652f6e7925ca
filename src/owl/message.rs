use crate::error::DecodeError;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Fields every OWL message carries, whatever its kind.
///
/// `mac` comes from the payload, not from the packet, so it is whatever the
/// sender claims to be. Compare against the transport address if that matters.
pub trait SensorMessage {
    fn mac(&self) -> &str;
    fn rssi(&self) -> Decimal;
    fn lqi(&self) -> Decimal;
}

// {{{ Signal
/// Quality of the sensor's 433MHz link as reported in `<signal>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Signal {
    /// dBm, usually negative
    pub rssi: Decimal,
    /// lower is better
    pub lqi: Decimal,
}
// }}}

// {{{ Channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Channel {
    channel_id: String,
    current_w: Decimal,
    daily_wh: Decimal,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, current_w: Decimal, daily_wh: Decimal) -> Self {
        Self {
            channel_id: channel_id.into(),
            current_w,
            daily_wh,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn current_w(&self) -> Decimal {
        self.current_w
    }

    pub fn daily_wh(&self) -> Decimal {
        self.daily_wh
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Channel: id={}, current={}W, today={}Wh>",
            self.channel_id, self.current_w, self.daily_wh
        )
    }
}
// }}}

// {{{ Zone
/// One heating zone. Temperatures are in whatever unit the controller uses
/// (degrees Celsius in practice); nothing in the payload says so.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Zone {
    zone_id: String,
    current_temp: Decimal,
    required_temp: Decimal,
}

impl Zone {
    pub fn new(zone_id: impl Into<String>, current_temp: Decimal, required_temp: Decimal) -> Self {
        Self {
            zone_id: zone_id.into(),
            current_temp,
            required_temp,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn current_temp(&self) -> Decimal {
        self.current_temp
    }

    pub fn required_temp(&self) -> Decimal {
        self.required_temp
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Zone: id={}, current={}, required={}>",
            self.zone_id, self.current_temp, self.required_temp
        )
    }
}
// }}}

// {{{ Electricity
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Electricity {
    mac: String,
    #[serde(flatten)]
    signal: Signal,
    battery_pc: Decimal,
    channels: IndexMap<String, Channel>,
}

impl Electricity {
    /// Fails if two channels share an id; channels keep the order given.
    pub fn new(
        mac: impl Into<String>,
        signal: Signal,
        battery_pc: Decimal,
        channels: impl IntoIterator<Item = Channel>,
    ) -> Result<Self, DecodeError> {
        let mut map = IndexMap::new();
        for channel in channels {
            if map.contains_key(channel.channel_id()) {
                return Err(DecodeError::validation(format!(
                    "duplicate channel id {:?}",
                    channel.channel_id()
                )));
            }
            map.insert(channel.channel_id().to_string(), channel);
        }

        Ok(Self {
            mac: mac.into(),
            signal,
            battery_pc,
            channels: map,
        })
    }

    pub fn battery_pc(&self) -> Decimal {
        self.battery_pc
    }

    /// Channels in the order they appeared in the datagram.
    pub fn channels(&self) -> &IndexMap<String, Channel> {
        &self.channels
    }

    pub fn channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.get(channel_id)
    }
}

impl SensorMessage for Electricity {
    fn mac(&self) -> &str {
        &self.mac
    }

    fn rssi(&self) -> Decimal {
        self.signal.rssi
    }

    fn lqi(&self) -> Decimal {
        self.signal.lqi
    }
}

impl fmt::Display for Electricity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Electricity: mac={}, rssi={}, lqi={}, battery={}%, channels=",
            self.mac, self.signal.rssi, self.signal.lqi, self.battery_pc
        )?;
        for (i, channel) in self.channels.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", channel)?;
        }
        f.write_str(">")
    }
}
// }}}

// {{{ Heating
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Heating {
    mac: String,
    #[serde(flatten)]
    signal: Signal,
    battery_mv: Decimal,
    zones: IndexMap<String, Zone>,
}

impl Heating {
    /// Fails if two zones share an id.
    pub fn new(
        mac: impl Into<String>,
        signal: Signal,
        battery_mv: Decimal,
        zones: impl IntoIterator<Item = Zone>,
    ) -> Result<Self, DecodeError> {
        let mut map = IndexMap::new();
        for zone in zones {
            if map.contains_key(zone.zone_id()) {
                return Err(DecodeError::validation(format!(
                    "duplicate zone id {:?}",
                    zone.zone_id()
                )));
            }
            map.insert(zone.zone_id().to_string(), zone);
        }

        Ok(Self {
            mac: mac.into(),
            signal,
            battery_mv,
            zones: map,
        })
    }

    pub fn battery_mv(&self) -> Decimal {
        self.battery_mv
    }

    pub fn zones(&self) -> &IndexMap<String, Zone> {
        &self.zones
    }

    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.get(zone_id)
    }
}

impl SensorMessage for Heating {
    fn mac(&self) -> &str {
        &self.mac
    }

    fn rssi(&self) -> Decimal {
        self.signal.rssi
    }

    fn lqi(&self) -> Decimal {
        self.signal.lqi
    }
}

impl fmt::Display for Heating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Heating: mac={}, rssi={}, lqi={}, battery={}mV, zones=",
            self.mac, self.signal.rssi, self.signal.lqi, self.battery_mv
        )?;
        for (i, zone) in self.zones.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", zone)?;
        }
        f.write_str(">")
    }
}
// }}}

// {{{ Message
/// A decoded datagram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Electricity(Electricity),
    Heating(Heating),
}

impl Message {
    /// Root tag the message was decoded from.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Electricity(_) => "electricity",
            Message::Heating(_) => "heating",
        }
    }

    fn sensor(&self) -> &dyn SensorMessage {
        match self {
            Message::Electricity(m) => m,
            Message::Heating(m) => m,
        }
    }
}

impl SensorMessage for Message {
    fn mac(&self) -> &str {
        self.sensor().mac()
    }

    fn rssi(&self) -> Decimal {
        self.sensor().rssi()
    }

    fn lqi(&self) -> Decimal {
        self.sensor().lqi()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Electricity(m) => write!(f, "{}", m),
            Message::Heating(m) => write!(f, "{}", m),
        }
    }
}
// }}}
