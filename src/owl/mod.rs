pub mod decoder;
pub mod listener;
pub mod message;
pub mod scalar;

pub use decoder::parse_datagram;
pub use listener::{Handler, Listener, ListenerState, ListenerStats, Printer, Transport};
pub use message::{Channel, Electricity, Heating, Message, SensorMessage, Signal, Zone};
