#![allow(dead_code)]

use owl_bridge::forwarder::{Sink, UpdateRecord};
use owl_bridge::owl::{Handler, Transport};
use owl_bridge::prelude::*;

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory();
impl Factory {
    pub fn electricity_datagram() -> &'static str {
        "\
<electricity id='443719123456'>
  <signal rssi='-42' lqi='15'/>
  <battery level='100%'/>
  <chan id='0'>
\t<curr units='w'>257.00</curr>
\t<day units='wh'>17.13</day>
  </chan>
  <chan id='1'>
\t<curr units='w'>96.00</curr>
\t<day units='wh'>6.40</day>
  </chan>
  <chan id='2'>
\t<curr units='w'>32.00</curr>
\t<day units='wh'>2.13</day>
  </chan>
</electricity>"
    }

    // channels deliberately out of id order
    pub fn electricity_unsorted_datagram() -> &'static str {
        "<electricity id='443719123456'><signal rssi='-42' lqi='15'/><battery level='100%'/>\
         <chan id='1'><curr units='w'>96.50</curr><day units='wh'>6.40</day></chan>\
         <chan id='0'><curr units='w'>257.00</curr><day units='wh'>17.13</day></chan>\
         </electricity>"
    }

    // sample from the vendor's protocol documentation
    pub fn heating_datagram() -> &'static str {
        "\
<heating id='00A0C914C851'>
 <signal rssi='-61' lqi='48'/>
 <battery level='2730mV'/>
 <temperature until='1359183600' zone='0'>
  <current>22.37</current>
  <required>15.00</required>
 </temperature>
</heating>
"
    }

    pub fn weather_datagram() -> &'static str {
        "<weather id='443719123456' code='113'><temperature>12.00</temperature><text>Sunny</text></weather>"
    }

    pub fn owl_address() -> SocketAddr {
        "192.168.1.50:22600".parse().unwrap()
    }

    pub fn foreign_address() -> SocketAddr {
        "192.168.1.99:22600".parse().unwrap()
    }

    pub fn listener_config() -> config::Listener {
        config::Listener::default()
    }
}

/// Handler that keeps everything it is given.
#[derive(Clone, Default)]
pub struct Recorder {
    pub messages: Arc<Mutex<Vec<(SocketAddr, Message)>>>,
    pub failures: Arc<Mutex<Vec<DecodeError>>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<(SocketAddr, Message)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<DecodeError> {
        self.failures.lock().unwrap().clone()
    }
}

impl Handler for Recorder {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()> {
        self.messages.lock().unwrap().push((from, message));
        Ok(())
    }

    fn decode_failed(&mut self, _from: SocketAddr, error: &DecodeError) {
        self.failures.lock().unwrap().push(error.clone());
    }
}

/// Handler that always fails.
pub struct Failing;

impl Handler for Failing {
    fn owl_received(&mut self, _from: SocketAddr, _message: Message) -> Result<()> {
        bail!("handler failure")
    }
}

/// Sink that keeps the rendered records.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub records: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<String> {
        self.records.lock().unwrap().clone()
    }
}

impl Sink for RecordingSink {
    fn update(&mut self, record: &UpdateRecord) -> Result<()> {
        if self.fail {
            bail!("sink unavailable");
        }
        self.records.lock().unwrap().push(record.to_string());
        Ok(())
    }
}

pub type Delivery = io::Result<(Vec<u8>, SocketAddr)>;

/// In-memory transport fed through an mpsc channel.
pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Delivery>,
    pub left: Arc<Mutex<bool>>,
}

impl ChannelTransport {
    pub fn new() -> (mpsc::UnboundedSender<Delivery>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx,
                left: Arc::new(Mutex::new(false)),
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv(&mut self) -> io::Result<(Vec<u8>, SocketAddr)> {
        match self.rx.recv().await {
            Some(delivery) => delivery,
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed")),
        }
    }

    fn leave(&mut self) -> Result<()> {
        *self.left.lock().unwrap() = true;
        Ok(())
    }
}

pub fn datagram(payload: &str, from: SocketAddr) -> Delivery {
    Ok((payload.as_bytes().to_vec(), from))
}
