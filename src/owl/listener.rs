use crate::prelude::*;
use crate::owl::decoder::parse_datagram;

use {
    async_trait::async_trait,
    net2::UdpBuilder,
    std::io,
    std::net::{IpAddr, Ipv4Addr, SocketAddr},
    tokio::net::UdpSocket,
};

/// Group the OWL Network gateway broadcasts to.
pub const MCAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 192, 32, 19);
pub const MCAST_PORT: u16 = 22600;

const MAX_DATAGRAM_SIZE: usize = 65536;

// {{{ Handler
/// Consumer of decoded messages.
///
/// Called once per decoded datagram, in arrival order, never concurrently.
/// Implementations must not block: anything slow belongs on a channel to a
/// separate task.
pub trait Handler: Send {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()>;

    /// Observer hook for datagrams that did not decode. The listener has
    /// already logged the failure.
    fn decode_failed(&mut self, _from: SocketAddr, _error: &DecodeError) {}
}

impl Handler for Vec<Box<dyn Handler>> {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()> {
        let failures: Vec<String> = self
            .iter_mut()
            .filter_map(|handler| handler.owl_received(from, message.clone()).err())
            .map(|err| format!("{:#}", err))
            .collect();

        if !failures.is_empty() {
            bail!("{}", failures.join("; "));
        }

        Ok(())
    }

    fn decode_failed(&mut self, from: SocketAddr, error: &DecodeError) {
        for handler in self.iter_mut() {
            handler.decode_failed(from, error);
        }
    }
}

/// Logs every message, which is all the reference receiver ever did with them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Printer;

impl Handler for Printer {
    fn owl_received(&mut self, from: SocketAddr, message: Message) -> Result<()> {
        info!("{}: {}", from, message);
        Ok(())
    }
}
// }}}

// {{{ Transport
/// Source of raw datagrams.
#[async_trait]
pub trait Transport: Send {
    /// Next datagram and its sender. An error here ends the listener.
    async fn recv(&mut self) -> io::Result<(Vec<u8>, SocketAddr)>;

    /// Leave the multicast group.
    fn leave(&mut self) -> Result<()>;
}

pub struct MulticastSocket {
    socket: UdpSocket,
    group: Ipv4Addr,
    interface: Ipv4Addr,
    buf: Vec<u8>,
}

impl MulticastSocket {
    /// Bind the group port with address reuse, so other receivers on this host
    /// keep working, and join `group` on `interface`.
    pub fn join(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> Result<Self> {
        let builder = UdpBuilder::new_v4()?;
        builder.reuse_address(true)?;
        #[cfg(unix)]
        {
            use net2::unix::UnixUdpBuilderExt;
            builder.reuse_port(true)?;
        }

        let socket = builder
            .bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("binding UDP port {}", port))?;
        socket
            .join_multicast_v4(&group, &interface)
            .with_context(|| format!("joining {} on {}", group, interface))?;
        socket.set_nonblocking(true)?;

        info!("joined multicast group {}:{} on {}", group, port, interface);

        Ok(Self {
            socket: UdpSocket::from_std(socket)?,
            group,
            interface,
            buf: vec![0; MAX_DATAGRAM_SIZE],
        })
    }
}

#[async_trait]
impl Transport for MulticastSocket {
    async fn recv(&mut self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let (len, from) = self.socket.recv_from(&mut self.buf).await?;
        Ok((self.buf[..len].to_vec(), from))
    }

    fn leave(&mut self) -> Result<()> {
        self.socket
            .leave_multicast_v4(self.group, self.interface)
            .with_context(|| format!("leaving {} on {}", self.group, self.interface))?;
        info!("left multicast group {}", self.group);
        Ok(())
    }
}

/// Accepts an IPv4 address or an interface name; nothing means any interface.
pub fn resolve_interface(interface: Option<&str>) -> Result<Ipv4Addr> {
    let name = match interface {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(Ipv4Addr::UNSPECIFIED),
    };

    if let Ok(addr) = name.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    local_ip_address::list_afinet_netifas()
        .context("listing network interfaces")?
        .into_iter()
        .find_map(|(iface, ip)| match ip {
            IpAddr::V4(addr) if iface == name => Some(addr),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no IPv4 address on interface {}", name))
}
// }}}

// {{{ Listener
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
    /// Shut down or lost its transport. Only an explicit restart leaves this.
    Stopped,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ListenerStats {
    pub datagrams_received: u64,
    pub messages_decoded: u64,
    pub unsupported: u64,
    pub parse_errors: u64,
    pub validation_errors: u64,
    pub handler_errors: u64,
}

impl ListenerStats {
    pub fn print_summary(&self) {
        info!("Listener Statistics:");
        info!("  Datagrams received: {}", self.datagrams_received);
        info!("  Messages decoded: {}", self.messages_decoded);
        info!("  Dropped:");
        info!("    Unsupported message types: {}", self.unsupported);
        info!("    Malformed XML: {}", self.parse_errors);
        info!("    Failed validation: {}", self.validation_errors);
        info!("  Handler errors: {}", self.handler_errors);
    }
}

pub struct Listener<H> {
    config: config::Listener,
    handler: H,
    state: ListenerState,
    stats: ListenerStats,
}

impl<H: Handler> Listener<H> {
    pub fn new(config: config::Listener, handler: H) -> Self {
        Self {
            config,
            handler,
            state: ListenerState::Idle,
            stats: ListenerStats::default(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Decode one datagram and hand the result to the handler.
    ///
    /// Never fails: a bad datagram is logged, counted and dropped.
    pub fn on_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        self.stats.datagrams_received += 1;

        let message = match parse_datagram(datagram) {
            Ok(message) => message,
            Err(err) => {
                match &err {
                    DecodeError::Unsupported(tag) => {
                        self.stats.unsupported += 1;
                        debug!("{}: ignoring <{}> message", from, tag);
                    }
                    DecodeError::Parse(_) => {
                        self.stats.parse_errors += 1;
                        warn!("{}: {}", from, err);
                    }
                    DecodeError::Validation(_) => {
                        self.stats.validation_errors += 1;
                        warn!("{}: {}", from, err);
                    }
                }
                self.handler.decode_failed(from, &err);
                return;
            }
        };

        self.stats.messages_decoded += 1;
        trace!("{}: decoded {} message", from, message.kind());

        if let Err(err) = self.handler.owl_received(from, message) {
            self.stats.handler_errors += 1;
            error!("{}: {:#}", from, err);
        }
    }

    /// Open the multicast socket described by the config and listen on it.
    pub async fn start(&mut self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        if self.state == ListenerState::Listening {
            bail!("listener already running");
        }

        let interface = resolve_interface(self.config.interface())?;
        let transport = MulticastSocket::join(self.config.group(), self.config.port(), interface)?;

        self.listen(transport, shutdown).await
    }

    /// Receive loop. Returns `Ok` after a shutdown signal, or the transport
    /// error that ended it. Either way the listener ends up `Stopped`.
    pub async fn listen<T: Transport>(
        &mut self,
        mut transport: T,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        if self.state == ListenerState::Listening {
            bail!("listener already running");
        }

        self.state = ListenerState::Listening;
        info!("listening for OWL messages");

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("listener received shutdown signal");
                    break transport.leave();
                }
                received = transport.recv() => match received {
                    Ok((datagram, from)) => self.on_datagram(&datagram, from),
                    Err(err) => {
                        error!("transport failed: {}", err);
                        break Err(anyhow!("transport failed: {}", err));
                    }
                }
            }
        };

        self.state = ListenerState::Stopped;
        info!("listener stopped");

        result
    }
}
// }}}
