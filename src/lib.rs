// Module declarations for the application's core components
pub mod channels;       // Queues between handlers and I/O tasks
pub mod config;         // Configuration management
pub mod datalog_writer; // JSON-lines log of decoded messages
pub mod error;          // Decode error taxonomy
pub mod forwarder;      // Source-filtered electricity forwarder
pub mod options;        // Command line options parsing
pub mod owl;            // OWL Intuition protocol: decoder and listener
pub mod prelude;        // Common imports and types
pub mod rrd;            // rrdtool writer task

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::datalog_writer::{Datalog, DatalogWriter};
use crate::forwarder::Forwarder;
use crate::owl::{Handler, Listener, Printer};
use crate::rrd::{Rrd, RrdSink};
use tokio::task::JoinHandle;

/// Background tasks owned by the application, stopped in order on shutdown.
pub struct Components {
    pub channels: Channels,
    pub rrd: Option<JoinHandle<()>>,
    pub datalog_writer: Option<JoinHandle<()>>,
}

impl Components {
    pub fn new(channels: Channels) -> Self {
        Self {
            channels,
            rrd: None,
            datalog_writer: None,
        }
    }

    /// Tell every writer to drain and exit, then wait for them.
    pub async fn stop(&mut self) {
        info!("Stopping all components...");

        if let Some(handle) = self.rrd.take() {
            let _ = self.channels.to_rrd.send(rrd::ChannelData::Shutdown);
            if let Err(e) = handle.await {
                error!("Error waiting for rrd task: {}", e);
            }
        }

        if let Some(handle) = self.datalog_writer.take() {
            let _ = self
                .channels
                .to_datalog
                .send(datalog_writer::ChannelData::Shutdown);
            if let Err(e) = handle.await {
                error!("Error waiting for datalog task: {}", e);
            }
        }

        info!("Shutdown complete");
    }
}

/// Initialise env_logger; `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
    {
        eprintln!("Failed to initialise logging: {}", e);
    }
}

/// Main application entry point
///
/// Starts the writer tasks the config asks for, builds the handler chain and
/// listens until `shutdown_rx` fires or the transport dies.
pub async fn app(shutdown_rx: broadcast::Receiver<()>, config: ConfigWrapper) -> Result<()> {
    info!("owl-bridge {} starting", CARGO_PKG_VERSION);

    let channels = Channels::new();
    let mut components = Components::new(channels.clone());
    let mut handlers: Vec<Box<dyn Handler>> = vec![Box::new(Printer)];

    if let Some(forwarder) = config.enabled_forwarder() {
        info!("  Creating rrd writer...");
        let rrd = Rrd::new(forwarder.clone(), &channels);
        components.rrd = Some(tokio::spawn(async move {
            if let Err(e) = rrd.start().await {
                error!("rrd task failed: {}", e);
            }
        }));

        handlers.push(Box::new(Forwarder::new(
            forwarder.source(),
            RrdSink::new(channels.clone()),
        )));
    }

    if let Some(path) = config.datalog_file() {
        info!("  Creating datalog writer...");
        let writer = match DatalogWriter::new(&path, &channels) {
            Ok(writer) => writer,
            Err(e) => {
                components.stop().await;
                return Err(e.context(format!("opening datalog file {}", path)));
            }
        };
        components.datalog_writer = Some(tokio::spawn(async move {
            if let Err(e) = writer.start().await {
                error!("datalog task failed: {}", e);
            }
        }));

        handlers.push(Box::new(Datalog::new(channels.clone())));
    }

    let mut listener = Listener::new(config.listener(), handlers);
    let result = listener.start(shutdown_rx).await;

    if let Err(e) = &result {
        error!("listener stopped: {:#}", e);
    }
    listener.stats().print_summary();

    components.stop().await;

    result
}

/// Application entry point
///
/// Installs the Ctrl-C handler and optional runtime limit, then runs [`app`].
pub async fn run(config: Config, runtime: Option<u64>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let config = ConfigWrapper::from_config(config);

    // Set up signal handlers for graceful shutdown
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    if let Some(secs) = runtime {
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            info!("Runtime limit of {}s reached", secs);
            let _ = shutdown_tx_clone.send(());
        });
    }

    app(shutdown_rx, config).await
}
