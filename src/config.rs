use crate::prelude::*;
use crate::owl::listener::{MCAST_ADDR, MCAST_PORT};

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,

    pub forwarder: Option<Forwarder>,

    /// Optional path to write every decoded message to, one JSON object per line
    pub datalog_file: Option<String>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: Listener::default(),
            forwarder: None,
            datalog_file: None,
            loglevel: Self::default_loglevel(),
        }
    }
}

// {{{ Listener
#[derive(Clone, Debug, Deserialize)]
pub struct Listener {
    /// Interface name (eth0) or IPv4 address to join the group on
    pub interface: Option<String>,

    #[serde(default = "Config::default_group")]
    pub group: Ipv4Addr,

    #[serde(default = "Config::default_port")]
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            interface: None,
            group: Config::default_group(),
            port: Config::default_port(),
        }
    }
}

impl Listener {
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn group(&self) -> Ipv4Addr {
        self.group
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
// }}}

// {{{ Forwarder
#[derive(Clone, Debug, Deserialize)]
pub struct Forwarder {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    /// Only accept datagrams from this address (the OWL gateway)
    pub source: Option<IpAddr>,

    pub rrd_path: String,

    #[serde(default = "Config::default_rrdtool")]
    pub rrdtool: String,
}

impl Forwarder {
    pub fn new(rrd_path: String) -> Self {
        Self {
            enabled: Config::default_enabled(),
            source: None,
            rrd_path,
            rrdtool: Config::default_rrdtool(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn source(&self) -> Option<IpAddr> {
        self.source
    }

    pub fn rrd_path(&self) -> &str {
        &self.rrd_path
    }

    pub fn rrdtool(&self) -> &str {
        &self.rrdtool
    }
}
// }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn listener(&self) -> Listener {
        self.lock().listener.clone()
    }

    pub fn forwarder(&self) -> Option<Forwarder> {
        self.lock().forwarder.clone()
    }

    pub fn enabled_forwarder(&self) -> Option<Forwarder> {
        self.forwarder().filter(|f| f.enabled())
    }

    pub fn datalog_file(&self) -> Option<String> {
        self.lock().datalog_file.clone()
    }
}

impl Config {
    pub fn new(file: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file (if any) with command line flags applied on top.
    pub fn from_options(options: &Options) -> Result<Self> {
        let mut config = match &options.config_file {
            Some(file) => Self::new(file)?,
            None => Self::default(),
        };

        config.apply_options(options)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_options(&mut self, options: &Options) -> Result<()> {
        if let Some(iface) = &options.iface {
            self.listener.interface = Some(iface.clone());
        }

        if let Some(rrd_path) = &options.rrd_path {
            match &mut self.forwarder {
                Some(forwarder) => forwarder.rrd_path = rrd_path.clone(),
                None => self.forwarder = Some(Forwarder::new(rrd_path.clone())),
            }
        }

        if let Some(source) = options.source {
            match &mut self.forwarder {
                Some(forwarder) => forwarder.source = Some(source),
                None => bail!("--src needs --rrd or a forwarder section in the config file"),
            }
        }

        if let Some(datalog) = &options.datalog_file {
            self.datalog_file = Some(datalog.clone());
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.listener.port == 0 {
            bail!("listener.port must be between 1 and 65535");
        }
        if !self.listener.group.is_multicast() {
            return Err(anyhow!(
                "config.rs:listener.group {} is not a multicast address",
                self.listener.group
            ));
        }

        if let Some(forwarder) = &self.forwarder {
            if forwarder.enabled {
                if forwarder.rrd_path.is_empty() {
                    return Err(anyhow!("config.rs:forwarder.rrd_path cannot be empty"));
                }
                if forwarder.rrdtool.is_empty() {
                    return Err(anyhow!("config.rs:forwarder.rrdtool cannot be empty"));
                }
            }
        }

        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Listener:");
        info!("    Interface: {}", self.listener.interface().unwrap_or("any"));
        info!("    Group: {}:{}", self.listener.group, self.listener.port);

        match &self.forwarder {
            Some(forwarder) => {
                info!("  Forwarder: {}", if forwarder.enabled { "enabled" } else { "disabled" });
                info!(
                    "    Source: {}",
                    forwarder.source.map(|s| s.to_string()).unwrap_or_else(|| "any".to_string())
                );
                info!("    RRD: {}", forwarder.rrd_path);
                info!("    rrdtool: {}", forwarder.rrdtool);
            }
            None => info!("  Forwarder: disabled"),
        }

        info!("  Datalog: {}", self.datalog_file.as_deref().unwrap_or("disabled"));
        info!("  Log Level: {}", self.loglevel);
    }

    fn default_group() -> Ipv4Addr {
        MCAST_ADDR
    }

    fn default_port() -> u16 {
        MCAST_PORT
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_rrdtool() -> String {
        "rrdtool".to_string()
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
