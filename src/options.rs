use clap::Parser;
use std::net::IpAddr;

/// OWL Bridge - receives OWL Intuition multicast telemetry
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Network interface (name or IPv4 address) to receive data on
    #[clap(short = 'i', long = "iface")]
    pub iface: Option<String>,

    /// Source address to accept data from. This is the IP of your OWL Intuition
    #[clap(short = 's', long = "src")]
    pub source: Option<IpAddr>,

    /// RRD file to write electricity readings to
    #[clap(short = 'r', long = "rrd")]
    pub rrd_path: Option<String>,

    /// File to append every decoded message to, as JSON lines
    #[clap(short = 'd', long = "datalog")]
    pub datalog_file: Option<String>,

    /// Optional runtime limit in seconds
    #[clap(short = 't', long = "time")]
    pub runtime: Option<u64>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
