//! Command-line interface
//!
//! Argument parsing for the node binary.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "emberchain", about = "Minimal proof-of-work cryptocurrency node")]
pub struct Opt {
    #[arg(long = "tcp-port", help = "TCP port for peer connections")]
    pub tcp_port: Option<u16>,

    #[arg(
        long = "peer",
        value_name = "IP:PORT",
        help = "Seed peer endpoint, may be given multiple times"
    )]
    pub peers: Vec<String>,
}
