//! MCP transport selection.
//!
//! The server speaks MCP over one of two transports:
//!
//! - **Stdio**: default, for agents that spawn the server as a subprocess
//! - **HTTP**: streamable HTTP (with SSE responses) mounted at `/mcp`
//!
//! `--transport sse` is accepted as an alias for HTTP, since the streamable
//! HTTP transport already streams responses as server-sent events.
//!
//! # Example
//!
//! ```ignore
//! use video_edit_mcp_common::transport::TransportArgs;
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     transport: TransportArgs,
//! }
//!
//! let transport = Args::parse().transport.into_transport();
//! ```

use clap::{Args, ValueEnum};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default mount path of the streamable HTTP service.
pub const DEFAULT_HTTP_PATH: &str = "/mcp";

/// Transport for MCP server communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Standard input/output transport.
    #[default]
    Stdio,
    /// Streamable HTTP transport bound to a socket address.
    Http {
        /// Address to listen on
        addr: SocketAddr,
    },
}

impl Transport {
    /// Stdio transport.
    pub fn stdio() -> Self {
        Transport::Stdio
    }

    /// HTTP transport on all interfaces at `port`.
    pub fn http(port: u16) -> Self {
        Transport::Http {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }

    /// Check if this is a stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Transport::Stdio)
    }

    /// Check if this is an HTTP transport.
    pub fn is_http(&self) -> bool {
        matches!(self, Transport::Http { .. })
    }

    /// The listening port for network transports.
    pub fn port(&self) -> Option<u16> {
        match self {
            Transport::Stdio => None,
            Transport::Http { addr } => Some(addr.port()),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http { addr } => write!(f, "http ({})", addr),
        }
    }
}

/// Transport mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    #[default]
    Stdio,
    #[value(alias = "sse")]
    Http,
}

/// Command-line arguments for transport configuration.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Transport mode: stdio or http (sse is an alias for http)
    #[arg(long, value_enum, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,

    /// Interface to bind for the HTTP transport
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port for the HTTP transport (default: 8080, or from PORT env var)
    #[arg(long, env = "PORT", default_value_t = crate::config::DEFAULT_PORT)]
    pub port: u16,
}

impl TransportArgs {
    /// Convert command-line arguments into a Transport.
    pub fn into_transport(self) -> Transport {
        match self.transport {
            TransportMode::Stdio => Transport::Stdio,
            TransportMode::Http => Transport::Http {
                addr: SocketAddr::new(self.host, self.port),
            },
        }
    }
}

impl Default for TransportArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: crate::config::DEFAULT_PORT,
        }
    }
}
