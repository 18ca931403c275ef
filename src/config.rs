//! src/config.rs
//!
//! CLI flags (parsed with `clap`) layered over environment overrides and
//! built-in defaults (via `figment`), for both binaries this crate ships:
//! the long-running node and the one-shot admin client.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// CLI flags for the long-running gossiper. Every flag is optional here so
/// that an unset flag can fall through to an environment override or a
/// built-in default instead of clobbering them with a clap default value.
#[derive(Parser, Debug, Default)]
#[command(name = "peerster-node", about = "A gossip-based content dissemination node")]
pub struct NodeCli {
    /// Port for the local admin/UI client.
    #[arg(long = "ui-port")]
    pub ui_port: Option<u16>,

    /// ip:port this node binds for peer-to-peer traffic.
    #[arg(long = "gossip-addr")]
    pub gossip_addr: Option<SocketAddr>,

    /// Unique name for this node.
    #[arg(long)]
    pub name: Option<String>,

    /// Comma-separated list of initial peers, each `ip:port`.
    #[arg(long)]
    pub peers: Option<String>,

    /// Run in simple-broadcast mode (rumor mongering disabled).
    #[arg(long)]
    pub simple: bool,

    /// Route rumor period in seconds; 0 disables route announcements.
    #[arg(long)]
    pub rtimer: Option<u64>,
}

/// Fully resolved node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub ui_port: u16,
    pub gossip_addr: SocketAddr,
    pub name: String,
    pub peers: Vec<SocketAddr>,
    pub simple: bool,
    pub rtimer: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            ui_port: 8080,
            gossip_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5000),
            name: "300358".to_string(),
            peers: Vec::new(),
            simple: false,
            rtimer: 0,
        }
    }
}

impl NodeConfig {
    /// Layers, from lowest to highest priority: built-in defaults,
    /// `config.toml` (if present), `PEERSTER_`-prefixed environment
    /// variables, then any explicitly-provided CLI flag.
    pub fn resolve(cli: NodeCli) -> Result<Self> {
        let mut config: NodeConfig = Figment::new()
            .merge(Serialized::defaults(NodeConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("PEERSTER_"))
            .extract()?;

        if let Some(ui_port) = cli.ui_port {
            config.ui_port = ui_port;
        }
        if let Some(gossip_addr) = cli.gossip_addr {
            config.gossip_addr = gossip_addr;
        }
        if let Some(name) = cli.name {
            config.name = name;
        }
        if let Some(peers) = cli.peers {
            config.peers = parse_peer_list(&peers)?;
        }
        if cli.simple {
            config.simple = true;
        }
        if let Some(rtimer) = cli.rtimer {
            config.rtimer = rtimer;
        }

        Ok(config)
    }
}

fn parse_peer_list(raw: &str) -> Result<Vec<SocketAddr>> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim()
                .parse::<SocketAddr>()
                .map_err(|e| crate::error::Error::InvalidPeerAddr(s.to_string(), e))
        })
        .collect()
}

/// CLI flags for the one-shot admin client.
#[derive(Parser, Debug)]
#[command(name = "peerster-client", about = "Sends one control message to a running node")]
pub struct ClientCli {
    /// Port the target node's admin client socket listens on.
    #[arg(long = "ui-port", default_value_t = 8080)]
    pub ui_port: u16,

    /// Public text to gossip, or the body of a private message.
    #[arg(long = "msg")]
    pub msg: Option<String>,

    /// Destination node name for a private message or a download.
    #[arg(long = "dest")]
    pub dest: Option<String>,

    /// File name: uploads `_SharedFiles/<file>`, or names the download
    /// target when combined with `--request`.
    #[arg(long = "file")]
    pub file: Option<String>,

    /// Hex-encoded metahash to request from `--dest`.
    #[arg(long = "request")]
    pub request: Option<String>,
}
