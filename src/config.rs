//! Node configuration.
//!
//! Every flag can also be given through the matching `CACHE_*` environment
//! variable.

use anyhow::{Result, bail};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::membership::types::NodeIdentity;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Replicated consistent-hashing cache node", long_about = None)]
pub struct NodeConfig {
    /// Node id. Defaults to `host:port`.
    #[arg(long, env = "CACHE_NODE_ID")]
    pub node_id: Option<String>,

    /// Host other nodes use to reach this one.
    #[arg(long, env = "CACHE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on and advertise.
    #[arg(long, env = "CACHE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// IP to bind the HTTP listener to.
    #[arg(long, env = "CACHE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Static cluster member as `id@host:port` (repeatable).
    #[arg(long = "peer", env = "CACHE_PEERS", value_delimiter = ',')]
    pub peers: Vec<NodeIdentity>,

    /// HTTP registry returning the member list as JSON. Takes precedence over `--peer`.
    #[arg(long, env = "CACHE_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Maximum number of entries in the local store.
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = 100)]
    pub capacity: usize,

    /// Ring positions per physical node.
    #[arg(long, env = "CACHE_VIRTUAL_NODES", default_value_t = 16)]
    pub virtual_nodes: usize,

    /// Copies placed per write, primary included.
    #[arg(long, env = "CACHE_REPLICATION", default_value_t = 2)]
    pub replication: usize,

    /// Seconds between ring rebuilds.
    #[arg(long, env = "CACHE_REFRESH_INTERVAL_SECS", default_value_t = 60)]
    pub refresh_interval_secs: u64,

    /// Timeout of a single peer call, in milliseconds.
    #[arg(long, env = "CACHE_PEER_TIMEOUT_MS", default_value_t = 2000)]
    pub peer_timeout_ms: u64,

    /// Attempts per peer call (1 disables retries).
    #[arg(long, env = "CACHE_PEER_ATTEMPTS", default_value_t = 1)]
    pub peer_attempts: usize,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            bail!("--capacity must be at least 1");
        }
        if self.virtual_nodes == 0 {
            bail!("--virtual-nodes must be at least 1");
        }
        if self.replication == 0 {
            bail!("--replication must be at least 1");
        }
        if self.refresh_interval_secs == 0 {
            bail!("--refresh-interval-secs must be at least 1");
        }
        if self.peer_attempts == 0 {
            bail!("--peer-attempts must be at least 1");
        }
        Ok(())
    }

    pub fn local_identity(&self) -> NodeIdentity {
        match &self.node_id {
            Some(id) => NodeIdentity::new(id.clone(), self.host.clone(), self.port),
            None => NodeIdentity::from_address(self.host.clone(), self.port),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
            .ok_or_else(|| anyhow::anyhow!("--capacity must be at least 1"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}
