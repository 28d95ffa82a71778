use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity of one physical cache node.
///
/// `address()` (`host:port`) is both the ring payload seed and the transport
/// target. Equality covers all three fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl NodeIdentity {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
        }
    }

    /// Identity whose id is its own `host:port`. Nodes configured without an
    /// explicit id use this, so every peer list names them the same way.
    pub fn from_address(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self::new(format!("{}:{}", host, port), host, port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Same physical node listed under a different id.
    pub fn is_alias_of(&self, other: &NodeIdentity) -> bool {
        self.id != other.id && self.host == other.host && self.port == other.port
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.host, self.port)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("expected `id@host:port` or `host:port`, got '{0}'")]
    Malformed(String),
    #[error("invalid port in '{0}'")]
    InvalidPort(String),
}

/// Parses `id@host:port`. A bare `host:port` uses the address as the id.
impl FromStr for NodeIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (id, address) = match s.split_once('@') {
            Some((id, address)) => (Some(id), address),
            None => (None, s),
        };

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| IdentityParseError::Malformed(s.to_string()))?;

        if host.is_empty() || id.is_some_and(str::is_empty) {
            return Err(IdentityParseError::Malformed(s.to_string()));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| IdentityParseError::InvalidPort(s.to_string()))?;

        Ok(match id {
            Some(id) => Self::new(id, host, port),
            None => Self::from_address(host, port),
        })
    }
}
