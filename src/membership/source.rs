//! Membership sources.
//!
//! The ring only ever asks "who is in the cluster right now". How that answer
//! is produced is up to the `MembershipSource` implementation.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use super::types::NodeIdentity;

/// Point-in-time view of the live cluster members.
///
/// `list_members` may fail transiently; callers keep their last good view
/// when it does.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn list_members(&self) -> Result<Vec<NodeIdentity>>;

    async fn active_count(&self) -> Result<usize> {
        Ok(self.list_members().await?.len())
    }

    fn local_identity(&self) -> NodeIdentity;
}

/// Fixed member list taken from configuration.
pub struct StaticMembership {
    local: NodeIdentity,
    members: Vec<NodeIdentity>,
}

impl StaticMembership {
    /// The local identity is added to `peers` if it is not already listed.
    /// Entries with the local address under another id are dropped.
    pub fn new(local: NodeIdentity, peers: Vec<NodeIdentity>) -> Self {
        let mut members = peers;
        members.retain(|member| !member.is_alias_of(&local));
        if !members.contains(&local) {
            members.push(local.clone());
        }
        Self { local, members }
    }
}

#[async_trait]
impl MembershipSource for StaticMembership {
    async fn list_members(&self) -> Result<Vec<NodeIdentity>> {
        Ok(self.members.clone())
    }

    fn local_identity(&self) -> NodeIdentity {
        self.local.clone()
    }
}

/// Pulls the member list from an HTTP registry.
///
/// The registry answers `GET <url>` with a JSON array of `{id, host, port}`.
pub struct RegistryMembership {
    local: NodeIdentity,
    url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl RegistryMembership {
    pub fn new(local: NodeIdentity, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            local,
            url: url.into(),
            http_client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl MembershipSource for RegistryMembership {
    async fn list_members(&self) -> Result<Vec<NodeIdentity>> {
        let response = self
            .http_client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Registry {} answered {}",
                self.url,
                response.status()
            ));
        }

        let members: Vec<NodeIdentity> = response.json().await?;
        tracing::debug!("Registry returned {} members", members.len());

        Ok(members)
    }

    fn local_identity(&self) -> NodeIdentity {
        self.local.clone()
    }
}
