use clap::Parser;
use replicated_cache::config::NodeConfig;
use replicated_cache::membership::source::{
    MembershipSource, RegistryMembership, StaticMembership,
};
use replicated_cache::replication::coordinator::ReplicationCoordinator;
use replicated_cache::ring::router::RingRouter;
use replicated_cache::storage::lru::LruStore;
use replicated_cache::transport::client::HttpPeerClient;
use replicated_cache::transport::handlers;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NodeConfig::parse();
    config.validate()?;

    let local = config.local_identity();
    tracing::info!("Starting cache node {}", local);

    // 1. Membership:
    let membership: Arc<dyn MembershipSource> = match &config.registry_url {
        Some(url) => {
            tracing::info!("Membership from registry {}", url);
            Arc::new(RegistryMembership::new(
                local.clone(),
                url.clone(),
                config.peer_timeout(),
            ))
        }
        None => {
            if config.peers.is_empty() {
                tracing::info!("No peers configured, running as a single-node cluster");
            } else {
                tracing::info!("Static membership: {} peers", config.peers.len());
            }
            Arc::new(StaticMembership::new(local.clone(), config.peers.clone()))
        }
    };

    // 2. Ring:
    let router = RingRouter::new(membership, config.virtual_nodes);
    router.refresh().await;
    let refresh = router.clone().spawn_refresh(config.refresh_interval());

    // 3. Storage + replication:
    let store = Arc::new(LruStore::new(config.capacity()?));
    let peers = Arc::new(HttpPeerClient::new(
        config.peer_timeout(),
        config.peer_attempts,
    ));
    let coordinator = ReplicationCoordinator::new(router, store, peers, config.replication);

    tracing::info!(
        "Capacity {}, {} virtual nodes per member, {} copies per write",
        config.capacity,
        config.virtual_nodes,
        config.replication
    );

    // 4. HTTP server:
    let app = handlers::router(coordinator);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await?;

    refresh.shutdown().await;
    tracing::info!("Node {} stopped", local);

    Ok(())
}
