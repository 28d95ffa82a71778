use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;

use super::protocol::*;
use crate::replication::coordinator::ReplicationCoordinator;
use crate::replication::types::{CacheError, ReplicationOutcome};

/// Builds the node's HTTP surface: public, forwarding, local-only and diagnostics routes.
pub fn router(coordinator: Arc<ReplicationCoordinator>) -> Router {
    Router::new()
        .route(ENDPOINT_PUT, post(handle_put))
        .route(ENDPOINT_GET, get(handle_get))
        .route(ENDPOINT_FORWARD_PUT, post(handle_forward_put))
        .route(ENDPOINT_REPLICATE, post(handle_replicate))
        .route(ENDPOINT_GET_INTERNAL, get(handle_get_internal))
        .route(ENDPOINT_RING_INFO, get(handle_ring_info))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(coordinator))
}

fn status_for(error: &CacheError) -> StatusCode {
    match error {
        CacheError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CacheError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
        CacheError::InvalidValue(_) => StatusCode::BAD_REQUEST,
    }
}

fn decode_value(value_json: &str) -> Result<Value, CacheError> {
    Ok(serde_json::from_str(value_json)?)
}

fn write_failed(error: CacheError) -> (StatusCode, Json<WriteResponse>) {
    (
        status_for(&error),
        Json(WriteResponse {
            success: false,
            outcomes: vec![],
            error: Some(error.to_string()),
        }),
    )
}

fn write_done(outcomes: Vec<ReplicationOutcome>) -> (StatusCode, Json<WriteResponse>) {
    // The first outcome is the primary copy (local or forwarded).
    let success = outcomes.first().is_some_and(ReplicationOutcome::is_success);
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    (
        status,
        Json(WriteResponse {
            success,
            outcomes,
            error: None,
        }),
    )
}

fn value_found(value: &Value) -> (StatusCode, Json<GetResponse>) {
    match serde_json::to_string(value) {
        Ok(value_json) => (
            StatusCode::OK,
            Json(GetResponse {
                value_json: Some(value_json),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to serialize value: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetResponse {
                    value_json: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

fn value_missing() -> (StatusCode, Json<GetResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(GetResponse {
            value_json: None,
            error: None,
        }),
    )
}

pub async fn handle_put(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Json(req): Json<PutRequest>,
) -> (StatusCode, Json<WriteResponse>) {
    let value = match decode_value(&req.value_json) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to deserialize value: {}", e);
            return write_failed(e);
        }
    };

    match coordinator.write(req.key, value).await {
        Ok(outcomes) => write_done(outcomes),
        Err(e) => {
            tracing::error!("Failed to put: {}", e);
            write_failed(e)
        }
    }
}

pub async fn handle_get(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Query(KeyQuery { key }): Query<KeyQuery>,
) -> (StatusCode, Json<GetResponse>) {
    match coordinator.read(&key).await {
        Ok(Some(value)) => value_found(&value),
        Ok(None) => value_missing(),
        Err(e) => {
            tracing::error!("Failed to get '{}': {}", key, e);
            (
                status_for(&e),
                Json(GetResponse {
                    value_json: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_forward_put(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Json(req): Json<ForwardPutRequest>,
) -> (StatusCode, Json<WriteResponse>) {
    let value = match decode_value(&req.value_json) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to deserialize forwarded value: {}", e);
            return write_failed(e);
        }
    };

    tracing::debug!("Received forwarded write {} for key '{}'", req.op_id, req.key);
    let outcomes = coordinator
        .write_as_primary(req.op_id, req.key, value)
        .await;
    write_done(outcomes)
}

pub async fn handle_replicate(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Json(req): Json<ReplicateRequest>,
) -> (StatusCode, Json<ReplicateResponse>) {
    let value = match decode_value(&req.value_json) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to deserialize replica value: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ReplicateResponse { success: false }),
            );
        }
    };

    coordinator.local_write(req.key, value);
    tracing::debug!("Stored replica for write {}", req.op_id);

    (StatusCode::OK, Json(ReplicateResponse { success: true }))
}

pub async fn handle_get_internal(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
    Query(KeyQuery { key }): Query<KeyQuery>,
) -> (StatusCode, Json<GetResponse>) {
    match coordinator.local_read(&key) {
        Some(value) => value_found(&value),
        None => value_missing(),
    }
}

pub async fn handle_ring_info(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
) -> Json<RingInfoResponse> {
    let info = coordinator.router().ring_info();

    Json(RingInfoResponse {
        node: coordinator.local_identity().clone(),
        generation: info.generation,
        members: info.members,
        virtual_nodes: info.positions,
        fan_out: coordinator.fan_out(),
        store_len: coordinator.store().len(),
        store_capacity: coordinator.store().capacity(),
    })
}

pub async fn handle_health(
    Extension(coordinator): Extension<Arc<ReplicationCoordinator>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        node: coordinator.local_identity().clone(),
    })
}
