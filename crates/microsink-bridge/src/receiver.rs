//! Reference endpoint for the foreign side of the HTTP gateway.
//!
//! Decodes the wire envelope and hands the batch to a [`ForeignBatchHandler`].
//! A handler error comes back to the gateway as `500` with an [`ErrorBody`],
//! which the gateway turns into `ForeignCallError::Raised`.

use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};

use crate::http::ErrorBody;
use crate::wire::decode_view;

/// Callback implementation living behind the receiver.
#[async_trait]
pub trait ForeignBatchHandler: Send + Sync {
    async fn handle(
        &self,
        callback_id: &str,
        batch_id: i64,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(), String>;
}

/// Micro-batches have no size bound, so neither does the request body.
pub fn receiver_router(handler: Arc<dyn ForeignBatchHandler>) -> Router {
    Router::new()
        .route("/callbacks/:callback_id/batches/:batch_id", post(receive_batch))
        .layer(DefaultBodyLimit::disable())
        .with_state(handler)
}

async fn receive_batch(
    State(handler): State<Arc<dyn ForeignBatchHandler>>,
    Path((callback_id, batch_id)): Path<(String, i64)>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let (schema, batches) = decode_view(&body).map_err(|e| {
        warn!("rejecting batch {} for '{}': {}", batch_id, callback_id, e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: format!("invalid arrow stream: {e}"),
            }),
        )
    })?;

    handler
        .handle(&callback_id, batch_id, schema, batches)
        .await
        .map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { error }),
            )
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Serve the receiver on `bind_addr` until the process exits.
pub async fn serve_receiver(
    bind_addr: &str,
    handler: Arc<dyn ForeignBatchHandler>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Callback receiver listening on {}", bind_addr);
    axum::serve(listener, receiver_router(handler)).await?;
    Ok(())
}
