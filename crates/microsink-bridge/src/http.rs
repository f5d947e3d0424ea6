//! HTTP gateway to a foreign callback endpoint.
//!
//! Each batch becomes one `POST {base}/callbacks/{callback_id}/batches/{batch_id}`
//! carrying the [`wire`](crate::wire) envelope. The request is awaited until
//! the foreign side answers. A 2xx answer means the callback finished; any
//! other answer means it raised.

use anyhow::Context;
use async_trait::async_trait;
use microsink_core::{DataView, ForeignCallError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::gateway::CallGateway;
use crate::wire::{
    encode_view, ARROW_STREAM_CONTENT_TYPE, HEADER_BATCH_ID, HEADER_CALLBACK_ID,
    HEADER_PARTITIONS,
};

/// Error body returned by the foreign endpoint when its callback raises.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &BridgeConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let base_url = Url::parse(config.gateway_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid gateway URL '{}'", config.gateway_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Gateway URL '{}' cannot carry a path", config.gateway_url);
        }
        Ok(Self {
            base_url,
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Each id becomes one percent-encoded path segment.
    fn endpoint(&self, callback_id: &str, batch_id: i64) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().extend([
            "callbacks",
            callback_id,
            "batches",
            &batch_id.to_string(),
        ]);
        Some(url)
    }
}

#[async_trait]
impl CallGateway for HttpGateway {
    async fn invoke(
        &self,
        callback_id: &str,
        batch_id: i64,
        data: &DataView,
    ) -> Result<(), ForeignCallError> {
        let body = encode_view(data).map_err(|e| ForeignCallError::Encoding {
            callback_id: callback_id.to_string(),
            reason: e.to_string(),
        })?;
        let url = self
            .endpoint(callback_id, batch_id)
            .ok_or_else(|| ForeignCallError::Encoding {
                callback_id: callback_id.to_string(),
                reason: format!("gateway URL {} cannot carry a path", self.base_url),
            })?;
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, ARROW_STREAM_CONTENT_TYPE)
            .header(HEADER_CALLBACK_ID, callback_id)
            .header(HEADER_BATCH_ID, batch_id.to_string())
            .header(HEADER_PARTITIONS, data.num_partitions().to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| ForeignCallError::Unreachable {
                callback_id: callback_id.to_string(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match response.text().await {
            Ok(text) => match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => body.error,
                Err(_) if text.is_empty() => status.to_string(),
                Err(_) => text,
            },
            Err(e) => format!("{status} (body unreadable: {e})"),
        };
        Err(ForeignCallError::Raised {
            callback_id: callback_id.to_string(),
            message,
        })
    }
}
