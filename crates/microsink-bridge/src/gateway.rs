//! CallGateway trait - how a foreign callback is reached.

use std::fmt::Debug;

use async_trait::async_trait;
use microsink_core::{DataView, ForeignCallError};

/// Transport to callbacks implemented in another runtime.
///
/// `invoke` returns only once the foreign side has finished with the batch.
/// Implementations make a single attempt and report every failure; they
/// never retry or swallow errors.
#[async_trait]
pub trait CallGateway: Debug + Send + Sync {
    async fn invoke(
        &self,
        callback_id: &str,
        batch_id: i64,
        data: &DataView,
    ) -> Result<(), ForeignCallError>;
}
