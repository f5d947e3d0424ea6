//! Per-batch callback capability.
//!
//! [`BatchSink`](crate::BatchSink) only ever talks to `dyn BatchCallback`.
//! In-process closures come in through [`FnCallback`]; callbacks living in
//! another runtime are wrapped by the bridge crate in a type implementing the
//! same trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, CallbackError};
use crate::view::DataView;

/// Receives each accepted micro-batch exactly once.
#[async_trait]
pub trait BatchCallback: Send + Sync {
    /// Handle the batch identified by `batch_id`. The view is only valid for
    /// the duration of the call.
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError>;
}

#[async_trait]
impl<T: BatchCallback + ?Sized> BatchCallback for Arc<T> {
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError> {
        (**self).call(batch_id, data).await
    }
}

/// An in-process function used as a callback.
pub struct FnCallback<F> {
    f: F,
}

impl<F> FnCallback<F>
where
    F: Fn(i64, &DataView) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> BatchCallback for FnCallback<F>
where
    F: Fn(i64, &DataView) -> Result<(), BoxError> + Send + Sync,
{
    async fn call(&self, batch_id: i64, data: &DataView) -> Result<(), CallbackError> {
        (self.f)(batch_id, data).map_err(CallbackError::Failed)
    }
}

/// Register an in-process function as the sink's callback.
pub fn native_callback<F>(f: F) -> Arc<dyn BatchCallback>
where
    F: Fn(i64, &DataView) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(FnCallback::new(f))
}
