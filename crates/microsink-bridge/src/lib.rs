//! microsink bridge - foreign-runtime batch callbacks
//!
//! A [`ForeignCallbackHandle`] names a callback registered by another
//! runtime and the [`CallGateway`] that reaches it. The handle implements
//! [`microsink_core::BatchCallback`], so the sink cannot tell it apart from
//! an in-process callback.
//!
//! - [`gateway`]: the transport seam
//! - [`handle`]: the handle and its registration
//! - [`wire`]: Arrow IPC envelope for a data view
//! - [`http`]: HTTP gateway
//! - [`receiver`]: reference endpoint for the foreign side

pub mod config;
pub mod gateway;
pub mod handle;
pub mod http;
pub mod receiver;
pub mod wire;

pub use config::BridgeConfig;
pub use gateway::CallGateway;
pub use handle::{register_foreign, ForeignCallbackHandle};
pub use http::HttpGateway;
pub use receiver::{receiver_router, serve_receiver, ForeignBatchHandler};
