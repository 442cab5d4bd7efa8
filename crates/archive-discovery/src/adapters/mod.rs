//! # Adapters Module
//!
//! Concrete implementations of the outbound ports.
//!
//! - `time` - system clock (always built)
//! - `http_node_source`, `json_rpc`, `module` - reqwest adapters (`http` feature)

pub mod time;

#[cfg(feature = "http")]
pub mod http_node_source;
#[cfg(feature = "http")]
pub mod json_rpc;
#[cfg(feature = "http")]
pub mod module;

pub use time::SystemTimeSource;

#[cfg(feature = "http")]
pub use http_node_source::{HttpNodeSource, HttpNodeSourceFactory};
#[cfg(feature = "http")]
pub use json_rpc::{JsonRpcChainClient, JsonRpcClientFactory};
#[cfg(feature = "http")]
pub use module::{HttpClientModule, DEFAULT_NETWORK_ID};
