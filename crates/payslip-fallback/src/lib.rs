//! Secondary extraction service clients.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientError, FallbackClient};
