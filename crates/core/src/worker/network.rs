//! Fetch transport seam.

use async_trait::async_trait;

use super::request::{Request, Response};
use crate::Error;

/// Network transport.
///
/// `Ok` carries any HTTP response, including redirects and error statuses. `Err`
/// means the fetch itself was rejected (no response at all).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
