//! cache_get tool implementation.
//!
//! Retrieves the entry stored for a request in the controller's namespace.

use appshell_client::resolve;
use appshell_core::worker::Headers;
use appshell_core::{CacheController, Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request target: a path relative to the app origin or an absolute URL.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub namespace: String,
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    /// Header fields by lower-cased name; repeated fields keep every value.
    pub headers: Headers,
    /// Stored body as text (lossy for binary bodies).
    pub body: String,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(controller: &CacheController, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&params.url, &controller.policy().origin).map_err(Error::from)?;
    let mut request = Request::get(url);
    if let Some(method) = &params.method {
        request = request.with_method(method);
    }

    let namespace = controller.namespace();
    let entry = controller
        .cache()
        .match_request(namespace, &request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.cache_url().to_string()))?;

    let output = CacheGetOutput {
        namespace: namespace.to_string(),
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        body_bytes: entry.body.len(),
        url: entry.url,
        method: entry.method,
        status: entry.status,
        status_text: entry.status_text,
        headers: entry.headers,
        stored_at: entry.stored_at,
    };
    json_result(&output)
}
