//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the controller as if a page had issued the request.

use std::collections::BTreeMap;

use appshell_client::resolve;
use appshell_core::worker::{Destination, EventOutcome, Route};
use appshell_core::{CacheController, FetchOutcome, Request, WorkerEvent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, unexpected_outcome};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request target: a path relative to the app origin or an absolute URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document" for navigations, "script", "style", "font",
    /// "image", "manifest", or "empty" (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// Strategy that handled the request. `bypass` means the host must fetch it itself.
    pub route: Route,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// Whether the response was read back from cache storage.
    pub from_cache: bool,
    pub content_type: Option<String>,
    /// Response body as text (lossy for binary bodies).
    pub body: Option<String>,
}

/// Implementation of the sw_fetch tool.
///
/// Background cache writes triggered by the fetch are awaited before returning, so a
/// following tool call observes them.
pub async fn fetch_impl(controller: &CacheController, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&params.url, &controller.policy().origin).map_err(appshell_core::Error::from)?;
    let destination: Destination = params.destination.as_deref().unwrap_or_default().parse()?;

    let mut request = Request::get(url.clone())
        .with_method(&params.method)
        .with_destination(destination);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let outcome = match controller.dispatch(WorkerEvent::Fetch(request)).await? {
        EventOutcome::Fetched(outcome) => outcome,
        other => return Err(unexpected_outcome("fetch", &other).into()),
    };
    controller.settle().await;

    let output = match outcome {
        FetchOutcome::Bypassed => SwFetchOutput {
            url: url.to_string(),
            route: Route::Bypass,
            status: None,
            status_text: None,
            from_cache: false,
            content_type: None,
            body: None,
        },
        FetchOutcome::Responded { route, response } => SwFetchOutput {
            url: url.to_string(),
            route,
            status: Some(response.status),
            status_text: Some(response.status_text.clone()),
            from_cache: response.from_cache,
            content_type: response.content_type().map(str::to_string),
            body: Some(String::from_utf8_lossy(&response.body).into_owned()),
        },
    };

    json_result(&output)
}
