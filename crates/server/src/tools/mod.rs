//! MCP tool implementations.
//!
//! This module contains all tools exposed by the appshell-sw server.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use appshell_core::Error;
use appshell_core::worker::EventOutcome;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Error for a dispatched event that came back with another event's outcome.
pub(crate) fn unexpected_outcome(event: &str, outcome: &EventOutcome) -> Error {
    Error::InvalidState(format!("{event} event produced unexpected outcome {outcome:?}"))
}
