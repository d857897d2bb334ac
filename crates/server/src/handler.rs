//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the controller.
use std::sync::Arc;

use appshell_core::CacheController;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::platform::HostPlatform;
use crate::tools::cache::{CacheGetParams, get_impl};
use crate::tools::events::{
    SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams, message_impl, notification_click_impl,
    push_impl, sync_impl,
};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};

/// The main MCP server handler for appshell-sw.
#[derive(Clone)]
pub struct AppShellServer {
    controller: Arc<CacheController>,
    platform: Arc<HostPlatform>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AppShellServer {
    /// Create a new server handler.
    pub fn new(controller: Arc<CacheController>, platform: Arc<HostPlatform>) -> Self {
        Self { controller, platform, tool_router: Self::tool_router() }
    }

    #[tool(description = "Deliver the install event: populate the precache and request skip-waiting. \
                          Activates immediately when skip-waiting is granted.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.controller, &self.platform).await
    }

    #[tool(description = "Deliver the activate event: delete stale cache namespaces and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.controller).await
    }

    #[tool(description = "Deliver a fetch event. Returns the route taken and the response, from network or cache.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    #[tool(description = "Deliver a background sync event with the given tag.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.controller, params.0).await
    }

    #[tool(description = "Deliver a push event. Shows a notification with the payload text.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.controller, &self.platform, params.0).await
    }

    #[tool(description = "Deliver a notification click. Opens the app unless the action is \"close\".")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.controller, params.0).await
    }

    #[tool(description = "Post a message from a page, e.g. {\"type\": \"SKIP_WAITING\"}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.controller, &self.platform, params.0).await
    }

    #[tool(description = "Report lifecycle state, cache namespaces, stored entries, and recorded host effects.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller, &self.platform).await
    }

    #[tool(description = "Read the entry cached for a URL in the current namespace.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, params.0).await
    }
}

impl ServerHandler for AppShellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "appshell-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline cache controller for the app shell. Call sw_install first; sw_fetch then serves \
                 requests network-first with cache fallback."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
