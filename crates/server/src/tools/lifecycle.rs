//! sw_install, sw_activate and worker_status tool implementations.

use appshell_core::worker::{ActivationReport, EventOutcome, InstallReport};
use appshell_core::{CacheController, Error, WorkerEvent, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use super::{json_result, unexpected_outcome};
use crate::platform::{HostPlatform, HostSnapshot};

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutput {
    pub install: InstallReport,
    /// Present when the install's skip-waiting request activated the controller immediately.
    pub activation: Option<ActivationReport>,
    pub state: WorkerState,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StatusOutput {
    pub state: WorkerState,
    /// This controller's namespace.
    pub namespace: String,
    /// Every namespace currently in cache storage.
    pub namespaces: Vec<String>,
    /// Entry URLs stored in this controller's namespace.
    pub entries: Vec<String>,
    /// Background cache writes still in flight.
    pub pending_writes: usize,
    pub host: HostSnapshot,
}

/// Activate if skip-waiting is pending and the controller is waiting.
///
/// The request stays pending until an installed controller activates successfully.
pub async fn activate_if_waiting(
    controller: &CacheController, platform: &HostPlatform,
) -> Result<Option<ActivationReport>, Error> {
    if controller.state() != WorkerState::Installed || !platform.skip_waiting_pending() {
        return Ok(None);
    }
    tracing::info!(namespace = controller.namespace(), "skip waiting: activating immediately");
    let report = activate(controller).await?;
    platform.take_skip_waiting();
    Ok(Some(report))
}

async fn activate(controller: &CacheController) -> Result<ActivationReport, Error> {
    match controller.dispatch(WorkerEvent::Activate).await? {
        EventOutcome::Activated(report) => Ok(report),
        other => Err(unexpected_outcome("activate", &other)),
    }
}

/// Implementation of the sw_install tool.
pub async fn install_impl(controller: &CacheController, platform: &HostPlatform) -> Result<CallToolResult, McpError> {
    let install = match controller.dispatch(WorkerEvent::Install).await? {
        EventOutcome::Installed(report) => report,
        other => return Err(unexpected_outcome("install", &other).into()),
    };
    let activation = activate_if_waiting(controller, platform).await?;

    json_result(&InstallOutput { install, activation, state: controller.state() })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = activate(controller).await?;
    json_result(&report)
}

/// Implementation of the worker_status tool.
pub async fn status_impl(controller: &CacheController, platform: &HostPlatform) -> Result<CallToolResult, McpError> {
    let cache = controller.cache();
    let output = StatusOutput {
        state: controller.state(),
        namespace: controller.namespace().to_string(),
        namespaces: cache.keys().await?,
        entries: cache.entries(controller.namespace()).await?,
        pending_writes: controller.pending_writes().await,
        host: platform.snapshot(),
    };
    json_result(&output)
}
