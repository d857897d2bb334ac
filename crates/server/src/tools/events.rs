//! Auxiliary event tools: sw_sync, sw_push, sw_notification_click, sw_message.

use appshell_core::worker::{ActivationReport, EventOutcome, Notification};
use appshell_core::{CacheController, Error, WorkerEvent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, unexpected_outcome};
use super::lifecycle::activate_if_waiting;
use crate::platform::HostPlatform;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Background sync tag.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// Whether the tag matched and the sync action ran.
    pub triggered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push message text. Omit for a payload-less push.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub notification_id: String,
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Id returned by sw_push.
    pub notification_id: String,
    /// Action button clicked: "explore", "close", or omitted for the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    /// Window opened by the click, if any.
    pub opened: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message data as posted by the page, e.g. `{"type": "SKIP_WAITING"}`.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the message requested skip-waiting.
    pub skip_waiting: bool,
    /// Present when the request activated a waiting controller.
    pub activation: Option<ActivationReport>,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(controller: &CacheController, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let triggered = match controller.dispatch(WorkerEvent::Sync { tag: params.tag.clone() }).await? {
        EventOutcome::Synced(triggered) => triggered,
        other => return Err(unexpected_outcome("sync", &other).into()),
    };
    json_result(&SwSyncOutput { tag: params.tag, triggered })
}

/// Implementation of the sw_push tool.
pub async fn push_impl(
    controller: &CacheController, platform: &HostPlatform, params: SwPushParams,
) -> Result<CallToolResult, McpError> {
    let event = WorkerEvent::Push { payload: params.payload.map(Into::into) };
    let notification_id = match controller.dispatch(event).await? {
        EventOutcome::Notified(id) => id,
        other => return Err(unexpected_outcome("push", &other).into()),
    };
    let notification = platform.notification(&notification_id);
    json_result(&SwPushOutput { notification_id, notification })
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    controller: &CacheController, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    if params.notification_id.trim().is_empty() {
        return Err(Error::InvalidInput("notification_id cannot be empty".into()).into());
    }

    let event = WorkerEvent::NotificationClick { notification_id: params.notification_id, action: params.action };
    let opened = match controller.dispatch(event).await? {
        EventOutcome::Clicked(opened) => opened,
        other => return Err(unexpected_outcome("notificationclick", &other).into()),
    };
    json_result(&SwNotificationClickOutput { opened: opened.map(|url| url.to_string()) })
}

/// Implementation of the sw_message tool.
pub async fn message_impl(
    controller: &CacheController, platform: &HostPlatform, params: SwMessageParams,
) -> Result<CallToolResult, McpError> {
    let skip_waiting = match controller.dispatch(WorkerEvent::Message(params.data)).await? {
        EventOutcome::MessageHandled(skip_waiting) => skip_waiting,
        other => return Err(unexpected_outcome("message", &other).into()),
    };
    let activation = if skip_waiting { activate_if_waiting(controller, platform).await? } else { None };
    json_result(&SwMessageOutput { skip_waiting, activation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{harness, json};
    use appshell_core::WorkerState;

    #[tokio::test]
    async fn test_sync_tags() {
        let h = harness();
        let hit = json(&sync_impl(&h.controller, SwSyncParams { tag: "background-sync".into() }).await.unwrap());
        let miss = json(&sync_impl(&h.controller, SwSyncParams { tag: "refresh-feed".into() }).await.unwrap());

        assert_eq!(hit["triggered"], true);
        assert_eq!(miss["triggered"], false);
    }

    #[tokio::test]
    async fn test_push_then_click_explore() {
        let h = harness();
        let pushed = json(
            &push_impl(&h.controller, &h.platform, SwPushParams { payload: Some("2 new referrals".into()) })
                .await
                .unwrap(),
        );
        assert_eq!(pushed["notification"]["body"], "2 new referrals");
        assert_eq!(pushed["notification"]["actions"][0]["action"], "explore");

        let id = pushed["notification_id"].as_str().unwrap().to_string();
        let clicked = json(
            &notification_click_impl(
                &h.controller,
                SwNotificationClickParams { notification_id: id, action: Some("explore".into()) },
            )
            .await
            .unwrap(),
        );
        assert_eq!(clicked["opened"], "https://mini.example.com/");
        assert!(h.platform.snapshot().notifications.is_empty());
    }

    #[tokio::test]
    async fn test_push_without_payload() {
        let h = harness();
        let pushed = json(&push_impl(&h.controller, &h.platform, SwPushParams { payload: None }).await.unwrap());
        assert_eq!(pushed["notification"]["body"], "New update available");
    }

    #[tokio::test]
    async fn test_click_close_opens_nothing() {
        let h = harness();
        let clicked = json(
            &notification_click_impl(
                &h.controller,
                SwNotificationClickParams { notification_id: "notification-1".into(), action: Some("close".into()) },
            )
            .await
            .unwrap(),
        );
        assert!(clicked["opened"].is_null());
        assert!(h.platform.snapshot().windows.is_empty());
    }

    #[tokio::test]
    async fn test_click_empty_id_rejected() {
        let h = harness();
        let err = notification_click_impl(
            &h.controller,
            SwNotificationClickParams { notification_id: " ".into(), action: None },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates_installed_worker() {
        let h = harness();
        h.controller.install().await.unwrap();
        // Drop the install's own request so only the message can trigger activation.
        h.platform.take_skip_waiting();

        let output = json(
            &message_impl(
                &h.controller,
                &h.platform,
                SwMessageParams { data: serde_json::json!({ "type": "SKIP_WAITING" }) },
            )
            .await
            .unwrap(),
        );
        assert_eq!(output["skip_waiting"], true);
        assert!(output["activation"].is_object());
        assert_eq!(h.controller.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_other_message_ignored() {
        let h = harness();
        let output = json(
            &message_impl(&h.controller, &h.platform, SwMessageParams { data: serde_json::json!({ "type": "PING" }) })
                .await
                .unwrap(),
        );
        assert_eq!(output["skip_waiting"], false);
        assert!(output["activation"].is_null());
    }
}
