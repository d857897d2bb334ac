//! Event dispatch and the auxiliary handlers (sync, push, notification click, message).

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::controller::{ActivationReport, CacheController, FetchOutcome, InstallReport};
use super::platform::{ACTION_CLOSE, ACTION_EXPLORE};
use super::request::Request;
use crate::Error;

/// Everything the host can deliver to the controller.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { payload: Option<Bytes> },
    NotificationClick { notification_id: String, action: Option<String> },
    Message(Value),
}

/// Per-event result.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Fetched(FetchOutcome),
    /// Whether the tag triggered the sync action.
    Synced(bool),
    /// Host id of the notification shown.
    Notified(String),
    /// Window opened by the click, if any.
    Clicked(Option<Url>),
    /// Whether the message requested skip-waiting.
    MessageHandled(bool),
}

/// Control messages posted by client pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
}

impl CacheController {
    /// Route an event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => self.handle_fetch(request).await.map(EventOutcome::Fetched),
            WorkerEvent::Sync { tag } => Ok(EventOutcome::Synced(self.handle_sync(&tag).await)),
            WorkerEvent::Push { payload } => self.handle_push(payload.as_deref()).await.map(EventOutcome::Notified),
            WorkerEvent::NotificationClick { notification_id, action } => self
                .handle_notification_click(&notification_id, action.as_deref())
                .await
                .map(EventOutcome::Clicked),
            WorkerEvent::Message(data) => self.handle_message(&data).await.map(EventOutcome::MessageHandled),
        }
    }

    /// Background sync. The sync action itself is a logged no-op.
    pub async fn handle_sync(&self, tag: &str) -> bool {
        if tag != self.policy().sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return false;
        }
        tracing::info!(tag, "background sync triggered");
        true
    }

    /// Show a notification for a push message.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the payload is not UTF-8 text.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Result<String, Error> {
        let body = payload
            .map(|bytes| {
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|e| Error::InvalidInput(format!("push payload is not text: {e}")))
            })
            .transpose()?;

        let notification = self.policy().notification.render(body);
        let platform = self.platform();
        let id = platform.show_notification(notification).await?;
        tracing::debug!(id = %id, "push notification shown");
        Ok(id)
    }

    /// Close the notification and open the app unless the action was `close`.
    pub async fn handle_notification_click(
        &self, notification_id: &str, action: Option<&str>,
    ) -> Result<Option<Url>, Error> {
        let platform = self.platform();
        platform.close_notification(notification_id).await?;

        if action == Some(ACTION_CLOSE) {
            return Ok(None);
        }
        if action.is_some_and(|a| a != ACTION_EXPLORE) {
            tracing::debug!(action, "unknown notification action, opening app");
        }

        let root = self.policy().root_url();
        platform.open_window(&root).await?;
        Ok(Some(root))
    }

    /// Handle a message from a client page. Unrecognized messages are ignored.
    pub async fn handle_message(&self, data: &Value) -> Result<bool, Error> {
        match ControlMessage::deserialize(data) {
            Ok(ControlMessage::SkipWaiting) => {
                tracing::info!("skip waiting requested by client");
                self.platform().skip_waiting().await?;
                Ok(true)
            }
            Err(_) => {
                tracing::debug!("ignoring unrecognized client message");
                Ok(false)
            }
        }
    }
}
