//! Hosting runtime seam: activation control, clients, notifications.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Notification action that opens the app.
pub const ACTION_EXPLORE: &str = "explore";
/// Notification action that only dismisses.
pub const ACTION_CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A user-visible notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
}

/// Operations the controller asks of its host.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Activate this worker without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Serve every open client from this worker without a reload.
    async fn claim_clients(&self) -> Result<(), Error>;

    /// Display a notification. Returns the host's id for it.
    async fn show_notification(&self, notification: Notification) -> Result<String, Error>;

    async fn close_notification(&self, id: &str) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}
