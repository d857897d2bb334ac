//! In-process host for the controller.
//!
//! There is no browser behind the MCP server, so platform effects are recorded
//! and reported back through `worker_status` instead of being performed.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use appshell_core::Error;
use appshell_core::worker::{Notification, Platform};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use url::Url;

/// Recorded host effects.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct HostSnapshot {
    /// Skip-waiting was requested and has not been acted on yet.
    pub skip_waiting_pending: bool,
    pub clients_claimed: bool,
    /// Notifications currently shown, by id.
    pub notifications: BTreeMap<String, Notification>,
    /// Windows opened, oldest first.
    pub windows: Vec<String>,
}

#[derive(Debug, Default)]
struct HostState {
    snapshot: HostSnapshot,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct HostPlatform {
    state: Mutex<HostState>,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> HostSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn skip_waiting_pending(&self) -> bool {
        self.lock().snapshot.skip_waiting_pending
    }

    /// Consume a pending skip-waiting request.
    pub fn take_skip_waiting(&self) -> bool {
        std::mem::take(&mut self.lock().snapshot.skip_waiting_pending)
    }

    pub fn notification(&self, id: &str) -> Option<Notification> {
        self.lock().snapshot.notifications.get(id).cloned()
    }
}

#[async_trait]
impl Platform for HostPlatform {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.lock().snapshot.skip_waiting_pending = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.lock().snapshot.clients_claimed = true;
        Ok(())
    }

    async fn show_notification(&self, notification: Notification) -> Result<String, Error> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("notification-{}", state.next_id);
        tracing::info!(id = %id, title = %notification.title, body = %notification.body, "notification shown");
        state.snapshot.notifications.insert(id.clone(), notification);
        Ok(id)
    }

    async fn close_notification(&self, id: &str) -> Result<(), Error> {
        if self.lock().snapshot.notifications.remove(id).is_none() {
            tracing::debug!(id, "closing unknown notification");
        }
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(url = %url, "window opened");
        self.lock().snapshot.windows.push(url.to_string());
        Ok(())
    }
}
