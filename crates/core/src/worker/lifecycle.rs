//! Single-slot lifecycle state machine.
//!
//! `Parsed → Installing → Installed → Activating → Activated`. Transitions are
//! serialized: a second install or activate waits for the one in flight and then
//! sees the state it left behind.

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Error;

/// Lifecycle state of one controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: RwLock<WorkerState>,
    gate: Mutex<()>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, next: WorkerState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    /// Run `work` as the `from → during → to` transition.
    ///
    /// Rejected with `InvalidState` unless the current state is `from`. If `work`
    /// fails the state returns to `from`.
    pub async fn transition<T, F>(
        &self, from: WorkerState, during: WorkerState, to: WorkerState, work: F,
    ) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let _gate = self.gate.lock().await;

        let current = self.state();
        if current != from {
            return Err(Error::InvalidState(format!("cannot enter {during:?} from {current:?}")));
        }

        self.set(during);
        match work.await {
            Ok(value) => {
                self.set(to);
                Ok(value)
            }
            Err(e) => {
                self.set(from);
                Err(e)
            }
        }
    }
}
