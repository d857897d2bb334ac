//! Versioned cache namespace naming.

use chrono::{DateTime, Utc};

/// Source of the install-time version token.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The namespace owned by one controller instance: `<prefix>-v<unix millis>`.
///
/// Fixed at construction so install and activate agree on the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespace {
    name: String,
}

impl CacheNamespace {
    pub fn versioned(prefix: &str, clock: &dyn Clock) -> Self {
        let version = clock.now().timestamp_millis();
        Self { name: format!("{prefix}-v{version}") }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every other name is stale.
    pub fn is_current(&self, name: &str) -> bool {
        self.name == name
    }
}
