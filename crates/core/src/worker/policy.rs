//! Deployment-time caching policy resolved from configuration.

use url::Url;

use super::platform::{ACTION_CLOSE, ACTION_EXPLORE, Notification, NotificationAction};
use super::route::{ExclusionSet, Router};
use crate::Error;
use crate::config::AppConfig;

/// Everything the controller needs to know that is fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub origin: Url,
    pub cache_prefix: String,
    /// Absolute URLs of the precache manifest, in order.
    pub precache: Vec<Url>,
    pub router: Router,
    pub sync_tag: String,
    pub notification: NotificationTemplate,
}

/// Fixed parts of push notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: String,
    pub icon: String,
    pub badge: String,
    pub fallback_body: String,
}

impl NotificationTemplate {
    /// Build a notification with the fixed actions.
    pub fn render(&self, body: Option<String>) -> Notification {
        Notification {
            title: self.title.clone(),
            body: body.unwrap_or_else(|| self.fallback_body.clone()),
            icon: self.icon.clone(),
            badge: self.badge.clone(),
            actions: vec![
                NotificationAction { action: ACTION_EXPLORE.into(), title: "Open app".into() },
                NotificationAction { action: ACTION_CLOSE.into(), title: "Dismiss".into() },
            ],
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        let precache = config
            .precache
            .iter()
            .map(|path| origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let exclusions = ExclusionSet::new(&config.exclude_patterns)?;
        let router = Router::new(exclusions, &config.asset_extensions);

        Ok(Self {
            origin,
            cache_prefix: config.cache_prefix.clone(),
            precache,
            router,
            sync_tag: config.sync_tag.clone(),
            notification: NotificationTemplate {
                title: config.notification_title.clone(),
                icon: config.notification_icon.clone(),
                badge: config.notification_badge.clone(),
                fallback_body: config.push_fallback_body.clone(),
            },
        })
    }

    /// The app shell URL served to documents that were never cached themselves.
    pub fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        root
    }
}
