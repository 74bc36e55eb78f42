//! Lifecycle event publishing.
//!
//! Committed install, update, and uninstall operations publish an
//! `AddonEvent` over a broadcast channel. Publishing never blocks and
//! tolerates having no subscribers; slow subscribers may observe lag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use lifelink_types::AddonModule;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonEventKind {
    Installed,
    Updated,
    Uninstalled,
}

impl std::fmt::Display for AddonEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Updated => write!(f, "updated"),
            Self::Uninstalled => write!(f, "uninstalled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonEvent {
    pub kind: AddonEventKind,
    pub module_id: String,
    pub module_name: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl AddonEvent {
    fn new(kind: AddonEventKind, module: &AddonModule) -> Self {
        Self {
            kind,
            module_id: module.id.clone(),
            module_name: module.name.clone(),
            version: module.version.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn installed(module: &AddonModule) -> Self {
        Self::new(AddonEventKind::Installed, module)
    }

    pub fn updated(module: &AddonModule) -> Self {
        Self::new(AddonEventKind::Updated, module)
    }

    pub fn uninstalled(module: &AddonModule) -> Self {
        Self::new(AddonEventKind::Uninstalled, module)
    }
}

/// Broadcast sender for lifecycle events.
#[derive(Debug)]
pub struct AddonEvents {
    sender: broadcast::Sender<AddonEvent>,
}

impl AddonEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AddonEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AddonEvent) {
        debug!(
            "publishing {} event for '{}'@{}",
            event.kind, event.module_name, event.version
        );
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for AddonEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifelink_types::InstallSource;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = AddonEvents::new();
        let mut receiver = events.subscribe();

        let module = AddonModule::new(
            "m-1",
            "Blood Analytics",
            "1.2.0",
            InstallSource::Upload {
                file_name: "blood-analytics.zip".to_string(),
            },
        );
        events.publish(AddonEvent::installed(&module));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, AddonEventKind::Installed);
        assert_eq!(event.module_name, "Blood Analytics");
        assert_eq!(event.version, "1.2.0");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let events = AddonEvents::new();
        let module = AddonModule::new(
            "m-1",
            "SMS Reminders",
            "1.0.0",
            InstallSource::Bundled,
        );
        events.publish(AddonEvent::uninstalled(&module));
    }

    #[test]
    fn event_kind_serializes_snake_case() {
        let json = serde_json::to_string(&AddonEventKind::Uninstalled).unwrap();
        assert_eq!(json, "\"uninstalled\"");
    }
}
