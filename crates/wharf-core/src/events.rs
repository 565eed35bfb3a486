//! Host-facing message types.
//!
//! The host UI layer sends fire-and-forget requests and listens for
//! completion notifications on a broadcast channel. Both sides use the
//! `{"type": ..., "data": ...}` envelope of the host's message channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::component::Component;
use crate::error::InstallError;

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Inbound requests from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum HostRequest {
    InstallComponent(Component),
    SyncComponents(Vec<Component>),
}

/// Outbound notifications to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum HostEvent {
    /// Sent exactly once per install attempt; `error` is `None` on success.
    InstallComponentComplete {
        component: Component,
        error: Option<InstallError>,
    },
}

pub type HostEventSender = broadcast::Sender<HostEvent>;
pub type HostEventReceiver = broadcast::Receiver<HostEvent>;

/// Notification channel between the manager and the host.
pub fn channel() -> (HostEventSender, HostEventReceiver) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let request: HostRequest = serde_json::from_value(json!({
            "type": "sync-components",
            "data": [{"uuid": "a", "deleted": true}]
        }))
        .unwrap();
        match request {
            HostRequest::SyncComponents(components) => {
                assert_eq!(components.len(), 1);
                assert!(components[0].deleted);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_completion_event_carries_error_tag() {
        let component: Component = serde_json::from_value(json!({"uuid": "a"})).unwrap();
        let event = HostEvent::InstallComponentComplete {
            component,
            error: Some(InstallError::Downloading),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "install-component-complete");
        assert_eq!(value["data"]["error"]["tag"], "error-downloading");
        assert_eq!(value["data"]["component"]["uuid"], "a");
    }
}
