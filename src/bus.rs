//! Widget event bus.
//!
//! The shell's transport (IPC, window events) is an external collaborator;
//! this module fixes the event vocabulary and the dispatch discipline. Events
//! arrive on an unbounded channel and [`run_dispatcher`] applies them to the
//! store strictly in arrival order, so two updates for the same widget can
//! never be observed out of order. Rejected events are logged and dropped;
//! the bus is fire-and-forget.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::runtime::loader::BundleHost;
use crate::runtime::module::ModuleRuntime;
use crate::settings::SettingsPatch;
use crate::store::{RenderRequest, WidgetStore};

/// Channel ids, mirrored by the host side of the transport.
pub const RENDER_CHANNEL: &str = "widgets/render";
pub const UPDATE_SETTINGS_CHANNEL: &str = "widgets/update-settings";
pub const REMOVE_CHANNEL: &str = "widgets/remove";

/// One widget lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum WidgetEvent {
    /// Render (or re-render) a batch of widgets.
    Render(Vec<RenderRequest>),
    UpdateSettings { id: String, patch: SettingsPatch },
    Remove { ids: Vec<String> },
}

/// Sending half of the bus. Cheap to clone into transport callbacks.
#[derive(Clone)]
pub struct EventBus {
    tx: UnboundedSender<WidgetEvent>,
}

impl EventBus {
    /// Queue an event. Returns `false` when the dispatcher is gone.
    pub fn send(&self, event: WidgetEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("widget event dropped: dispatcher closed");
                false
            }
        }
    }
}

/// Create a bus and the receiver its dispatcher consumes.
pub fn channel() -> (EventBus, UnboundedReceiver<WidgetEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventBus { tx }, rx)
}

/// Apply one event to the store.
pub async fn dispatch<R, B>(store: &WidgetStore<R, B>, event: WidgetEvent)
where
    R: ModuleRuntime,
    B: BundleHost,
{
    match event {
        WidgetEvent::Render(requests) => {
            for request in requests {
                let id = request.id.clone();
                if let Err(err) = store.render(request).await {
                    tracing::warn!(%id, %err, "render event rejected");
                }
            }
        }
        WidgetEvent::UpdateSettings { id, patch } => {
            if let Err(err) = store.update_settings(&id, &patch).await {
                tracing::warn!(%id, %err, "settings event rejected");
            }
        }
        WidgetEvent::Remove { ids } => {
            for id in ids {
                store.remove(&id).await;
            }
        }
    }
}

/// Consume the bus until every sender is dropped, applying events in
/// arrival order.
pub async fn run_dispatcher<R, B>(
    store: &WidgetStore<R, B>,
    mut rx: UnboundedReceiver<WidgetEvent>,
) where
    R: ModuleRuntime,
    B: BundleHost,
{
    while let Some(event) = rx.recv().await {
        dispatch(store, event).await;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::loader::Loader;
    use crate::settings::WidgetSettings;
    use crate::store::RenderState;
    use crate::testing::{StubHost, StubRuntime};
    use pretty_assertions::assert_eq;

    fn store() -> WidgetStore<StubRuntime, StubHost> {
        WidgetStore::new(Loader::new(
            StubRuntime::component(),
            StubHost::with_code("export default 1;"),
            "http://127.0.0.1:7340",
        ))
    }

    fn render_event(id: &str) -> WidgetEvent {
        WidgetEvent::Render(vec![RenderRequest {
            id: id.to_string(),
            settings: Some(WidgetSettings::default()),
        }])
    }

    #[tokio::test]
    async fn dispatcher_applies_events_in_arrival_order() {
        let store = store();
        let (bus, rx) = channel();

        bus.send(render_event("clock"));
        bus.send(WidgetEvent::UpdateSettings {
            id: "clock".into(),
            patch: SettingsPatch {
                x: Some(42),
                ..SettingsPatch::default()
            },
        });
        bus.send(WidgetEvent::Remove {
            ids: vec!["other".into()],
        });
        drop(bus);

        run_dispatcher(&store, rx).await;
        assert!(matches!(
            store.state("clock").await.unwrap(),
            RenderState::Rendered { .. }
        ));
        assert_eq!(store.settings("clock").await.unwrap().x, 42);
    }

    #[tokio::test]
    async fn remove_event_clears_entries() {
        let store = store();
        let (bus, rx) = channel();

        bus.send(render_event("a"));
        bus.send(render_event("b"));
        bus.send(WidgetEvent::Remove {
            ids: vec!["a".into(), "b".into()],
        });
        drop(bus);

        run_dispatcher(&store, rx).await;
        assert!(store.widget_ids().await.is_empty());
        assert_eq!(store.live_handles().await, 0);
    }

    #[tokio::test]
    async fn rejected_events_do_not_stop_the_dispatcher() {
        let store = store();
        let (bus, rx) = channel();

        // Unknown id without settings is rejected but later events still apply.
        bus.send(WidgetEvent::Render(vec![RenderRequest {
            id: "ghost".into(),
            settings: None,
        }]));
        bus.send(render_event("clock"));
        drop(bus);

        run_dispatcher(&store, rx).await;
        assert!(store.state("ghost").await.is_none());
        assert!(store.state("clock").await.is_some());
    }

    #[test]
    fn event_wire_shape() {
        let event = WidgetEvent::Remove {
            ids: vec!["clock".into()],
        };
        let wire = serde_json::to_string(&event).unwrap();
        assert_eq!(wire, r#"{"event":"remove","payload":{"ids":["clock"]}}"#);
        let back: WidgetEvent = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn send_after_dispatcher_exit_reports_closure() {
        let (bus, rx) = channel();
        drop(rx);
        assert!(!bus.send(WidgetEvent::Remove { ids: vec![] }));
    }
}
