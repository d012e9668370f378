//! Widget lifecycle store: the keyed state machine behind every live widget.
//!
//! One entry per widget instance id. All mutation funnels through
//! [`WidgetStore::render`], [`WidgetStore::update_settings`], and
//! [`WidgetStore::remove`], serialized by a single mutex so interleavings
//! cannot corrupt an entry.
//!
//! Renders are asynchronous: the lock is released while the loader runs, and
//! the completion re-acquires it to commit. Concurrent renders for the same
//! id are resolved last-writer-wins by a per-entry generation counter — a
//! completion whose generation is not newer than the committed one is
//! discarded before it registers any handle, so stale loads can never clobber
//! newer state or leak.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::runtime::handle::{HandleId, HandlePurpose, HandleStore};
use crate::runtime::loader::{BundleHost, Loader};
use crate::runtime::module::{Component, ModuleRuntime};
use crate::settings::{SettingsPatch, WidgetSettings};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A request to (re)render one widget instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub id: String,
    /// Full settings record. Required when the id is new; on an existing id
    /// it replaces the stored settings wholesale, and `None` keeps them.
    pub settings: Option<WidgetSettings>,
}

/// Where a widget entry currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// A load is in flight and nothing newer has committed.
    Loading,
    Rendered {
        component: Component,
    },
    /// Shown in place of the widget; `title` is one of the fixed load-error
    /// titles.
    Errored {
        title: &'static str,
        message: String,
    },
}

struct WidgetEntry {
    settings: WidgetSettings,
    /// Personalized API module handle; lives as long as the entry.
    apis: HandleId,
    /// Imported bundle handle; present only after a successful commit.
    module: Option<HandleId>,
    state: RenderState,
    /// Last generation issued to a render.
    latest: u64,
    /// Generation of the completion currently reflected in `state`.
    committed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("render for unknown widget `{0}` carries no settings")]
    RenderWithoutSettings(String),
    #[error("unknown widget `{0}`")]
    UnknownWidget(String),
}

struct Inner {
    entries: HashMap<String, WidgetEntry>,
    handles: HandleStore,
}

/// The store. Generic over the two load-cycle seams.
pub struct WidgetStore<R, B> {
    loader: Loader<R, B>,
    inner: Mutex<Inner>,
}

/// Source of a widget's personalized API module. Exports the instance id and
/// an `invoke` bridge bound to it.
fn apis_source(widget_id: &str) -> String {
    let id = serde_json::Value::String(widget_id.to_string());
    format!(
        "const widgetId = {id};\n\
         export const invoke = (method, payload) => window.__weftHost.invoke(widgetId, method, payload);\n\
         export default {{ widgetId, invoke }};\n"
    )
}

impl<R: ModuleRuntime, B: BundleHost> WidgetStore<R, B> {
    pub fn new(loader: Loader<R, B>) -> Self {
        WidgetStore {
            loader,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                handles: HandleStore::new(),
            }),
        }
    }

    /// Render one widget: mark it loading, run the load cycle, commit the
    /// outcome unless a newer render has committed first.
    pub async fn render(&self, request: RenderRequest) -> Result<(), StoreError> {
        let RenderRequest { id, settings } = request;

        let (generation, api_url) = {
            let mut inner = self.inner.lock().await;
            let Inner { entries, handles } = &mut *inner;
            let entry = match entries.entry(id.clone()) {
                Entry::Occupied(slot) => {
                    let entry = slot.into_mut();
                    if let Some(settings) = settings {
                        entry.settings = settings;
                    }
                    entry
                }
                Entry::Vacant(slot) => {
                    let Some(settings) = settings else {
                        tracing::warn!(%id, "rejecting render for unknown widget without settings");
                        return Err(StoreError::RenderWithoutSettings(id));
                    };
                    let apis = handles.create(HandlePurpose::Apis, apis_source(&id));
                    slot.insert(WidgetEntry {
                        settings,
                        apis,
                        module: None,
                        state: RenderState::Loading,
                        latest: 0,
                        committed: 0,
                    })
                }
            };
            entry.latest += 1;
            entry.state = RenderState::Loading;
            let api_url = handles.url(entry.apis).unwrap_or_default();
            (entry.latest, api_url)
        };

        let loaded = self.loader.load(&id, &api_url).await;

        let mut inner = self.inner.lock().await;
        let Inner { entries, handles } = &mut *inner;
        let Some(entry) = entries.get_mut(&id) else {
            // Removed while loading; nothing was registered for this
            // generation, so there is nothing to release.
            tracing::debug!(%id, generation, "widget removed while its load was in flight");
            return Ok(());
        };
        if generation <= entry.committed {
            tracing::debug!(%id, generation, committed = entry.committed, "discarding stale load");
            return Ok(());
        }
        entry.committed = generation;

        match loaded {
            Ok(widget) => {
                let fresh = handles.create(HandlePurpose::Module, widget.source);
                // The previous module stays importable until its replacement
                // has fully loaded; only now is it released.
                if let Some(old) = entry.module.take() {
                    handles.revoke(old);
                }
                entry.module = Some(fresh);
                entry
                    .settings
                    .fill_unset_size(widget.declared_width, widget.declared_height);
                entry.state = RenderState::Rendered {
                    component: widget.component,
                };
                tracing::debug!(%id, generation, "widget rendered");
            }
            Err(err) => {
                if let Some(old) = entry.module.take() {
                    handles.revoke(old);
                }
                entry.state = RenderState::Errored {
                    title: err.title(),
                    message: err.to_string(),
                };
                tracing::warn!(%id, generation, error = %err, "widget load failed");
            }
        }
        Ok(())
    }

    /// Merge a partial settings update into an existing entry.
    pub async fn update_settings(&self, id: &str, patch: &SettingsPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.entries.get_mut(id) {
            Some(entry) => {
                entry.settings.apply(patch);
                Ok(())
            }
            None => {
                tracing::warn!(%id, "settings update for unknown widget");
                Err(StoreError::UnknownWidget(id.to_string()))
            }
        }
    }

    /// Delete an entry, revoking its handles. Returns how many handles were
    /// actually released; unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let Inner { entries, handles } = &mut *inner;
        let Some(entry) = entries.remove(id) else {
            return 0;
        };
        let mut revoked = usize::from(handles.revoke(entry.apis));
        if let Some(module) = entry.module {
            revoked += usize::from(handles.revoke(module));
        }
        tracing::debug!(%id, revoked, "widget removed");
        revoked
    }

    // ── Read accessors ───────────────────────────────────────────────

    pub async fn state(&self, id: &str) -> Option<RenderState> {
        self.inner.lock().await.entries.get(id).map(|e| e.state.clone())
    }

    pub async fn settings(&self, id: &str) -> Option<WidgetSettings> {
        self.inner
            .lock()
            .await
            .entries
            .get(id)
            .map(|e| e.settings.clone())
    }

    /// Pseudo-URL of the widget's personalized API module.
    pub async fn api_url(&self, id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        let entry = inner.entries.get(id)?;
        inner.handles.url(entry.apis)
    }

    /// Source behind the widget's live module handle, if rendered.
    pub async fn module_source(&self, id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        let entry = inner.entries.get(id)?;
        let module = entry.module?;
        inner.handles.source(module).map(str::to_string)
    }

    /// Number of live handles across all widgets.
    pub async fn live_handles(&self) -> usize {
        self.inner.lock().await.handles.len()
    }

    pub async fn widget_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock().await.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

// ===========================================================================
// Tests
// ===========================================================================
