//! Scriptable stand-ins for the two load-cycle seams.
//!
//! [`StubHost`] answers bundle requests from a queue of scripted responses
//! (falling back to a fixed one), and can gate individual responses behind a
//! [`tokio::sync::Notify`] so tests control exactly when an in-flight load
//! completes. [`StubRuntime`] returns a fixed import outcome and records
//! every source it was asked to evaluate.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::Notify;

use crate::runtime::loader::{BundleHost, HostCallError};
use crate::runtime::module::{ExportValue, ImportFailure, ModuleExports, ModuleRuntime};

// ---------------------------------------------------------------------------
// StubHost
// ---------------------------------------------------------------------------

enum Scripted {
    Ready(Result<String, HostCallError>),
    /// Held until the notify fires, then answers with the code.
    Gated(Arc<Notify>, String),
}

struct HostState {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Result<String, HostCallError>,
    calls: Mutex<Vec<String>>,
}

/// A [`BundleHost`] answering from a script.
#[derive(Clone)]
pub struct StubHost {
    state: Arc<HostState>,
}

impl StubHost {
    fn with_fallback(fallback: Result<String, HostCallError>) -> Self {
        StubHost {
            state: Arc::new(HostState {
                queue: Mutex::new(VecDeque::new()),
                fallback,
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Always answer with `code` once the queue is drained.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self::with_fallback(Ok(code.into()))
    }

    /// Always fail once the queue is drained.
    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Err(HostCallError::new(message)))
    }

    /// Queue one successful response.
    pub fn enqueue_ok(&self, code: impl Into<String>) {
        self.push(Scripted::Ready(Ok(code.into())));
    }

    /// Queue one failing response.
    pub fn enqueue_err(&self, message: &str) {
        self.push(Scripted::Ready(Err(HostCallError::new(message))));
    }

    /// Queue a response that parks until the returned notify fires.
    pub fn enqueue_gated_ok(&self, code: impl Into<String>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Scripted::Gated(gate.clone(), code.into()));
        gate
    }

    /// Widget ids of every bundle request seen, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().expect("host calls lock").clone()
    }

    fn push(&self, scripted: Scripted) {
        self.state
            .queue
            .lock()
            .expect("host queue lock")
            .push_back(scripted);
    }
}

impl BundleHost for StubHost {
    async fn bundle(&self, widget_id: &str) -> Result<String, HostCallError> {
        self.state
            .calls
            .lock()
            .expect("host calls lock")
            .push(widget_id.to_string());
        let next = self.state.queue.lock().expect("host queue lock").pop_front();
        match next {
            Some(Scripted::Ready(response)) => response,
            Some(Scripted::Gated(gate, code)) => {
                gate.notified().await;
                Ok(code)
            }
            None => self.state.fallback.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// StubRuntime
// ---------------------------------------------------------------------------

struct RuntimeState {
    outcome: Result<ModuleExports, ImportFailure>,
    imported: Mutex<Vec<String>>,
}

/// A [`ModuleRuntime`] returning one fixed outcome.
#[derive(Clone)]
pub struct StubRuntime {
    state: Arc<RuntimeState>,
}

impl StubRuntime {
    /// Build from explicit exports.
    pub fn exporting(exports: ModuleExports) -> Self {
        StubRuntime {
            state: Arc::new(RuntimeState {
                outcome: Ok(exports),
                imported: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Default export is invocable (the common valid widget).
    pub fn component() -> Self {
        Self::exporting(ModuleExports {
            entries: [("default".to_string(), ExportValue::Invocable)].into(),
        })
    }

    /// Default export is an object with an invocable `render` member.
    pub fn render_member() -> Self {
        let members: BTreeMap<String, ExportValue> =
            [("render".to_string(), ExportValue::Invocable)].into();
        Self::exporting(ModuleExports {
            entries: [("default".to_string(), ExportValue::Object(members))].into(),
        })
    }

    /// A module that exports nothing at all.
    pub fn empty_exports() -> Self {
        Self::exporting(ModuleExports::default())
    }

    /// A component that also declares its own size.
    pub fn component_with_size(width: Option<f64>, height: Option<f64>) -> Self {
        let mut entries: BTreeMap<String, ExportValue> =
            [("default".to_string(), ExportValue::Invocable)].into();
        if let Some(w) = width {
            entries.insert("width".to_string(), ExportValue::Scalar(json!(w)));
        }
        if let Some(h) = height {
            entries.insert("height".to_string(), ExportValue::Scalar(json!(h)));
        }
        Self::exporting(ModuleExports { entries })
    }

    /// Every import fails with `message`.
    pub fn failing(message: &str) -> Self {
        StubRuntime {
            state: Arc::new(RuntimeState {
                outcome: Err(ImportFailure::new(message)),
                imported: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Every source this runtime was asked to import, in order.
    pub fn imported_sources(&self) -> Vec<String> {
        self.state
            .imported
            .lock()
            .expect("runtime imports lock")
            .clone()
    }
}

impl ModuleRuntime for StubRuntime {
    async fn import(&self, source: &str) -> Result<ModuleExports, ImportFailure> {
        self.state
            .imported
            .lock()
            .expect("runtime imports lock")
            .push(source.to_string());
        self.state.outcome.clone()
    }
}
