//! Ephemeral handle registry.
//!
//! The presentation surface cannot hold Rust references, so every live
//! resource it sees — a widget's personalized API module, an imported bundle
//! — is represented by a revocable handle with a derived pseudo-URL. Handles
//! are slotmap keys: revocation frees the slot and the generation bump makes
//! any retained copy of the key fail closed.

use slotmap::{new_key_type, Key, SlotMap};

new_key_type! {
    /// Generational key for one ephemeral resource.
    pub struct HandleId;
}

/// What a handle stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePurpose {
    /// A widget's personalized API module.
    Apis,
    /// An imported widget bundle.
    Module,
}

impl HandlePurpose {
    fn segment(self) -> &'static str {
        match self {
            HandlePurpose::Apis => "apis",
            HandlePurpose::Module => "modules",
        }
    }
}

#[derive(Debug)]
struct Handle {
    purpose: HandlePurpose,
    source: String,
}

/// Registry of live handles. Owned behind the store's mutex; all lifetime
/// bookkeeping goes through here.
#[derive(Default)]
pub struct HandleStore {
    entries: SlotMap<HandleId, Handle>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and get its handle.
    pub fn create(&mut self, purpose: HandlePurpose, source: String) -> HandleId {
        let id = self.entries.insert(Handle { purpose, source });
        tracing::debug!(handle = ?id, ?purpose, "handle created");
        id
    }

    /// Free a handle. Returns whether it was live; revoking a stale or
    /// already-revoked handle is a no-op reported as `false`.
    pub fn revoke(&mut self, id: HandleId) -> bool {
        let live = self.entries.remove(id).is_some();
        if live {
            tracing::debug!(handle = ?id, "handle revoked");
        }
        live
    }

    /// The pseudo-URL the presentation surface addresses this handle by.
    pub fn url(&self, id: HandleId) -> Option<String> {
        self.entries
            .get(id)
            .map(|h| format!("weft://{}/{:x}", h.purpose.segment(), id.data().as_ffi()))
    }

    /// The source text behind a live handle.
    pub fn source(&self, id: HandleId) -> Option<&str> {
        self.entries.get(id).map(|h| h.source.as_str())
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
