//! # weft
//!
//! Widget bundling and live-loading pipeline for the Weft desktop widget
//! shell.
//!
//! Widgets are small web-style module trees (plain, typed, and markup source
//! flavors) living in per-widget directories. weft turns such a tree into a
//! single executable module string on demand, hands it to a module runtime
//! through a narrow seam, and tracks every live widget instance through a
//! keyed lifecycle store with revocable resource handles.
//!
//! ## Core Systems
//!
//! - **[`manifest`]** — `widget.json` parsing; invalid manifests are shown, not bundled
//! - **[`settings`]** — per-widget display settings and the partial-update merge law
//! - **[`bundle`]** — resolver, transformer, dependency collector, and assembler
//! - **[`runtime`]** — ephemeral handles, the module runtime seam, and the load cycle
//! - **[`store`]** — keyed lifecycle state machine with last-writer-wins renders
//! - **[`bus`]** — lifecycle event channel and in-order dispatcher
//! - **[`testing`]** — scriptable seams and on-disk widget fixtures

// Widget description
pub mod manifest;
pub mod settings;

// Bundling pipeline
pub mod bundle;

// Dynamic loading
pub mod runtime;

// Lifecycle
pub mod bus;
pub mod store;

// Test support
pub mod testing;
