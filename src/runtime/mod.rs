//! Dynamic loading: ephemeral handles, the module seam, and the load cycle.

pub mod handle;
pub mod loader;
pub mod module;

pub use handle::{HandleId, HandlePurpose, HandleStore};
pub use loader::{BundleHost, HostCallError, LoadError, LoadedWidget, Loader};
pub use module::{
    validate_shape, Component, ExportValue, ImportFailure, ModuleExports, ModuleRuntime,
    ShapeError,
};
