//! Test support: scriptable seams and on-disk widget fixtures.
//!
//! Compiled into the library so downstream crates can drive the pipeline
//! headless, without a webview or a bundle host process.

pub mod fixture;
pub mod stub;

pub use fixture::WidgetFixture;
pub use stub::{StubHost, StubRuntime};
