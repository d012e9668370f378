//! On-disk widget tree builder for tests.
//!
//! Builds a widget directory (manifest plus source files) under a root the
//! caller owns, typically a `tempfile::TempDir`. Paths are relative to the
//! widget directory and intermediate directories are created on demand.
//!
//! ```no_run
//! # use weft::testing::WidgetFixture;
//! # let root = std::path::Path::new("/tmp/widgets");
//! let fixture = WidgetFixture::new(root, "clock")
//!     .manifest("clock", "index.tsx", &[("dayjs", "^1.11.0")])
//!     .file("index.tsx", "export default function Clock() { return <span/>; }");
//! let entry = fixture.entry_path();
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::MANIFEST_FILE;

pub struct WidgetFixture {
    dir: PathBuf,
    entry: PathBuf,
}

impl WidgetFixture {
    /// Create the widget directory `<root>/<id>`.
    pub fn new(root: &Path, id: &str) -> Self {
        let dir = root.join(id);
        fs::create_dir_all(&dir).expect("create widget fixture dir");
        WidgetFixture {
            dir,
            entry: PathBuf::from("index.js"),
        }
    }

    /// Write a well-formed `widget.json`.
    pub fn manifest(mut self, name: &str, entry: &str, dependencies: &[(&str, &str)]) -> Self {
        let deps: BTreeMap<&str, &str> = dependencies.iter().copied().collect();
        let body = serde_json::json!({
            "name": name,
            "entry": entry,
            "dependencies": deps,
        });
        self.entry = PathBuf::from(entry);
        self.write(MANIFEST_FILE, &body.to_string());
        self
    }

    /// Write a raw (possibly malformed) manifest.
    pub fn raw_manifest(self, text: &str) -> Self {
        self.write(MANIFEST_FILE, text);
        self
    }

    /// Write one source file, relative to the widget directory.
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.write(rel, content);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of the manifest's entry file.
    pub fn entry_path(&self) -> PathBuf {
        self.dir.join(&self.entry)
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture parent dir");
        }
        fs::write(path, content).expect("write fixture file");
    }
}
