//! Temporary fixture files.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use crate::fixtures::{compliant_capabilities_json, weather_capabilities_json};

/// Write `value` as pretty JSON to `dir/name`.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(value).expect("fixture JSON serializes");
    std::fs::write(&path, text).expect("Failed to write fixture file");
    path
}

/// A temporary directory holding `weather.json` and `ocean.json`
/// capabilities documents.
pub fn capabilities_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_json(dir.path(), "weather.json", &weather_capabilities_json());
    write_json(dir.path(), "ocean.json", &compliant_capabilities_json());
    dir
}
