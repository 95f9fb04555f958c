//! Front-end parsers.
//!
//! The engine works on a generic key/value tree; these parsers only turn
//! unit text into that tree. The format is picked by file extension.

use std::path::Path;

/// Generic unit tree: an ordered map of keys to JSON-like values.
pub type RawMap = serde_json::Map<String, serde_json::Value>;

/// Supported unit formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFormat {
    Toml,
    Json,
}

impl UnitFormat {
    /// Pick the format for a unit path (`.json` is JSON, anything else TOML).
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => UnitFormat::Json,
            _ => UnitFormat::Toml,
        }
    }

    /// Parse unit text into a generic tree.
    pub fn parse(&self, text: &str) -> Result<RawMap, String> {
        let value: serde_json::Value = match self {
            UnitFormat::Toml => toml::from_str(text).map_err(|e| e.to_string())?,
            UnitFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string())?,
        };
        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err("expected a table at the top level".to_string()),
        }
    }
}
