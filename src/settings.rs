//! Session settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Per-session settings, carried by the [`Session`](crate::Session) so that nothing reads a
/// process-wide theme or title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Document title.
    pub title: String,
    /// Name of the client-side theme.
    pub theme: String,
    pub font_family: String,
    /// Base font size in pixels.
    pub font_size: u32,
    /// Heartbeat interval in seconds. No heartbeat runs if this is absent or zero.
    pub heartbeat_seconds: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            title: "perch".to_string(),
            theme: "base".to_string(),
            font_family: "sans-serif".to_string(),
            font_size: 14,
            heartbeat_seconds: None,
        }
    }
}

impl Settings {
    /// Parses settings from a JSON document. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Settings> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Settings::from_json(&json)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
use std::io::Write;

#[test]
fn partial_document_keeps_defaults() {
    let settings = Settings::from_json(r#"{ "title": "Console", "heartbeat_seconds": 5 }"#)
        .unwrap();
    assert_eq!(settings.title, "Console");
    assert_eq!(settings.theme, "base");
    assert_eq!(settings.font_size, 14);
    assert_eq!(settings.heartbeat_interval(), Some(Duration::from_secs(5)));
}

#[test]
fn zero_interval_disables_heartbeat() {
    let settings = Settings::from_json(r#"{ "heartbeat_seconds": 0 }"#).unwrap();
    assert_eq!(settings.heartbeat_interval(), None);
    assert_eq!(Settings::default().heartbeat_interval(), None);
}

#[test]
fn invalid_documents_are_errors() {
    assert!(matches!(
        Settings::from_json("{ \"font_size\": \"big\" }"),
        Err(Error::Settings(_))
    ));
    assert!(matches!(
        Settings::load("/nonexistent/perch-settings.json"),
        Err(Error::Io { .. })
    ));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "theme": "dark", "font_family": "serif" }}"#).unwrap();
    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.theme, "dark");
    assert_eq!(settings.font_family, "serif");
    assert_eq!(settings.title, "perch");
}
