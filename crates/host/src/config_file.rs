use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::queries::{ConfigStore, HostError};

//
// ─── JSON CONFIG FILE ─────────────────────────────────────────────────────────
//

/// Stores the user configuration as a single JSON document on disk.
///
/// A missing file reads as an empty document, so a fresh profile starts
/// from the shipped defaults.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for JsonConfigFile {
    fn load(&self) -> Result<Value, HostError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|err| HostError::Serialization(err.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Value::Object(Map::new())),
            Err(err) => Err(HostError::Backend(err.to_string())),
        }
    }

    fn save(&self, config: &Value) -> Result<(), HostError> {
        let text = serde_json::to_string_pretty(config)
            .map_err(|err| HostError::Serialization(err.to_string()))?;
        fs::write(&self.path, text).map_err(|err| HostError::Backend(err.to_string()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
