//! Shared helpers for command handlers.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Read a UTF-8 file, mapping a missing file to `NotFound`.
pub fn read_text(what: &str, path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::NotFound {
            what: what.into(),
            path: path.display().to_string(),
        },
        _ => CliError::Io(e),
    })
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(what: &str, path: &Path) -> Result<T, CliError> {
    let text = read_text(what, path)?;
    Ok(serde_json::from_str(&text)?)
}
