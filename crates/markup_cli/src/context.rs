//! Loading of the data context and template text for a render.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use markup_engine::{Map, Value};
use tracing::{debug, info};

use crate::errors::Error;

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

/// Path argument that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

/// Reads the template text from `path`, or from stdin when the path is `-`.
pub fn load_template(path: &Path) -> Result<String, Error> {
    if path == Path::new(STDIN_PATH) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(Error::ReadStdIn)?;
        debug!(bytes = text.len(), "Read template from stdin");
        return Ok(text);
    }

    let text = fs::read_to_string(path).map_err(|source| Error::LoadFile {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = ?path, bytes = text.len(), "Read template file");
    Ok(text)
}

/// Loads the render context from a JSON or TOML file.
///
/// The format is picked from the file extension. Without a path the context
/// is an empty mapping, so only globals and includes resolve.
pub fn load_context(path: Option<&Path>) -> Result<Value, Error> {
    let Some(path) = path else {
        return Ok(Value::Map(Map::new()));
    };

    let format = ContextFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| Error::LoadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let context = format
        .parse(&content)
        .map_err(|reason| Error::ContextParse {
            path: path.to_path_buf(),
            reason,
        })?;

    info!(path = ?path, format = ?format, "Loaded render context");
    Ok(context)
}

/// Turns the text of a `-D name=value` override into a value.
///
/// Text that reads as a JSON scalar, array or object keeps that type; anything
/// else is taken as a plain string, so `-D name=Ann` needs no quoting.
pub fn parse_global_value(text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Value::from(json),
        Err(_) => Value::from(text),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextFormat {
    Json,
    Toml,
}

impl ContextFormat {
    fn from_path(path: &Path) -> Result<Self, Error> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(Error::ContextFormat(PathBuf::from(path))),
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        }
    }
}
