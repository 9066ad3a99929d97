use std::io;
use std::path::PathBuf;

use markup_engine::{ConfigError, RenderError};
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the markup CLI application.
///
/// The engine degrades unresolved values to a placeholder, so most of these
/// come from the host side: reading the template and the data context, or
/// loading a configuration file.
#[derive(Error, Debug)]
pub enum Error {
    /// The engine configuration could not be loaded or was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The context file extension does not name a supported format.
    ///
    /// Contexts are read as JSON (`.json`) or TOML (`.toml`).
    #[error("Unsupported context format for {0:?}: expected a .json or .toml file")]
    ContextFormat(PathBuf),

    /// The context file exists but its content could not be parsed.
    #[error("Failed to parse context file {path:?}: {reason}")]
    ContextParse {
        /// Path of the context file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Failed to load a file from the filesystem.
    ///
    /// This wraps the underlying I/O error for the template or context file.
    #[error("Failed to load file {path:?}.")]
    LoadFile {
        /// Path of the file that failed to load
        path: PathBuf,
        /// The underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Failed to read the template from standard input.
    #[error("Failed to read the template from stdin.")]
    ReadStdIn(#[source] io::Error),

    /// The render itself failed on a resource guard or a propagated filter error.
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    /// Failed to write the rendered document to standard output.
    #[error("Failed to write to the std out buffer.")]
    StdOutWriteFailed,
}
