use std::path::PathBuf;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors a single filter can report while transforming a value.
///
/// Under the default [`FilterErrorPolicy::Passthrough`](crate::FilterErrorPolicy)
/// these never reach the caller: the pipeline logs them and carries the
/// previous value forward. They only surface through
/// [`RenderError::Filter`] when the engine is configured to propagate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The filter cannot operate on the value it was given.
    #[error("Filter '{filter}' cannot process the input: {reason}")]
    InvalidInput {
        /// Name of the filter that rejected its input
        filter: String,
        /// Description of why the input was rejected
        reason: String,
    },

    /// A required positional argument was not supplied.
    #[error("Filter '{filter}' is missing argument {position}")]
    MissingArgument {
        /// Name of the filter
        filter: String,
        /// One-based position of the missing argument
        position: usize,
    },

    /// An argument could not be interpreted, e.g. a non-numeric count.
    #[error("Filter '{filter}' received an invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Name of the filter
        filter: String,
        /// The raw argument text
        argument: String,
        /// Description of why the argument was rejected
        reason: String,
    },

    /// No filter with this name is registered.
    #[error("Unknown filter: {name}")]
    Unknown {
        /// The name that was looked up
        name: String,
    },

    /// The `call` filter targeted a method the value does not expose.
    #[error("Method not found: {method}")]
    MethodNotFound {
        /// The requested method name
        method: String,
    },
}

/// Errors that can be returned from a render call.
///
/// Ordinary misuse (unknown paths, unknown filters, unbalanced blocks)
/// never produces one of these; it degrades to the `???` placeholder or a
/// pass-through value instead. What remains are the resource guards and,
/// when requested, strict filter failures.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A filter failed while the engine runs with the propagate policy.
    #[error("Filter '{filter}' failed: {source}")]
    Filter {
        /// Name of the filter that failed
        filter: String,
        /// The underlying filter failure
        #[source]
        source: FilterError,
    },

    /// Nested renders (blocks, loops, includes) went deeper than allowed.
    ///
    /// This is usually caused by an include that refers to itself.
    #[error("Render depth limit of {limit} exceeded")]
    DepthLimit {
        /// The configured maximum depth
        limit: usize,
    },

    /// The template text is larger than the configured maximum.
    #[error("Template size {size} bytes exceeds limit of {limit} bytes")]
    TemplateTooLarge {
        /// Size of the rejected template in bytes
        size: usize,
        /// The configured maximum size in bytes
        limit: usize,
    },
}

/// Errors that can occur while loading an engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path:?}: {source}")]
    Io {
        /// Path of the file that failed to load
        path: PathBuf,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for an engine configuration.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A field holds a value the engine cannot work with.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Name of the offending field
        field: String,
        /// Description of the problem
        reason: String,
    },
}
