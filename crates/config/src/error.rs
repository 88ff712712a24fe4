//! Error type for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, parsing or validating `ig.yaml` documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error while reading a configuration file.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML document did not parse.
    #[error("{path}: invalid YAML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Schema validation failed at a specific dotted path within the document.
    #[error("{path}: {field}: {message}")]
    Validation { path: PathBuf, field: String, message: String },

    /// A glob pattern in `workspace:` did not match any directory.
    #[error("{path}: workspace glob {glob:?} matched no directories")]
    GlobNoMatch { path: PathBuf, glob: String },

    /// An explicit `provider:` field named something neither adapter recognises.
    #[error("{path}: unknown provider {name:?}")]
    UnknownProvider { path: PathBuf, name: String },

    /// Strict mode: a workspace's provider could not be resolved by either
    /// an explicit field or directory detection.
    #[error("{path}: could not resolve a provider for this workspace")]
    UnresolvedProvider { path: PathBuf },

    /// An injection or `depends_on`/`output` entry did not match the
    /// `"<wsPathOrName>:<outputKey>"` grammar.
    #[error("{path}: {field}: malformed reference {value:?}, expected \"<workspace>:<key>\"")]
    MalformedReference { path: PathBuf, field: String, value: String },
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
