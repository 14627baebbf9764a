//! Error types for documentation generation.

use thiserror::Error;

/// Failure to load or navigate a schema document.
///
/// All variants are fatal: they abort the whole generation run, there is no
/// partial-document output.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse {location} as JSON: {source}")]
    JsonParse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {location} as YAML: {source}")]
    YamlParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("element {path} not found in {location}")]
    MissingPath { location: String, path: String },
}

/// Top-level error for a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("malformed $ref {ref_path:?} at {path}: {reason}")]
    Reference {
        ref_path: String,
        path: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
