//! Schema document loading and caching.
//!
//! [`SchemaLoader`] fetches a schema document from a local path or a remote
//! URL, parses it (JSON or YAML), and caches the parsed document by canonical
//! location so a given document is parsed at most once per generation run.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::LoadError;
use crate::node::PathSegment;

/// Timeout for remote `$ref` fetches. Fetch failure is fatal for the run.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads and caches schema documents for one generation run.
pub struct SchemaLoader {
    cache: HashMap<String, Value>,
    client: Option<reqwest::blocking::Client>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            client: None,
        }
    }

    /// Create a loader with already-parsed documents merged into the cache,
    /// keyed by canonical location. Lets a caller inject documents it already
    /// has in memory instead of re-fetching them.
    pub fn with_preloaded(preloaded: HashMap<String, Value>) -> Self {
        Self {
            cache: preloaded,
            client: None,
        }
    }

    /// Load the document at `location` and navigate to `path` within it.
    ///
    /// `location` must already be canonical: an absolute local path with
    /// symlinks resolved, or a URL. An empty `path` returns the whole
    /// document. The returned fragment is an owned copy; the parsed document
    /// itself stays cached.
    pub fn load(&mut self, location: &str, path: &[PathSegment]) -> Result<Value, LoadError> {
        if !self.cache.contains_key(location) {
            tracing::debug!(location, "loading schema document");
            let document = self.fetch_and_parse(location)?;
            self.cache.insert(location.to_string(), document);
        } else {
            tracing::debug!(location, "schema document already cached");
        }

        let mut current = self
            .cache
            .get(location)
            .expect("document was just inserted");

        for segment in path {
            let next = match (current, segment) {
                (Value::Object(map), PathSegment::Key(key)) => map.get(key.as_str()),
                (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
                // An anchor segment parsed as a key can still address an
                // array element when the segment is numeric.
                (Value::Array(items), PathSegment::Key(key)) => {
                    key.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            };
            current = next.ok_or_else(|| LoadError::MissingPath {
                location: location.to_string(),
                path: PathSegment::join(path),
            })?;
        }

        Ok(current.clone())
    }

    fn fetch_and_parse(&mut self, location: &str) -> Result<Value, LoadError> {
        if location.starts_with("http") {
            let client = self.client()?;
            let response = client
                .get(location)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| LoadError::Fetch {
                    location: location.to_string(),
                    source: e,
                })?;

            if location.ends_with(".yaml") {
                let text = response.text().map_err(|e| LoadError::Fetch {
                    location: location.to_string(),
                    source: e,
                })?;
                serde_yaml::from_str(&text).map_err(|e| LoadError::YamlParse {
                    location: location.to_string(),
                    source: e,
                })
            } else {
                response.json().map_err(|e| LoadError::Fetch {
                    location: location.to_string(),
                    source: e,
                })
            }
        } else {
            let content = std::fs::read_to_string(location).map_err(|e| LoadError::Io {
                location: location.to_string(),
                source: e,
            })?;

            let is_json = Path::new(location)
                .extension()
                .is_some_and(|ext| ext == "json");
            if is_json {
                serde_json::from_str(&content).map_err(|e| LoadError::JsonParse {
                    location: location.to_string(),
                    source: e,
                })
            } else {
                serde_yaml::from_str(&content).map_err(|e| LoadError::YamlParse {
                    location: location.to_string(),
                    source: e,
                })
            }
        }
    }

    fn client(&mut self) -> Result<&reqwest::blocking::Client, LoadError> {
        if self.client.is_none() {
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(|e| LoadError::Fetch {
                    location: String::new(),
                    source: e,
                })?;
            self.client = Some(client);
        }
        Ok(self.client.as_ref().expect("client was just built"))
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalize a schema location for use as a cache key and node identity.
///
/// URLs pass through unchanged; local paths become absolute with symlinks
/// resolved.
pub fn canonicalize_location(location: &str) -> Result<String, LoadError> {
    if location.contains("://") {
        return Ok(location.to_string());
    }
    let canonical = std::fs::canonicalize(location).map_err(|e| LoadError::Io {
        location: location.to_string(),
        source: e,
    })?;
    Ok(canonical.to_string_lossy().into_owned())
}
