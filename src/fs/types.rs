use std::collections::HashMap;
use std::path::PathBuf;

use crate::sync::hash::FINGERPRINT_METADATA_KEY;
use crate::sync::paths::PathKey;

/// An object as reported by a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    pub size: u64,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content_type: None,
            metadata: HashMap::new(),
            size: 0,
        }
    }

    /// Look up a user metadata value. Names are matched case-insensitively
    /// since some stores hand them back lowercased.
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .get(name)
            .or_else(|| {
                self.metadata
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// The stored content fingerprint, if the object carries one
    pub fn fingerprint(&self) -> Option<&str> {
        self.metadata_value(FINGERPRINT_METADATA_KEY)
    }
}

/// A regular file found under the sync root.
#[derive(Debug, Clone)]
pub struct LocalFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Object key the file maps to
    pub object_key: String,
    pub key: PathKey,
    pub size: u64,
}

