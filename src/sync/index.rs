//! Snapshot of the remote container keyed by local-equivalent path.

use std::collections::HashMap;
use std::path::Path;

use crate::fs::types::RemoteObject;
use crate::sync::paths::PathKey;

/// Read-only map PathKey -> RemoteObject built from one listing.
#[derive(Debug, Clone, Default)]
pub struct RemoteIndex {
    objects: HashMap<PathKey, RemoteObject>,
    /// Objects whose key folds onto an indexed one; always redundant
    shadowed: Vec<RemoteObject>,
}

impl RemoteIndex {
    /// Build the index from a listing. Keys are resolved under `base`.
    ///
    /// Two objects whose keys differ only by case map to the same PathKey; the
    /// later one in listing order is indexed and the earlier one is shadowed.
    pub fn build(base: &Path, objects: impl IntoIterator<Item = RemoteObject>) -> Self {
        let mut index = HashMap::new();
        let mut shadowed = Vec::new();

        for object in objects {
            let key = PathKey::from_object_key(base, &object.key);
            if let Some(previous) = index.insert(key, object) {
                tracing::debug!(
                    shadowed = %previous.key,
                    "remote keys collide case-insensitively, keeping the later one"
                );
                shadowed.push(previous);
            }
        }

        Self {
            objects: index,
            shadowed,
        }
    }

    pub fn get(&self, key: &PathKey) -> Option<&RemoteObject> {
        self.objects.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, &RemoteObject)> {
        self.objects.iter()
    }

    /// Duplicate spellings dropped from the map
    pub fn shadowed(&self) -> &[RemoteObject] {
        &self.shadowed
    }
}
