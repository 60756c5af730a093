// Path mapping between the local sync tree and remote object keys
// Object keys always use forward slashes; local paths use the platform separator

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{Result, SyncError};

/// Identity shared by local files and remote objects: the normalized absolute
/// local path, compared case-insensitively (ordinal, per character).
#[derive(Debug, Clone)]
pub struct PathKey {
    path: PathBuf,
    folded: String,
}

impl PathKey {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = clean_path(path.as_ref());
        let folded = fold_case(&path.to_string_lossy());
        Self { path, folded }
    }

    /// Key for a remote object, resolved under `base`
    pub fn from_object_key(base: &Path, key: &str) -> Self {
        Self::new(to_local_path(base, key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Case-folded form used for equality and ordering
    pub fn folded(&self) -> &str {
        &self.folded
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

fn fold_case(value: &str) -> String {
    value.chars().flat_map(char::to_lowercase).collect()
}

/// Map a local file under `base` to its object key.
///
/// The base prefix is stripped and the remaining components are joined with `/`.
/// Fails with `InvalidArgument` if the path is not strictly under `base`.
pub fn to_object_key(base: &Path, local_path: &Path) -> Result<String> {
    let base = clean_path(base);
    let local = clean_path(local_path);

    let relative = local.strip_prefix(&base).map_err(|_| {
        SyncError::invalid_argument(format!(
            "{} is not under the sync root {}",
            local.display(),
            base.display()
        ))
    })?;

    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(&part.to_string_lossy());
            }
            _ => {
                return Err(SyncError::invalid_argument(format!(
                    "{} cannot be expressed as an object key",
                    local.display()
                )))
            }
        }
    }

    if key.is_empty() {
        return Err(SyncError::invalid_argument(format!(
            "{} is the sync root itself, not a file under it",
            local.display()
        )));
    }

    Ok(key)
}

/// Map an object key back to the local path it mirrors under `base`.
///
/// Forward slashes become the platform separator, leading separators are dropped
/// and the joined path is normalized lexically (no filesystem access).
pub fn to_local_path(base: &Path, key: &str) -> PathBuf {
    let relative: String = key
        .chars()
        .map(|c| if c == '/' { MAIN_SEPARATOR } else { c })
        .collect();
    let relative = relative.trim_start_matches(MAIN_SEPARATOR);

    clean_path(&base.join(relative))
}

/// Resolve the user-supplied sync root to an absolute, normalized directory path.
pub fn resolve_root(local_path: &str) -> Result<PathBuf> {
    if local_path.trim().is_empty() {
        return Err(SyncError::invalid_argument("local path must not be blank"));
    }

    let path = Path::new(local_path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| SyncError::from_io_error(e, "resolving working directory for", path))?;
        cwd.join(path)
    };
    let root = clean_path(&absolute);

    if !root.is_dir() {
        return Err(SyncError::invalid_argument(format!(
            "local path {} is not a directory",
            root.display()
        )));
    }

    Ok(root)
}

/// Clean a path by removing redundant components like "." and ".."
/// This provides a normalized form without requiring the path to exist
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => {
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    }
                    // ".." at the root stays at the root
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => components.push(component),
                }
            }
            _ => components.push(component),
        }
    }

    let mut result = PathBuf::new();
    for component in components {
        result.push(component);
    }

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}
