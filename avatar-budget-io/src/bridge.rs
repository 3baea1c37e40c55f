//! Selection bridge exchange document
//!
//! An external authoring tool writes a small JSON document naming the
//! objects to keep and the objects to remove. [`BridgeCache`] re-reads it
//! only when its modification time changes.

use crate::error::BridgeError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Folder under the user's documents directory that holds the bridge file
pub const BRIDGE_DIR: &str = "VRChatAvatarOptimizer";

/// File name of the bridge document
pub const BRIDGE_FILE: &str = "vrchat_optimizer_bridge.json";

/// Snapshot of the bridge document. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangeDocument {
    pub avatar_name: String,
    pub timestamp: String,
    pub keep_objects: Vec<String>,
    pub remove_objects: Vec<String>,
    pub settings: Map<String, Value>,
}

/// Optimization settings an exchange document may override
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub target_triangles: Option<usize>,
    pub max_texture_size: Option<u32>,
    pub preserve_uvs: Option<bool>,
    pub remove_unused_bones: Option<bool>,
    pub decimate: Option<bool>,
    pub resize_textures: Option<bool>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ExchangeDocument {
    /// Read and parse a document
    pub fn read_from(path: &Path) -> Result<Self, BridgeError> {
        let file = File::open(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| BridgeError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the document as pretty JSON, creating the parent folder
    pub fn write_to(&self, path: &Path) -> Result<(), BridgeError> {
        let io_err = |source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| BridgeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(io_err)
    }

    /// Avatar name for display
    pub fn avatar_label(&self) -> &str {
        if self.avatar_name.is_empty() {
            "Unknown"
        } else {
            &self.avatar_name
        }
    }

    /// Whether either object list names anything
    pub fn has_selection(&self) -> bool {
        !self.keep_objects.is_empty() || !self.remove_objects.is_empty()
    }

    /// Known keys of `settings`. Missing or mistyped values are ignored.
    pub fn overrides(&self) -> ConfigOverrides {
        let uint = |key: &str| self.settings.get(key).and_then(Value::as_u64);
        let flag = |key: &str| self.settings.get(key).and_then(Value::as_bool);
        ConfigOverrides {
            target_triangles: uint("targetTriangles").and_then(|v| usize::try_from(v).ok()),
            max_texture_size: uint("maxTextureSize").and_then(|v| u32::try_from(v).ok()),
            preserve_uvs: flag("preserveUvs"),
            remove_unused_bones: flag("removeUnusedBones"),
            decimate: flag("decimate"),
            resize_textures: flag("resizeTextures"),
        }
    }
}

/// Default bridge location: `<home>/Documents/VRChatAvatarOptimizer/vrchat_optimizer_bridge.json`.
///
/// `None` when neither `HOME` nor `USERPROFILE` is set.
pub fn default_bridge_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .or_else(|| std::env::var_os("USERPROFILE").filter(|h| !h.is_empty()))?;
    Some(
        PathBuf::from(home)
            .join("Documents")
            .join(BRIDGE_DIR)
            .join(BRIDGE_FILE),
    )
}

/// Create the folder that holds the bridge file at `path`, returning it
pub fn ensure_bridge_dir(path: &Path) -> Result<PathBuf, BridgeError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    fs::create_dir_all(&dir).map_err(|source| BridgeError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    modified: SystemTime,
    // None when the file at this marker failed to parse
    document: Option<Arc<ExchangeDocument>>,
}

/// Exchange documents cached per path by modification time
#[derive(Debug, Default)]
pub struct BridgeCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl BridgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the document at `path`.
    ///
    /// Without `force`, an unchanged modification time returns the cached
    /// document without touching the file contents. A missing file drops the
    /// cache entry and returns `None`; an unreadable or malformed file is
    /// logged and returns `None`.
    pub fn load(&mut self, path: &Path, force: bool) -> Option<Arc<ExchangeDocument>> {
        let Some(current) = modified(path) else {
            if self.entries.remove(path).is_some() {
                debug!("bridge file {} disappeared", path.display());
            }
            return None;
        };

        if !force {
            if let Some(entry) = self.entries.get(path) {
                if entry.modified == current {
                    return entry.document.clone();
                }
            }
        }

        let document = match ExchangeDocument::read_from(path) {
            Ok(doc) => {
                info!(
                    "loaded bridge data for '{}': {} keep, {} remove",
                    doc.avatar_label(),
                    doc.keep_objects.len(),
                    doc.remove_objects.len()
                );
                Some(Arc::new(doc))
            }
            Err(err) => {
                warn!("error loading bridge data: {err}");
                None
            }
        };

        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                modified: current,
                document: document.clone(),
            },
        );
        document
    }

    /// Whether the file exists and its modification time differs from the
    /// one last loaded
    pub fn has_changed(&self, path: &Path) -> bool {
        match modified(path) {
            Some(current) => self
                .entries
                .get(path)
                .map_or(true, |entry| entry.modified != current),
            None => false,
        }
    }

    /// The cached document for `path`, if any, without checking the file
    pub fn cached(&self, path: &Path) -> Option<Arc<ExchangeDocument>> {
        self.entries.get(path).and_then(|e| e.document.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample() -> ExchangeDocument {
        ExchangeDocument {
            avatar_name: "Kitsune".to_string(),
            timestamp: "2024-05-01T12:00:00".to_string(),
            keep_objects: vec!["Body".to_string(), "Hair".to_string()],
            remove_objects: vec!["Hat".to_string()],
            settings: Map::new(),
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: ExchangeDocument =
            serde_json::from_str(r#"{"avatarName": "Fox", "keepObjects": ["Body"]}"#).unwrap();
        assert_eq!(doc.avatar_name, "Fox");
        assert_eq!(doc.keep_objects, vec!["Body"]);
        assert!(doc.remove_objects.is_empty());
        assert!(doc.settings.is_empty());
        assert!(doc.has_selection());
    }

    #[test]
    fn test_overrides() {
        let doc: ExchangeDocument = serde_json::from_str(
            r#"{"settings": {
                "targetTriangles": 32000,
                "maxTextureSize": 1024,
                "preserveUvs": false,
                "decimate": "yes",
                "somethingElse": 1
            }}"#,
        )
        .unwrap();
        let overrides = doc.overrides();
        assert_eq!(overrides.target_triangles, Some(32000));
        assert_eq!(overrides.max_texture_size, Some(1024));
        assert_eq!(overrides.preserve_uvs, Some(false));
        assert_eq!(overrides.decimate, None);
        assert_eq!(overrides.resize_textures, None);
        assert!(ExchangeDocument::default().overrides().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut cache = BridgeCache::new();
        let path = dir.path().join(BRIDGE_FILE);
        assert!(cache.load(&path, false).is_none());
        assert!(!cache.has_changed(&path));
    }

    #[test]
    fn test_load_caches_by_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(BRIDGE_FILE);
        sample().write_to(&path).unwrap();
        set_mtime(&path, 1_000);

        let mut cache = BridgeCache::new();
        assert!(cache.has_changed(&path));
        let first = cache.load(&path, false).unwrap();
        assert_eq!(first.avatar_name, "Kitsune");
        assert!(!cache.has_changed(&path));

        // same marker: contents are not re-read
        fs::write(&path, r#"{"avatarName": "Other"}"#).unwrap();
        set_mtime(&path, 1_000);
        let cached = cache.load(&path, false).unwrap();
        assert!(Arc::ptr_eq(&first, &cached));

        let forced = cache.load(&path, true).unwrap();
        assert_eq!(forced.avatar_name, "Other");

        set_mtime(&path, 2_000);
        assert!(cache.has_changed(&path));
        assert_eq!(cache.load(&path, false).unwrap().avatar_name, "Other");
    }

    #[test]
    fn test_deleted_file_drops_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(BRIDGE_FILE);
        sample().write_to(&path).unwrap();

        let mut cache = BridgeCache::new();
        assert!(cache.load(&path, false).is_some());
        fs::remove_file(&path).unwrap();
        assert!(cache.load(&path, false).is_none());
        assert!(cache.cached(&path).is_none());
    }

    #[test]
    fn test_malformed_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(BRIDGE_FILE);
        fs::write(&path, "{ not json").unwrap();

        let mut cache = BridgeCache::new();
        assert!(cache.load(&path, true).is_none());
        assert!(matches!(
            ExchangeDocument::read_from(&path),
            Err(BridgeError::Parse { .. })
        ));
    }

    #[test]
    fn test_ensure_bridge_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Documents").join(BRIDGE_DIR).join(BRIDGE_FILE);
        let created = ensure_bridge_dir(&path).unwrap();
        assert!(created.is_dir());
        assert!(created.ends_with(BRIDGE_DIR));
    }

    #[test]
    fn test_default_bridge_path_layout() {
        if let Some(path) = default_bridge_path() {
            assert!(path.ends_with(Path::new("Documents").join(BRIDGE_DIR).join(BRIDGE_FILE)));
        }
    }
}
