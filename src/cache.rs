//! Incremental build cache.
//!
//! A JSON manifest at `<outDir>/.cache/manifest.json` maps source keys
//! to a content hash and the artifact paths the last build produced. A
//! unit is skipped when its hash matches and every recorded output
//! still exists on disk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub outputs: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    files: BTreeMap<String, CacheEntry>,
}

pub struct BuildCache {
    manifest_path: PathBuf,
    manifest: Manifest,
}

impl BuildCache {
    /// Load the manifest for an output directory, starting empty when
    /// missing or unreadable.
    pub fn load(out_dir: &Path) -> Self {
        let manifest_path = out_dir.join(".cache").join("manifest.json");
        let manifest = fs::read_to_string(&manifest_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        BuildCache {
            manifest_path,
            manifest,
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.manifest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(&self.manifest_path, json)
    }

    /// Key for a standalone source file: its absolute path.
    pub fn file_key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Key for a directory group.
    pub fn dir_key(path: &Path) -> String {
        format!("dir:{}", path.to_string_lossy())
    }

    /// SHA-256 over the UTF-8 bytes, first 16 hex chars.
    pub fn hash_source(source: &str) -> String {
        let digest = Sha256::digest(source.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..16].to_string()
    }

    /// Group hash: `path || 0x00 || content` over the sorted file list.
    pub fn hash_group(files: &[(PathBuf, String)]) -> String {
        let mut sorted: Vec<&(PathBuf, String)> = files.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut hasher = Sha256::new();
        for (path, content) in sorted {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(content.as_bytes());
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..16].to_string()
    }

    /// Cached iff the hash matches and every recorded output is still
    /// on disk.
    pub fn is_up_to_date(&self, key: &str, hash: &str) -> bool {
        match self.manifest.files.get(key) {
            Some(entry) => {
                entry.hash == hash && entry.outputs.iter().all(|out| Path::new(out).exists())
            }
            None => false,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.manifest.files.get(key)
    }

    pub fn set(&mut self, key: String, hash: String, outputs: Vec<String>) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.manifest.files.insert(
            key,
            CacheEntry {
                hash,
                outputs,
                timestamp,
            },
        );
    }

    /// Drop entries whose source files or directories no longer exist.
    pub fn prune(&mut self) {
        self.manifest.files.retain(|key, _| {
            let path = key.strip_prefix("dir:").unwrap_or(key);
            Path::new(path).exists()
        });
    }

    pub fn len(&self) -> usize {
        self.manifest.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_short() {
        let a = BuildCache::hash_source("client { state n = 0 }");
        let b = BuildCache::hash_source("client { state n = 0 }");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, BuildCache::hash_source("client { state n = 1 }"));
    }

    #[test]
    fn test_group_hash_order_independent() {
        let files1 = vec![
            (PathBuf::from("/p/a.tova"), "aa".to_string()),
            (PathBuf::from("/p/b.tova"), "bb".to_string()),
        ];
        let files2 = vec![
            (PathBuf::from("/p/b.tova"), "bb".to_string()),
            (PathBuf::from("/p/a.tova"), "aa".to_string()),
        ];
        assert_eq!(
            BuildCache::hash_group(&files1),
            BuildCache::hash_group(&files2)
        );
    }

    #[test]
    fn test_group_hash_sensitive_to_paths() {
        let files1 = vec![(PathBuf::from("/p/a.tova"), "same".to_string())];
        let files2 = vec![(PathBuf::from("/p/b.tova"), "same".to_string())];
        assert_ne!(
            BuildCache::hash_group(&files1),
            BuildCache::hash_group(&files2)
        );
    }

    #[test]
    fn test_missing_output_invalidates() {
        let dir = std::env::temp_dir().join("tova-cache-test");
        fs::create_dir_all(&dir).unwrap();
        let mut cache = BuildCache::load(&dir);
        cache.set(
            "k".to_string(),
            "h".to_string(),
            vec!["/definitely/not/here.js".to_string()],
        );
        assert!(!cache.is_up_to_date("k", "h"));
        fs::remove_dir_all(&dir).ok();
    }
}
