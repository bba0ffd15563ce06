use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Transient on-disk copy of uploaded files
pub struct SourceCache {
    dir: PathBuf,
}

impl SourceCache {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Store bytes as `<stem>_<hash10>.<ext>` and return the path
    pub fn store(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.join(cached_file_name(filename, bytes));
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "Saved upload to cache");
        Ok(path)
    }

    /// Remove cached files last modified more than `days` ago; returns the count removed
    pub fn clear_older_than(&self, days: u64) -> std::io::Result<usize> {
        let max_age = Duration::from_secs(days * 24 * 60 * 60);
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age > max_age {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        tracing::info!(removed, days, "Cleared stale cached uploads");
        Ok(removed)
    }
}

fn cached_file_name(filename: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash = hex::encode(hasher.finalize());

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, &hash[..10], ext.to_string_lossy()),
        None => format!("{}_{}", stem, &hash[..10]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_name_is_content_addressed() {
        let a = cached_file_name("prog.cbl", b"hello world");
        let b = cached_file_name("prog.cbl", b"hello world");
        let c = cached_file_name("prog.cbl", b"different");

        assert_eq!(a, b);
        assert_ne!(a, c);
        // SHA-256("hello world") starts with b94d27b993
        assert_eq!(a, "prog_b94d27b993.cbl");
    }

    #[test]
    fn test_clear_older_than_keeps_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path()).unwrap();
        cache.store("a.cbl", b"one").unwrap();
        cache.store("b.cbl", b"two").unwrap();

        assert_eq!(cache.clear_older_than(1).unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
