use std::path::{Path, PathBuf};

use tracing::debug;

use super::metadata_cache::MetadataCache;
use crate::types::{ArtifactKind, ArtifactSet, MediaKey, MediaType};

/// Locates and deletes the sidecar artifacts of library items.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    cache: MetadataCache,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, cache: MetadataCache) -> Self {
        Self {
            root: root.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn type_dir(&self, media_type: MediaType) -> PathBuf {
        self.root.join(media_type.as_str())
    }

    pub fn media_dir(&self, key: &MediaKey) -> PathBuf {
        self.type_dir(key.media_type()).join(key.name())
    }

    pub fn has_artifact(media_dir: &Path, name: &str, kind: ArtifactKind) -> bool {
        media_dir.join(kind.file_name(name)).exists()
    }

    pub fn artifact_set(media_dir: &Path, name: &str) -> ArtifactSet {
        let mut set = ArtifactSet::default();
        for kind in ArtifactKind::ALL {
            set.set(kind, Self::has_artifact(media_dir, name, kind));
        }
        set
    }

    /// Remove every sidecar of `key`. Returns how many files were removed.
    pub fn delete_artifacts(&self, key: &MediaKey) -> usize {
        self.delete_kinds(key, &ArtifactKind::ALL)
    }

    /// Remove the metadata-derived sidecars and the cached metadata so the
    /// next scan fetches it again. Release artifacts are left in place. The
    /// cache entry counts towards the returned total.
    pub fn delete_metadata_artifacts(&self, key: &MediaKey) -> usize {
        let removed = self.delete_kinds(key, &ArtifactKind::METADATA);
        if self.cache.remove(key) {
            debug!(%key, "metadata cache entry removed");
            removed + 1
        } else {
            removed
        }
    }

    fn delete_kinds(&self, key: &MediaKey, kinds: &[ArtifactKind]) -> usize {
        let dir = self.media_dir(key);
        kinds
            .iter()
            .filter(|kind| {
                let path = dir.join(kind.file_name(key.name()));
                match std::fs::remove_file(&path) {
                    Ok(()) => true,
                    Err(e) => {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            debug!(path = %path.display(), error = %e, "artifact not removed");
                        }
                        false
                    }
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, ArtifactStore, MediaKey) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("torrent");
        let tmdb = dir.path().join("tmdb");
        std::fs::create_dir_all(root.join("films/Heat")).unwrap();
        std::fs::create_dir_all(&tmdb).unwrap();
        let store = ArtifactStore::new(
            &root,
            MetadataCache::new(&tmdb, dir.path().join("itunes")),
        );
        let key = MediaKey::new(MediaType::Films, "Heat").unwrap();
        (dir, store, key)
    }

    #[test]
    fn artifact_set_reflects_files_on_disk() {
        let (_dir, store, key) = fixture();
        let media_dir = store.media_dir(&key);
        for kind in [ArtifactKind::Torrent, ArtifactKind::Nfo, ArtifactKind::Txt] {
            std::fs::write(media_dir.join(kind.file_name("Heat")), b"x").unwrap();
        }

        let set = ArtifactStore::artifact_set(&media_dir, "Heat");
        assert!(set.torrent && set.nfo && set.txt);
        assert!(!set.prez);
        assert!(!set.has_all_artifacts());

        std::fs::write(media_dir.join("Heat.prez.txt"), b"x").unwrap();
        assert!(ArtifactStore::artifact_set(&media_dir, "Heat").has_all_artifacts());
    }

    #[test]
    fn delete_metadata_keeps_release_artifacts() {
        let (dir, store, key) = fixture();
        let media_dir = store.media_dir(&key);
        for kind in ArtifactKind::ALL {
            std::fs::write(media_dir.join(kind.file_name("Heat")), b"x").unwrap();
        }
        let cached = dir.path().join("tmdb/movie_heat.json");
        std::fs::write(&cached, "{}").unwrap();

        assert_eq!(store.delete_metadata_artifacts(&key), 3);
        assert!(!cached.exists());
        let set = ArtifactStore::artifact_set(&media_dir, "Heat");
        assert!(set.torrent && set.nfo && set.source_nfo && set.srcinfo);
        assert!(!set.txt && !set.prez);

        assert_eq!(store.delete_artifacts(&key), 4);
        assert_eq!(store.delete_artifacts(&key), 0);
        assert_eq!(ArtifactStore::artifact_set(&media_dir, "Heat"), ArtifactSet::default());
    }
}
