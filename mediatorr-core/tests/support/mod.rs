#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediatorr_core::library::{ArtifactStore, MediaCatalog, MetadataCache};
use mediatorr_core::overrides::SqliteOverrideRepository;
use mediatorr_core::ArtifactKind;
use tempfile::TempDir;

pub struct Library {
    pub dir: TempDir,
    pub catalog: MediaCatalog,
}

impl Library {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("torrent");
        for media_type in ["films", "series", "musiques"] {
            std::fs::create_dir_all(root.join(media_type)).expect("type dir");
        }
        std::fs::create_dir_all(dir.path().join("cache_tmdb")).expect("tmdb dir");
        std::fs::create_dir_all(dir.path().join("cache_itunes")).expect("itunes dir");

        let cache = MetadataCache::new(
            dir.path().join("cache_tmdb"),
            dir.path().join("cache_itunes"),
        );
        let overrides = SqliteOverrideRepository::connect(dir.path().join("mediatorr.db"))
            .await
            .expect("override store");
        let catalog = MediaCatalog::new(
            ArtifactStore::new(&root, cache),
            Arc::new(overrides),
            dir.path().join("status.json"),
        );

        Self { dir, catalog }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("torrent")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an item directory with the given artifacts.
    pub fn add_item(&self, media_type: &str, name: &str, kinds: &[ArtifactKind]) -> PathBuf {
        let item = self.root().join(media_type).join(name);
        std::fs::create_dir_all(&item).expect("item dir");
        for kind in kinds {
            std::fs::write(item.join(kind.file_name(name)), name).expect("artifact");
        }
        item
    }
}
