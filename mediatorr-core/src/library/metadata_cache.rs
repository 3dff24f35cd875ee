use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::types::{BestEffort, MediaKey, MediaType};

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

/// Normalised cache key: whitespace runs become `.`, then lowercase.
pub fn cache_key(name: &str) -> String {
    WHITESPACE_REGEX.replace_all(name, ".").to_lowercase()
}

/// Reader for the JSON metadata the scan job caches per item.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    tmdb_dir: PathBuf,
    itunes_dir: PathBuf,
}

impl MetadataCache {
    pub fn new(tmdb_dir: impl Into<PathBuf>, itunes_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmdb_dir: tmdb_dir.into(),
            itunes_dir: itunes_dir.into(),
        }
    }

    pub fn cache_path(&self, key: &MediaKey) -> PathBuf {
        let safe = cache_key(key.name());
        match key.media_type() {
            MediaType::Films => self.tmdb_dir.join(format!("movie_{safe}.json")),
            MediaType::Series => self.tmdb_dir.join(format!("tv_{safe}.json")),
            MediaType::Musiques => self.itunes_dir.join(format!("{safe}.json")),
        }
    }

    pub fn read(&self, key: &MediaKey) -> BestEffort<Value> {
        read_json(&self.cache_path(key))
    }

    pub fn remove(&self, key: &MediaKey) -> bool {
        let path = self.cache_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "cache entry not removed");
                }
                false
            }
        }
    }
}

/// Best-effort JSON read shared by the cache and `.srcinfo` sidecars.
pub(crate) fn read_json(path: &Path) -> BestEffort<Value> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return BestEffort::Absent;
        }
        Err(e) => return BestEffort::Malformed(e.to_string()),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => BestEffort::Present(value),
        Err(e) => BestEffort::Malformed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_collapses_whitespace_and_lowercases() {
        assert_eq!(cache_key("The Dark  Knight\t2008"), "the.dark.knight.2008");
        assert_eq!(cache_key("Already.Dotted"), "already.dotted");
    }

    #[test]
    fn read_distinguishes_absent_from_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let tmdb = dir.path().join("tmdb");
        let itunes = dir.path().join("itunes");
        std::fs::create_dir_all(&tmdb).unwrap();
        std::fs::create_dir_all(&itunes).unwrap();
        let cache = MetadataCache::new(&tmdb, &itunes);

        let film = MediaKey::new(MediaType::Films, "Heat 1995").unwrap();
        assert!(cache.read(&film).is_absent());

        std::fs::write(tmdb.join("movie_heat.1995.json"), "{not json").unwrap();
        assert!(cache.read(&film).is_malformed());

        std::fs::write(tmdb.join("movie_heat.1995.json"), r#"{"id":949}"#).unwrap();
        assert_eq!(cache.read(&film).ok().unwrap()["id"], 949);

        let album = MediaKey::new(MediaType::Musiques, "Kind of Blue").unwrap();
        assert_eq!(cache.cache_path(&album), itunes.join("kind.of.blue.json"));
        let show = MediaKey::new(MediaType::Series, "The Wire").unwrap();
        assert_eq!(cache.cache_path(&show), tmdb.join("tv_the.wire.json"));

        assert!(cache.remove(&film));
        assert!(!cache.remove(&film));
    }
}
