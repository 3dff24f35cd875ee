use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::artifacts::ArtifactStore;
use super::metadata_cache::read_json;
use crate::error::{MediaError, Result};
use crate::overrides::{OverrideRepository, OverrideView};
use crate::types::{ArtifactKind, ArtifactSet, MediaKey, MediaType};

static SAFE_FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("filename regex should compile")
});

pub const DEFAULT_PER_PAGE: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
}

impl SortOrder {
    /// Unknown values fall back to `name_asc`.
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "name_desc" => SortOrder::NameDesc,
            "date_asc" => SortOrder::DateAsc,
            "date_desc" => SortOrder::DateDesc,
            _ => SortOrder::NameAsc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub sort: SortOrder,
    /// 1-indexed.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortOrder::NameAsc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListItem {
    pub name: String,
    pub files: ArtifactSet,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    pub items: Vec<MediaListItem>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub name: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of one item. Rebuilt on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetail {
    pub name: String,
    pub media_type: MediaType,
    pub files: Vec<MediaFile>,
    pub artifacts: ArtifactSet,
    pub has_all_artifacts: bool,
    pub metadata: Option<Value>,
    pub txt_content: Option<String>,
    pub source_info: Option<Value>,
    #[serde(rename = "override")]
    pub override_: Option<OverrideView>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub films: TypeStats,
    pub series: TypeStats,
    pub musiques: TypeStats,
    pub total_size: u64,
    pub last_scan: Option<DateTime<Utc>>,
}

/// Read model over the library: listings, detail views, guarded file reads
/// and statistics.
///
/// Filesystem methods are synchronous; call them from a blocking context.
/// [`MediaCatalog::detail`] hops to the blocking pool on its own because it
/// also consults the override store.
#[derive(Clone)]
pub struct MediaCatalog {
    store: ArtifactStore,
    overrides: Arc<dyn OverrideRepository>,
    status_file: PathBuf,
}

impl fmt::Debug for MediaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCatalog")
            .field("root", &self.store.root())
            .field("status_file", &self.status_file)
            .finish_non_exhaustive()
    }
}

impl MediaCatalog {
    pub fn new(
        store: ArtifactStore,
        overrides: Arc<dyn OverrideRepository>,
        status_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            overrides,
            status_file: status_file.into(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn overrides(&self) -> &Arc<dyn OverrideRepository> {
        &self.overrides
    }

    pub fn list(&self, media_type: MediaType, query: &ListQuery) -> MediaPage {
        let page = query.page.max(1);
        let per_page = query.per_page.max(1);
        let type_dir = self.store.type_dir(media_type);

        let entries = match std::fs::read_dir(&type_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %type_dir.display(), error = %e, "type directory unavailable");
                return MediaPage {
                    items: Vec::new(),
                    total: 0,
                    page,
                    total_pages: 0,
                };
            }
        };

        let needle = query.search.to_lowercase();
        let mut items: Vec<MediaListItem> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                // Symlinked item directories count as items.
                let metadata = std::fs::metadata(entry.path()).ok()?;
                if !metadata.is_dir() {
                    return None;
                }
                let name = entry.file_name().into_string().ok()?;
                if !needle.is_empty() && !name.to_lowercase().contains(&needle) {
                    return None;
                }
                Some(MediaListItem {
                    files: ArtifactStore::artifact_set(&entry.path(), &name),
                    modified_at: modified_at(metadata.modified()),
                    name,
                })
            })
            .collect();

        sort_items(&mut items, query.sort);

        let total = items.len();
        let total_pages = total.div_ceil(per_page);
        let start = (page - 1).saturating_mul(per_page);
        let items = items.into_iter().skip(start).take(per_page).collect();

        MediaPage {
            items,
            total,
            page,
            total_pages,
        }
    }

    /// `None` iff the item directory does not exist. Every other read is
    /// best effort and degrades to an empty field.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn detail(&self, key: &MediaKey) -> Result<Option<MediaDetail>> {
        let store = self.store.clone();
        let owned_key = key.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || read_detail(&store, &owned_key))
                .await
                .map_err(|e| {
                    MediaError::Internal(format!("Detail task failed: {e}"))
                })?;

        let Some(mut detail) = snapshot else {
            return Ok(None);
        };

        if key.media_type().supports_overrides() {
            match self.overrides.get(key).await {
                Ok(found) => {
                    detail.override_ = found.as_ref().map(OverrideView::from);
                }
                Err(e) => {
                    warn!(error = %e, "override lookup failed; showing item without override");
                }
            }
        }

        Ok(Some(detail))
    }

    /// Guarded read of one file inside an item directory. Every refusal and
    /// every read error is reported as `None`.
    pub fn file_content(
        &self,
        media_type: MediaType,
        name: &str,
        filename: &str,
    ) -> Option<String> {
        let key = MediaKey::new(media_type, name).ok()?;
        if !SAFE_FILENAME_REGEX.is_match(filename) {
            debug!(%key, filename, "refusing unsafe filename");
            return None;
        }

        let media_dir = normalize_lexically(&self.store.media_dir(&key));
        let path = normalize_lexically(&media_dir.join(filename));
        if path == media_dir || !path.starts_with(&media_dir) {
            debug!(%key, filename, "refusing path outside item directory");
            return None;
        }

        std::fs::read_to_string(&path).ok()
    }

    pub fn stats(&self) -> LibraryStats {
        let count = |media_type: MediaType| TypeStats {
            count: std::fs::read_dir(self.store.type_dir(media_type))
                .map(|entries| {
                    entries
                        .filter_map(|entry| entry.ok())
                        .filter(|entry| {
                            std::fs::metadata(entry.path())
                                .map(|m| m.is_dir())
                                .unwrap_or(false)
                        })
                        .count()
                })
                .unwrap_or(0),
        };

        LibraryStats {
            films: count(MediaType::Films),
            series: count(MediaType::Series),
            musiques: count(MediaType::Musiques),
            total_size: total_size(self.store.root()),
            last_scan: std::fs::metadata(&self.status_file)
                .ok()
                .and_then(|m| modified_at(m.modified())),
        }
    }

    pub fn delete_artifacts(&self, key: &MediaKey) -> usize {
        self.store.delete_artifacts(key)
    }

    pub fn delete_metadata_artifacts(&self, key: &MediaKey) -> usize {
        self.store.delete_metadata_artifacts(key)
    }
}

fn read_detail(store: &ArtifactStore, key: &MediaKey) -> Option<MediaDetail> {
    let media_dir = store.media_dir(key);
    let dir_metadata = std::fs::metadata(&media_dir).ok()?;
    if !dir_metadata.is_dir() {
        return None;
    }

    let mut files: Vec<MediaFile> = std::fs::read_dir(&media_dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let metadata = entry.metadata().ok()?;
                    if !metadata.is_file() {
                        return None;
                    }
                    Some(MediaFile {
                        name: entry.file_name().into_string().ok()?,
                        size: metadata.len(),
                        modified_at: modified_at(metadata.modified()),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let name = key.name();
    let artifacts = ArtifactStore::artifact_set(&media_dir, name);
    let txt_content =
        std::fs::read_to_string(media_dir.join(ArtifactKind::Txt.file_name(name)))
            .ok();
    let source_info =
        read_json(&media_dir.join(ArtifactKind::SrcInfo.file_name(name))).ok();

    Some(MediaDetail {
        name: name.to_string(),
        media_type: key.media_type(),
        files,
        has_all_artifacts: artifacts.has_all_artifacts(),
        artifacts,
        metadata: store.cache().read(key).ok(),
        txt_content,
        source_info,
        override_: None,
        modified_at: modified_at(dir_metadata.modified()),
    })
}

fn modified_at(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn sort_items(items: &mut [MediaListItem], order: SortOrder) {
    match order {
        SortOrder::NameAsc => items.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortOrder::NameDesc => items.sort_by(|a, b| compare_names(&b.name, &a.name)),
        SortOrder::DateAsc => items.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| compare_names(&a.name, &b.name))
        }),
        SortOrder::DateDesc => items.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| compare_names(&a.name, &b.name))
        }),
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn total_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, secs: i64) -> MediaListItem {
        MediaListItem {
            name: name.to_string(),
            files: ArtifactSet::default(),
            modified_at: DateTime::from_timestamp(secs, 0),
        }
    }

    fn names(items: &[MediaListItem]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn name_sort_is_case_insensitive_with_stable_tie_break() {
        let mut items = vec![item("beta", 0), item("Alpha", 0), item("alpha", 0)];
        sort_items(&mut items, SortOrder::NameAsc);
        assert_eq!(names(&items), ["Alpha", "alpha", "beta"]);

        sort_items(&mut items, SortOrder::NameDesc);
        assert_eq!(names(&items), ["beta", "alpha", "Alpha"]);
    }

    #[test]
    fn date_sort_breaks_ties_on_name() {
        let mut items = vec![item("c", 20), item("b", 10), item("a", 20)];
        sort_items(&mut items, SortOrder::DateAsc);
        assert_eq!(names(&items), ["b", "a", "c"]);

        sort_items(&mut items, SortOrder::DateDesc);
        assert_eq!(names(&items), ["a", "c", "b"]);
    }

    #[test]
    fn unknown_sort_falls_back_to_name_asc() {
        assert_eq!(SortOrder::parse_or_default("size_desc"), SortOrder::NameAsc);
        assert_eq!(SortOrder::parse_or_default("date_desc"), SortOrder::DateDesc);
    }

    #[test]
    fn lexical_normalisation_resolves_parent_segments() {
        assert_eq!(
            normalize_lexically(Path::new("/data/torrent/films/Heat/../Other")),
            PathBuf::from("/data/torrent/films/Other")
        );
        assert_eq!(
            normalize_lexically(Path::new("/data/./torrent")),
            PathBuf::from("/data/torrent")
        );
    }
}
