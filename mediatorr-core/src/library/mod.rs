//! Filesystem view of the torrent library.
//!
//! Layout: `{root}/{type}/{name}/` holds one media item, and its sidecar
//! artifacts are `{name}{suffix}` inside that directory.

pub mod artifacts;
pub mod catalog;
pub mod metadata_cache;

pub use artifacts::ArtifactStore;
pub use catalog::{
    LibraryStats, ListQuery, MediaCatalog, MediaDetail, MediaFile,
    MediaListItem, MediaPage, SortOrder, TypeStats,
};
pub use metadata_cache::{MetadataCache, cache_key};
