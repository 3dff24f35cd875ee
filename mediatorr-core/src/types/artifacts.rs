use serde::{Deserialize, Serialize};

/// Sidecar files the scan job generates next to each media item. The list is
/// the same for every media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Torrent,
    Nfo,
    Txt,
    PrezTxt,
    SourceNfo,
    SrcInfo,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Torrent,
        ArtifactKind::Nfo,
        ArtifactKind::Txt,
        ArtifactKind::PrezTxt,
        ArtifactKind::SrcInfo,
        ArtifactKind::SourceNfo,
    ];

    /// Artifacts derived from catalog metadata rather than from the release.
    pub const METADATA: [ArtifactKind; 2] =
        [ArtifactKind::Txt, ArtifactKind::PrezTxt];

    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Torrent => ".torrent",
            ArtifactKind::Nfo => ".nfo",
            ArtifactKind::Txt => ".txt",
            ArtifactKind::PrezTxt => ".prez.txt",
            ArtifactKind::SourceNfo => ".source.nfo",
            ArtifactKind::SrcInfo => ".srcinfo",
        }
    }

    pub fn file_name(&self, name: &str) -> String {
        format!("{name}{}", self.suffix())
    }

    /// Required for an item to count as complete.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Torrent
                | ArtifactKind::Nfo
                | ArtifactKind::Txt
                | ArtifactKind::PrezTxt
        )
    }
}

/// Presence flags for every [`ArtifactKind`] of one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSet {
    pub torrent: bool,
    pub nfo: bool,
    pub txt: bool,
    pub prez: bool,
    pub source_nfo: bool,
    pub srcinfo: bool,
}

impl ArtifactSet {
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Torrent => self.torrent,
            ArtifactKind::Nfo => self.nfo,
            ArtifactKind::Txt => self.txt,
            ArtifactKind::PrezTxt => self.prez,
            ArtifactKind::SourceNfo => self.source_nfo,
            ArtifactKind::SrcInfo => self.srcinfo,
        }
    }

    pub fn set(&mut self, kind: ArtifactKind, present: bool) {
        let flag = match kind {
            ArtifactKind::Torrent => &mut self.torrent,
            ArtifactKind::Nfo => &mut self.nfo,
            ArtifactKind::Txt => &mut self.txt,
            ArtifactKind::PrezTxt => &mut self.prez,
            ArtifactKind::SourceNfo => &mut self.source_nfo,
            ArtifactKind::SrcInfo => &mut self.srcinfo,
        };
        *flag = present;
    }

    pub fn has_all_artifacts(&self) -> bool {
        ArtifactKind::ALL
            .iter()
            .filter(|kind| kind.is_required())
            .all(|kind| self.contains(*kind))
    }
}
