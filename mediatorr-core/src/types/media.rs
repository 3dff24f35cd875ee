use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};

/// Top-level media family; each maps to one directory under the library root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Films,
    Series,
    Musiques,
}

impl MediaType {
    pub const ALL: [MediaType; 3] =
        [MediaType::Films, MediaType::Series, MediaType::Musiques];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Films => "films",
            MediaType::Series => "series",
            MediaType::Musiques => "musiques",
        }
    }

    /// Films and series are matched against TMDb and may carry an override;
    /// music is matched against iTunes and never does.
    pub fn supports_overrides(&self) -> bool {
        matches!(self, MediaType::Films | MediaType::Series)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = MediaError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "films" => Ok(MediaType::Films),
            "series" => Ok(MediaType::Series),
            "musiques" => Ok(MediaType::Musiques),
            other => Err(MediaError::InvalidMediaType(other.to_string())),
        }
    }
}

/// Identity of one catalog entry: a media type plus the name of the item's
/// directory. The name can never address anything outside that directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaKey {
    #[serde(rename = "type")]
    media_type: MediaType,
    name: String,
}

impl MediaKey {
    pub fn new(media_type: MediaType, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { media_type, name })
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MediaError::InvalidMediaKey("name is empty".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(MediaError::InvalidMediaKey(format!(
            "name contains a path separator: {name}"
        )));
    }
    if name.contains("..") {
        return Err(MediaError::InvalidMediaKey(format!(
            "name contains a parent segment: {name}"
        )));
    }
    if name.contains('\0') {
        return Err(MediaError::InvalidMediaKey("name contains NUL".into()));
    }
    Ok(())
}
