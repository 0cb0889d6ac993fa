//! Append-only content-version log for authored material.
//!
//! Every admin edit to a site, artifact, requirement, or the game config
//! appends a full JSON snapshot. Versions are never rewritten or diffed.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ContentKind {
    Site = 0,
    Artifact = 1,
    Requirement = 2,
    Config = 3,
}

impl ContentKind {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Site),
            1 => Some(Self::Artifact),
            2 => Some(Self::Requirement),
            3 => Some(Self::Config),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub kind: ContentKind,
    pub content_id: u64,
    /// 1 for the first snapshot of an item.
    pub version: u32,
    pub snapshot: String,
    pub note: String,
}

/// Next version number for an item given its existing history.
pub fn next_version<'a>(
    history: impl IntoIterator<Item = &'a ContentVersion>,
    kind: ContentKind,
    content_id: u64,
) -> u32 {
    history
        .into_iter()
        .filter(|v| v.kind == kind && v.content_id == content_id)
        .map(|v| v.version)
        .max()
        .unwrap_or(0)
        + 1
}

/// Build the next version record for `value`.
pub fn snapshot<'a, T: Serialize>(
    history: impl IntoIterator<Item = &'a ContentVersion>,
    kind: ContentKind,
    content_id: u64,
    value: &T,
    note: impl Into<String>,
) -> Result<ContentVersion> {
    Ok(ContentVersion {
        kind,
        content_id,
        version: next_version(history, kind, content_id),
        snapshot: serde_json::to_string(value)?,
        note: note.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_first_version_is_one() {
        assert_eq!(next_version(&[], ContentKind::Site, 4), 1);
    }

    #[test]
    fn test_versions_are_per_item() {
        let mut log = Vec::new();
        let config = GameConfig::default();
        log.push(snapshot(&log, ContentKind::Config, 0, &config, "initial").unwrap());
        log.push(snapshot(&log, ContentKind::Site, 1, &"site one", "created").unwrap());
        log.push(snapshot(&log, ContentKind::Config, 0, &config, "tuned").unwrap());
        assert_eq!(log[0].version, 1);
        assert_eq!(log[1].version, 1);
        assert_eq!(log[2].version, 2);
        assert_eq!(next_version(&log, ContentKind::Site, 2), 1);
    }

    #[test]
    fn test_snapshot_is_json() {
        let v = snapshot(&[], ContentKind::Config, 0, &GameConfig::default(), "").unwrap();
        let back: GameConfig = serde_json::from_str(&v.snapshot).unwrap();
        assert_eq!(back, GameConfig::default());
    }

    #[test]
    fn test_kind_roundtrip() {
        for k in [
            ContentKind::Site,
            ContentKind::Artifact,
            ContentKind::Requirement,
            ContentKind::Config,
        ] {
            assert_eq!(ContentKind::from_u8(k as u8), Some(k));
        }
        assert!(ContentKind::from_u8(4).is_none());
    }
}
