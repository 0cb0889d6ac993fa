//! Field documentation: entry types, recorded entries, and the per-site
//! requirements that recorded entries complete.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GameError, Result};
use crate::grid::GridPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntryType {
    Discovery = 0,
    Measurement = 1,
    Photo = 2,
    Note = 3,
    Sample = 4,
}

impl EntryType {
    pub const ALL: [EntryType; 5] = [
        EntryType::Discovery,
        EntryType::Measurement,
        EntryType::Photo,
        EntryType::Note,
        EntryType::Sample,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Measurement => "measurement",
            Self::Photo => "photo",
            Self::Note => "note",
            Self::Sample => "sample",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| *t as u8 == val)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EntryType {
    type Err = GameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| GameError::UnknownEntryType(s.to_string()))
    }
}

/// An entry in the session's field notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationEntry {
    /// Sequence number within the session, starting at 0.
    pub id: u32,
    pub entry_type: EntryType,
    pub content: String,
    pub position: GridPosition,
    pub artifact_id: Option<u64>,
    /// Whether this entry satisfied one of the site's required items.
    pub required: bool,
    pub complete: bool,
    pub recorded_at_ms: u64,
}

/// A documentation item the site author marked as mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRequirement {
    pub entry_type: EntryType,
    pub position: GridPosition,
    pub artifact_id: Option<u64>,
    pub description: String,
}

impl DocumentationRequirement {
    pub fn matches(&self, entry_type: EntryType, position: GridPosition, artifact: Option<u64>) -> bool {
        self.entry_type == entry_type
            && self.position == position
            && (self.artifact_id.is_none() || self.artifact_id == artifact)
    }
}

/// A requirement plus the entry that completed it, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementStatus {
    pub requirement: DocumentationRequirement,
    pub completed_by: Option<u32>,
}

impl RequirementStatus {
    pub fn open(requirement: DocumentationRequirement) -> Self {
        Self {
            requirement,
            completed_by: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_by.is_some()
    }
}

/// Index of the first open requirement the entry would complete.
pub fn find_open_requirement(
    requirements: &[RequirementStatus],
    entry_type: EntryType,
    position: GridPosition,
    artifact: Option<u64>,
) -> Option<usize> {
    requirements
        .iter()
        .position(|r| !r.is_complete() && r.requirement.matches(entry_type, position, artifact))
}

/// Trimmed content, or an error when nothing is left.
pub fn normalize_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(GameError::EmptyContent);
    }
    Ok(trimmed.to_string())
}
