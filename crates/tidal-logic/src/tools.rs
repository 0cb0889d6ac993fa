//! Excavation tools and the tool/cell compatibility check.
//!
//! The same predicate drives hover feedback in the client and the
//! authoritative check inside the excavation reducer. Client-side checks are
//! advisory; the reducer always re-validates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GameError;
use crate::grid::GridCell;
use crate::violations::Severity;

/// A tool the player can pick from the tool belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tool {
    Trowel = 0,
    Brush = 1,
    Probe = 2,
    MeasuringTape = 3,
    Camera = 4,
    Sieve = 5,
}

/// What a tool is for, which decides the cell states it may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Removes sediment; only useful while depth < 1.
    Excavation,
    /// Records what has been exposed; needs an excavated cell.
    Documentation,
    /// Screens spoil; needs an excavated cell with no artifact in it.
    Processing,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Trowel,
        Tool::Brush,
        Tool::Probe,
        Tool::MeasuringTape,
        Tool::Camera,
        Tool::Sieve,
    ];

    pub fn kind(self) -> ToolKind {
        match self {
            Self::Trowel | Self::Brush | Self::Probe => ToolKind::Excavation,
            Self::MeasuringTape | Self::Camera => ToolKind::Documentation,
            Self::Sieve => ToolKind::Processing,
        }
    }

    /// Stable identifier used on the wire.
    pub fn id(self) -> &'static str {
        match self {
            Self::Trowel => "trowel",
            Self::Brush => "brush",
            Self::Probe => "probe",
            Self::MeasuringTape => "measuring_tape",
            Self::Camera => "camera",
            Self::Sieve => "sieve",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Trowel => "Trowel",
            Self::Brush => "Brush",
            Self::Probe => "Probe",
            Self::MeasuringTape => "Measuring tape",
            Self::Camera => "Camera",
            Self::Sieve => "Sieve",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| *t as u8 == val)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tool {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| GameError::UnknownTool(s.to_string()))
    }
}

/// Whether `tool` may act on `cell` in its current state.
pub fn can_use_tool(tool: Tool, cell: &GridCell) -> bool {
    match tool {
        Tool::Camera | Tool::MeasuringTape => cell.excavated,
        Tool::Sieve => cell.excavated && !cell.contains_artifact,
        Tool::Trowel | Tool::Brush | Tool::Probe => {
            !cell.excavated || cell.excavation_depth < 1.0
        }
    }
}

/// How wrong a forced tool choice is. `None` when the tool is allowed.
pub fn misuse_severity(tool: Tool, cell: &GridCell) -> Option<Severity> {
    if can_use_tool(tool, cell) {
        return None;
    }
    let severity = match tool.kind() {
        // Nothing to record or screen on undisturbed sediment.
        ToolKind::Documentation => Severity::Severe,
        ToolKind::Processing if !cell.excavated => Severity::Severe,
        // Sieving a cell that still holds an artifact.
        ToolKind::Processing => Severity::Moderate,
        // Digging past the bottom of a finished cell.
        ToolKind::Excavation => Severity::Moderate,
    };
    Some(severity)
}
