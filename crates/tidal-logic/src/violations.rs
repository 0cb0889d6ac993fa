//! Protocol violations: scoring penalties for poor field practice.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::grid::{GridCell, GridPosition};
use crate::tools::{Tool, ToolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        })
    }
}

/// A recorded penalty event. Violations are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolViolation {
    pub severity: Severity,
    pub tool: Tool,
    pub position: Option<GridPosition>,
    pub message: String,
}

impl ProtocolViolation {
    /// Violation for forcing `tool` onto a cell it may not act on.
    pub fn misuse(tool: Tool, cell: &GridCell, severity: Severity) -> Self {
        let pos = cell.position;
        let message = match tool.kind() {
            ToolKind::Documentation => format!(
                "{} used on unexcavated cell {}: only exposed material can be recorded",
                tool.label(),
                pos
            ),
            ToolKind::Processing if !cell.excavated => format!(
                "Sieve used on unexcavated cell {}: there is no spoil to screen yet",
                pos
            ),
            ToolKind::Processing => format!(
                "Sieve used on cell {} while an artifact is still in place",
                pos
            ),
            ToolKind::Excavation => format!(
                "{} used on fully excavated cell {}: digging below the context destroys it",
                tool.label(),
                pos
            ),
        };
        Self {
            severity,
            tool,
            position: Some(pos),
            message,
        }
    }

    /// Heavy tool used next to an artifact that is already exposed.
    pub fn rough_handling(tool: Tool, pos: GridPosition) -> Self {
        Self {
            severity: Severity::Minor,
            tool,
            position: Some(pos),
            message: format!(
                "{} used around an exposed artifact at {}: switch to a brush",
                tool.label(),
                pos
            ),
        }
    }
}

pub fn count_severe(violations: &[ProtocolViolation]) -> usize {
    violations
        .iter()
        .filter(|v| v.severity == Severity::Severe)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Severe);
    }

    #[test]
    fn test_misuse_carries_position() {
        let cell = GridCell::new(GridPosition::new(3, 1));
        let v = ProtocolViolation::misuse(Tool::Camera, &cell, Severity::Severe);
        assert_eq!(v.position, Some(GridPosition::new(3, 1)));
        assert_eq!(v.tool, Tool::Camera);
        assert!(v.message.contains("(3, 1)"));
    }

    #[test]
    fn test_count_severe() {
        let cell = GridCell::new(GridPosition::new(0, 0));
        let list = vec![
            ProtocolViolation::misuse(Tool::Camera, &cell, Severity::Severe),
            ProtocolViolation::rough_handling(Tool::Trowel, GridPosition::new(0, 0)),
            ProtocolViolation::misuse(Tool::Sieve, &cell, Severity::Severe),
        ];
        assert_eq!(count_severe(&list), 2);
    }
}
