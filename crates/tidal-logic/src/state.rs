//! Typed per-session game state and its transitions.
//!
//! The state is persisted as a tagged JSON blob after every action:
//!
//! ```json
//! {"game_type": "excavation", "state": { "grid": ..., "current_tool": "trowel", ... }}
//! ```
//!
//! Decoding is strict. A blob that fails to parse, or parses into a grid that
//! violates its own invariants, is rejected with an error rather than being
//! replaced by a fresh state, so player progress is never silently lost.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GameConfig;
use crate::documentation::{
    find_open_requirement, normalize_content, DocumentationEntry, EntryType, RequirementStatus,
};
use crate::error::{GameError, Result};
use crate::grid::{ExcavationGrid, GridCell, GridPosition};
use crate::scoring::CompletionInputs;
use crate::site::{ArtifactCondition, ExcavationSite, SiteArtifact};
use crate::tools::{misuse_severity, Tool, ToolKind};
use crate::violations::{count_severe, ProtocolViolation};

// ============================================================================
// GAME TYPES
// ============================================================================

/// Which ruleset a session plays under. Both share the excavation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GameType {
    /// Free excavation; completion is always accepted.
    Excavation = 0,
    /// Documentation challenge; completion requires every artifact found and
    /// every required entry recorded, unless the clock has run out.
    Documentation = 1,
}

impl GameType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Excavation),
            1 => Some(Self::Documentation),
            _ => None,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excavation => "excavation",
            Self::Documentation => "documentation",
        })
    }
}

// ============================================================================
// ACTION RESULTS
// ============================================================================

/// An artifact revealed by an excavation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub artifact_id: u64,
    pub name: String,
    pub position: GridPosition,
    pub condition: ArtifactCondition,
}

/// What the UI shows after an excavation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFeedback {
    pub discoveries: Vec<Discovery>,
    pub violations: Vec<ProtocolViolation>,
    /// The target cell after the action.
    pub cell: GridCell,
}

/// Input for a new documentation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub content: String,
    pub position: GridPosition,
    pub artifact_id: Option<u64>,
}

/// One item still blocking completion of a documentation challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingRequirement {
    ArtifactsRemaining {
        count: usize,
    },
    Documentation {
        entry_type: EntryType,
        position: GridPosition,
        description: String,
    },
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactsRemaining { count } => {
                write!(f, "{} artifact(s) still buried", count)
            }
            Self::Documentation {
                entry_type,
                position,
                description,
            } => write!(f, "missing {} at {}: {}", entry_type, position, description),
        }
    }
}

// ============================================================================
// EXCAVATION STATE
// ============================================================================

/// Per-session excavation state.
///
/// The artifact layout and documentation requirements are copied from the
/// site when the session starts. Discovery, scoring and completion all read
/// that copy, so later edits to the site do not reach sessions already in
/// progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcavationState {
    pub grid: ExcavationGrid,
    /// Last tool used or selected.
    pub current_tool: Tool,
    pub artifacts: Vec<SiteArtifact>,
    /// Artifact ids in discovery order. Never contains duplicates.
    pub discovered_artifacts: Vec<u64>,
    pub documentation: Vec<DocumentationEntry>,
    pub requirements: Vec<RequirementStatus>,
    pub violations: Vec<ProtocolViolation>,
}

impl ExcavationState {
    /// Fresh state for a site: untouched grid, trowel in hand.
    pub fn new(site: &ExcavationSite) -> Self {
        Self {
            grid: ExcavationGrid::with_artifacts(
                site.width,
                site.height,
                site.artifacts.iter().map(|a| a.position),
            ),
            current_tool: Tool::Trowel,
            artifacts: site.artifacts.clone(),
            discovered_artifacts: Vec::new(),
            documentation: Vec::new(),
            requirements: site
                .required_documentation
                .iter()
                .cloned()
                .map(RequirementStatus::open)
                .collect(),
            violations: Vec::new(),
        }
    }

    pub fn is_discovered(&self, artifact_id: u64) -> bool {
        self.discovered_artifacts.contains(&artifact_id)
    }

    pub fn artifact(&self, artifact_id: u64) -> Option<&SiteArtifact> {
        self.artifacts.iter().find(|a| a.id == artifact_id)
    }

    pub fn artifacts_at(&self, pos: GridPosition) -> impl Iterator<Item = &SiteArtifact> {
        self.artifacts.iter().filter(move |a| a.position == pos)
    }

    /// Apply `tool` to the cell at `pos`. The tool becomes the current tool.
    ///
    /// An incompatible tool is not rejected: the action is recorded as a
    /// protocol violation and leaves the cell untouched.
    pub fn excavate(
        &mut self,
        pos: GridPosition,
        tool: Tool,
        config: &GameConfig,
    ) -> Result<ActionFeedback> {
        let cell = self.grid.require_cell(pos)?.clone();
        self.current_tool = tool;
        let mut violations = Vec::new();
        let mut discoveries = Vec::new();

        if let Some(severity) = misuse_severity(tool, &cell) {
            let violation = ProtocolViolation::misuse(tool, &cell, severity);
            log::debug!("protocol violation: {}", violation.message);
            violations.push(violation);
        } else if tool.kind() == ToolKind::Excavation {
            let exposed_here = self.artifacts_at(pos).any(|a| self.is_discovered(a.id));
            if tool == Tool::Trowel && exposed_here {
                violations.push(ProtocolViolation::rough_handling(tool, pos));
            }

            let depth = self
                .grid
                .require_cell_mut(pos)?
                .deepen(config.increment_for(tool));

            for artifact in self.artifacts.iter().filter(|a| a.position == pos) {
                if depth >= artifact.reveal_threshold()
                    && !self.discovered_artifacts.contains(&artifact.id)
                {
                    self.discovered_artifacts.push(artifact.id);
                    discoveries.push(Discovery {
                        artifact_id: artifact.id,
                        name: artifact.name.clone(),
                        position: artifact.position,
                        condition: artifact.condition,
                    });
                }
            }
        }

        self.violations.extend(violations.iter().cloned());
        Ok(ActionFeedback {
            discoveries,
            violations,
            cell: self.grid.require_cell(pos)?.clone(),
        })
    }

    /// Validate and append a documentation entry. Completes the first open
    /// requirement the entry matches.
    pub fn record_documentation(
        &mut self,
        site_id: u64,
        entry: NewEntry,
        recorded_at_ms: u64,
    ) -> Result<&DocumentationEntry> {
        let content = normalize_content(&entry.content)?;
        let cell = self.grid.require_cell(entry.position)?;

        if entry.entry_type == EntryType::Photo && !cell.excavated {
            return Err(GameError::PhotoOfUnexcavatedCell {
                x: entry.position.x,
                y: entry.position.y,
            });
        }
        if let Some(artifact_id) = entry.artifact_id {
            if self.artifact(artifact_id).is_none() {
                return Err(GameError::UnknownArtifact {
                    site_id,
                    artifact_id,
                });
            }
            if !self.is_discovered(artifact_id) {
                return Err(GameError::ArtifactNotDiscovered(artifact_id));
            }
        }

        let id = self.documentation.len() as u32;
        let matched = find_open_requirement(
            &self.requirements,
            entry.entry_type,
            entry.position,
            entry.artifact_id,
        );
        if let Some(i) = matched {
            self.requirements[i].completed_by = Some(id);
        }

        self.documentation.push(DocumentationEntry {
            id,
            entry_type: entry.entry_type,
            content,
            position: entry.position,
            artifact_id: entry.artifact_id,
            required: matched.is_some(),
            complete: true,
            recorded_at_ms,
        });
        Ok(&self.documentation[id as usize])
    }

    pub fn completed_requirements(&self) -> usize {
        self.requirements.iter().filter(|r| r.is_complete()).count()
    }

    pub fn severe_violations(&self) -> usize {
        count_severe(&self.violations)
    }

    pub fn completion_inputs(&self) -> CompletionInputs {
        CompletionInputs {
            total_cells: self.grid.total_cells(),
            excavated_cells: self.grid.excavated_cells(),
            total_artifacts: self.artifacts.len(),
            discovered_artifacts: self.discovered_artifacts.len(),
            total_required_docs: self.requirements.len(),
            completed_required_docs: self.completed_requirements(),
        }
    }

    /// Everything still outstanding for a documentation challenge.
    pub fn missing_requirements(&self) -> Vec<MissingRequirement> {
        let mut missing = Vec::new();
        let remaining = self
            .artifacts
            .iter()
            .filter(|a| !self.is_discovered(a.id))
            .count();
        if remaining > 0 {
            missing.push(MissingRequirement::ArtifactsRemaining { count: remaining });
        }
        for status in self.requirements.iter().filter(|r| !r.is_complete()) {
            missing.push(MissingRequirement::Documentation {
                entry_type: status.requirement.entry_type,
                position: status.requirement.position,
                description: status.requirement.description.clone(),
            });
        }
        missing
    }

    /// Check the state against the site it was built from and against its
    /// own artifact layout.
    pub fn check_consistency(&self, site: &ExcavationSite) -> std::result::Result<(), String> {
        self.grid.check_consistency()?;
        if self.grid.width != site.width || self.grid.height != site.height {
            return Err(format!(
                "grid is {}x{} but site is {}x{}",
                self.grid.width, self.grid.height, site.width, site.height
            ));
        }
        for cell in self.grid.cells() {
            let holds_artifact = self.artifacts_at(cell.position).next().is_some();
            if cell.contains_artifact != holds_artifact {
                return Err(format!(
                    "cell {} artifact flag is {} but layout says {}",
                    cell.position, cell.contains_artifact, holds_artifact
                ));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.discovered_artifacts {
            if self.artifact(*id).is_none() {
                return Err(format!("discovered artifact {} is not in the layout", id));
            }
            if !seen.insert(*id) {
                return Err(format!("artifact {} discovered twice", id));
            }
        }
        for status in &self.requirements {
            if let Some(entry) = status.completed_by {
                if entry as usize >= self.documentation.len() {
                    return Err(format!(
                        "requirement completed by missing entry {}",
                        entry
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// GAME DATA (tagged union)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game_type", content = "state", rename_all = "snake_case")]
pub enum GameData {
    Excavation(ExcavationState),
    Documentation(ExcavationState),
}

impl GameData {
    pub fn new(game_type: GameType, site: &ExcavationSite) -> Self {
        let state = ExcavationState::new(site);
        match game_type {
            GameType::Excavation => Self::Excavation(state),
            GameType::Documentation => Self::Documentation(state),
        }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            Self::Excavation(_) => GameType::Excavation,
            Self::Documentation(_) => GameType::Documentation,
        }
    }

    pub fn state(&self) -> &ExcavationState {
        match self {
            Self::Excavation(s) | Self::Documentation(s) => s,
        }
    }

    pub fn state_mut(&mut self) -> &mut ExcavationState {
        match self {
            Self::Excavation(s) | Self::Documentation(s) => s,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored blob and check it against its site.
    pub fn decode(session_id: u64, blob: &str, site: &ExcavationSite) -> Result<Self> {
        let data: GameData = serde_json::from_str(blob)
            .map_err(|source| GameError::CorruptState { session_id, source })?;
        data.state()
            .check_consistency(site)
            .map_err(|reason| GameError::InvalidState { session_id, reason })?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteArtifact;
    use crate::violations::Severity;

    fn site_with_artifact(depth: f32) -> ExcavationSite {
        ExcavationSite {
            id: 1,
            name: "Test".into(),
            description: String::new(),
            width: 5,
            height: 5,
            artifacts: vec![SiteArtifact {
                id: 10,
                name: "amphora".into(),
                position: GridPosition::new(2, 2),
                depth,
                condition: ArtifactCondition::Good,
                description: String::new(),
            }],
            required_documentation: Vec::new(),
        }
    }

    #[test]
    fn test_trowel_twice_discovers_once() {
        let site = site_with_artifact(0.5);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);

        let first = state.excavate(pos, Tool::Trowel, &config).unwrap();
        assert_eq!(first.discoveries.len(), 1);
        assert_eq!(first.discoveries[0].artifact_id, 10);
        assert!((first.cell.excavation_depth - 0.6).abs() < 1e-6);
        assert!(first.violations.is_empty());

        let second = state.excavate(pos, Tool::Trowel, &config).unwrap();
        assert!(second.discoveries.is_empty());
        assert_eq!(second.cell.excavation_depth, 1.0);
        assert_eq!(state.discovered_artifacts, vec![10]);
    }

    #[test]
    fn test_trowel_on_exposed_artifact_is_minor() {
        let site = site_with_artifact(0.5);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);
        state.excavate(pos, Tool::Trowel, &config).unwrap();
        let second = state.excavate(pos, Tool::Trowel, &config).unwrap();
        assert_eq!(second.violations.len(), 1);
        assert_eq!(second.violations[0].severity, Severity::Minor);
    }

    #[test]
    fn test_brush_on_exposed_artifact_is_clean() {
        let site = site_with_artifact(0.5);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);
        state.excavate(pos, Tool::Trowel, &config).unwrap();
        let fb = state.excavate(pos, Tool::Brush, &config).unwrap();
        assert!(fb.violations.is_empty());
        assert!(state.violations.is_empty());
    }

    #[test]
    fn test_camera_on_unexcavated_cell() {
        let site = site_with_artifact(0.5);
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);
        let fb = state
            .excavate(pos, Tool::Camera, &GameConfig::default())
            .unwrap();
        assert!(fb.discoveries.is_empty());
        assert_eq!(fb.violations.len(), 1);
        assert_eq!(fb.violations[0].severity, Severity::Severe);
        assert_eq!(fb.cell.excavation_depth, 0.0);
        assert!(!fb.cell.excavated);
        assert_eq!(state.violations.len(), 1);
    }

    #[test]
    fn test_digging_finished_cell_is_moderate() {
        let site = site_with_artifact(0.5);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(0, 0);
        state.excavate(pos, Tool::Trowel, &config).unwrap();
        state.excavate(pos, Tool::Trowel, &config).unwrap();
        let fb = state.excavate(pos, Tool::Probe, &config).unwrap();
        assert_eq!(fb.violations[0].severity, Severity::Moderate);
        assert_eq!(fb.cell.excavation_depth, 1.0);
    }

    #[test]
    fn test_deep_artifact_needs_several_brush_strokes() {
        let site = site_with_artifact(0.9);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);
        let mut strokes = 0;
        loop {
            strokes += 1;
            let fb = state.excavate(pos, Tool::Brush, &config).unwrap();
            if !fb.discoveries.is_empty() {
                break;
            }
            assert!(strokes < 10);
        }
        // 0.25 per stroke: 0.25, 0.5, 0.75, 1.0
        assert_eq!(strokes, 4);
    }

    #[test]
    fn test_out_of_bounds_action() {
        let site = site_with_artifact(0.5);
        let mut state = ExcavationState::new(&site);
        let err = state
            .excavate(GridPosition::new(5, 5), Tool::Trowel, &GameConfig::default())
            .unwrap_err();
        assert!(matches!(err, GameError::OutOfBounds { .. }));
        assert!(state.violations.is_empty());
    }

    #[test]
    fn test_photo_requires_excavated_cell() {
        let site = site_with_artifact(0.5);
        let mut state = ExcavationState::new(&site);
        let err = state
            .record_documentation(
                site.id,
                NewEntry {
                    entry_type: EntryType::Photo,
                    content: "overview".into(),
                    position: GridPosition::new(1, 1),
                    artifact_id: None,
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::PhotoOfUnexcavatedCell { x: 1, y: 1 }));
        assert!(state.documentation.is_empty());
    }

    #[test]
    fn test_note_allowed_anywhere() {
        let site = site_with_artifact(0.5);
        let mut state = ExcavationState::new(&site);
        let entry = state
            .record_documentation(
                site.id,
                NewEntry {
                    entry_type: EntryType::Note,
                    content: "sandy silt, shell fragments".into(),
                    position: GridPosition::new(4, 4),
                    artifact_id: None,
                },
                1_000,
            )
            .unwrap();
        assert_eq!(entry.id, 0);
        assert!(!entry.required);
        assert!(entry.complete);
    }

    #[test]
    fn test_undiscovered_artifact_reference_rejected() {
        let site = site_with_artifact(0.5);
        let mut state = ExcavationState::new(&site);
        let err = state
            .record_documentation(
                site.id,
                NewEntry {
                    entry_type: EntryType::Note,
                    content: "guess".into(),
                    position: GridPosition::new(2, 2),
                    artifact_id: Some(10),
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::ArtifactNotDiscovered(10)));

        let err = state
            .record_documentation(
                site.id,
                NewEntry {
                    entry_type: EntryType::Note,
                    content: "guess".into(),
                    position: GridPosition::new(2, 2),
                    artifact_id: Some(99),
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, GameError::UnknownArtifact { artifact_id: 99, .. }));
    }

    #[test]
    fn test_required_entry_completes_requirement() {
        let mut site = site_with_artifact(0.5);
        site.required_documentation = crate::site::default_requirements_for(&site.artifacts[0]).to_vec();
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        let pos = GridPosition::new(2, 2);
        state.excavate(pos, Tool::Trowel, &config).unwrap();

        let entry = state
            .record_documentation(
                site.id,
                NewEntry {
                    entry_type: EntryType::Photo,
                    content: "amphora, north view".into(),
                    position: pos,
                    artifact_id: Some(10),
                },
                5,
            )
            .unwrap();
        assert!(entry.required);
        assert_eq!(state.completed_requirements(), 1);

        let missing = state.missing_requirements();
        assert_eq!(missing.len(), 1);
        assert!(matches!(
            missing[0],
            MissingRequirement::Documentation {
                entry_type: EntryType::Measurement,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_requirements_counts_buried_artifacts() {
        let site = site_with_artifact(0.5);
        let state = ExcavationState::new(&site);
        assert_eq!(
            state.missing_requirements(),
            vec![MissingRequirement::ArtifactsRemaining { count: 1 }]
        );
    }

    #[test]
    fn test_game_data_blob_roundtrip() {
        let site = site_with_artifact(0.5);
        let mut data = GameData::new(GameType::Documentation, &site);
        data.state_mut()
            .excavate(GridPosition::new(2, 2), Tool::Trowel, &GameConfig::default())
            .unwrap();
        let blob = data.encode().unwrap();
        assert!(blob.contains(r#""game_type":"documentation""#));
        let back = GameData::decode(1, &blob, &site).unwrap();
        assert_eq!(back, data);
        assert_eq!(back.game_type(), GameType::Documentation);
    }

    #[test]
    fn test_malformed_blob_rejected() {
        let site = site_with_artifact(0.5);
        assert!(matches!(
            GameData::decode(3, "{\"game_type\":\"excavation\"", &site),
            Err(GameError::CorruptState { session_id: 3, .. })
        ));
        assert!(matches!(
            GameData::decode(3, r#"{"game_type":"quiz","state":{}}"#, &site),
            Err(GameError::CorruptState { .. })
        ));
    }

    #[test]
    fn test_blob_for_other_site_rejected() {
        let site = site_with_artifact(0.5);
        let blob = GameData::new(GameType::Excavation, &site).encode().unwrap();
        let mut other = site.clone();
        other.width = 6;
        assert!(matches!(
            GameData::decode(4, &blob, &other),
            Err(GameError::InvalidState { session_id: 4, .. })
        ));
    }

    #[test]
    fn test_artifact_flags_checked_against_layout() {
        let site = site_with_artifact(0.5);
        let mut data = GameData::new(GameType::Excavation, &site);
        data.state_mut().artifacts.push(SiteArtifact {
            id: 11,
            name: "coin".into(),
            position: GridPosition::new(0, 4),
            depth: 0.2,
            condition: ArtifactCondition::Poor,
            description: String::new(),
        });
        let blob = data.encode().unwrap();
        let err = GameData::decode(5, &blob, &site).unwrap_err();
        let GameError::InvalidState { reason, .. } = err else {
            panic!("expected InvalidState, got {:?}", err);
        };
        assert!(reason.contains("cell (0, 4) artifact flag"));
    }

    #[test]
    fn test_site_edits_do_not_change_layout() {
        let mut site = site_with_artifact(0.5);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);
        site.artifacts.clear();

        let fb = state.excavate(GridPosition::new(2, 2), Tool::Trowel, &config).unwrap();
        assert_eq!(fb.discoveries.len(), 1);
        assert_eq!(state.current_tool, Tool::Trowel);
        assert_eq!(state.completion_inputs().total_artifacts, 1);
        assert!(state.check_consistency(&site).is_ok());
    }
}
