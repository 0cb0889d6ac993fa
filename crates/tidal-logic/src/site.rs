//! Excavation sites: grid size, buried artifacts, and required documentation.
//!
//! Sites are authored by admins ahead of time; a session copies the site's
//! layout into its own grid at start. [`generate_practice_site`] builds a
//! deterministic site from a seed for demos and tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::Difficulty;
use crate::documentation::{DocumentationRequirement, EntryType};
use crate::grid::GridPosition;

/// Preservation state of an artifact as found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ArtifactCondition {
    Excellent = 0,
    Good = 1,
    Fair = 2,
    Poor = 3,
    Fragmentary = 4,
}

impl ArtifactCondition {
    pub const ALL: [ArtifactCondition; 5] = [
        ArtifactCondition::Excellent,
        ArtifactCondition::Good,
        ArtifactCondition::Fair,
        ArtifactCondition::Poor,
        ArtifactCondition::Fragmentary,
    ];

    pub fn from_u8(val: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u8 == val)
    }
}

/// An artifact buried in the site at authoring time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteArtifact {
    pub id: u64,
    pub name: String,
    pub position: GridPosition,
    /// Burial depth in [0, 1]; the cell must be dug at least this deep to
    /// reveal the artifact.
    pub depth: f32,
    pub condition: ArtifactCondition,
    pub description: String,
}

impl SiteArtifact {
    pub fn reveal_threshold(&self) -> f32 {
        self.depth.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcavationSite {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub artifacts: Vec<SiteArtifact>,
    pub required_documentation: Vec<DocumentationRequirement>,
}

impl ExcavationSite {
    pub fn artifact(&self, artifact_id: u64) -> Option<&SiteArtifact> {
        self.artifacts.iter().find(|a| a.id == artifact_id)
    }

    pub fn artifacts_at(&self, pos: GridPosition) -> impl Iterator<Item = &SiteArtifact> {
        self.artifacts.iter().filter(move |a| a.position == pos)
    }

    pub fn total_cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x < self.width && pos.y < self.height
    }
}

/// Maximum grid side; keeps the serialized session state bounded.
pub const MAX_GRID_SIDE: u32 = 64;

/// Validate an authored site. Returns a list of errors (empty = valid).
pub fn validate_site(site: &ExcavationSite) -> Vec<String> {
    let mut errors = Vec::new();

    if site.name.trim().is_empty() {
        errors.push("site name is empty".to_string());
    }
    if site.width == 0 || site.height == 0 {
        errors.push(format!(
            "grid must be at least 1x1, got {}x{}",
            site.width, site.height
        ));
    }
    if site.width > MAX_GRID_SIDE || site.height > MAX_GRID_SIDE {
        errors.push(format!(
            "grid {}x{} exceeds the {}x{} limit",
            site.width, site.height, MAX_GRID_SIDE, MAX_GRID_SIDE
        ));
    }

    let mut ids = HashSet::new();
    for artifact in &site.artifacts {
        if !ids.insert(artifact.id) {
            errors.push(format!("duplicate artifact id {}", artifact.id));
        }
        if !site.in_bounds(artifact.position) {
            errors.push(format!(
                "artifact '{}' at {} is outside the grid",
                artifact.name, artifact.position
            ));
        }
        if !artifact.depth.is_finite() || !(0.0..=1.0).contains(&artifact.depth) {
            errors.push(format!(
                "artifact '{}' depth {} is outside [0, 1]",
                artifact.name, artifact.depth
            ));
        }
    }

    for req in &site.required_documentation {
        if !site.in_bounds(req.position) {
            errors.push(format!(
                "required {} at {} is outside the grid",
                req.entry_type, req.position
            ));
        }
        if let Some(artifact_id) = req.artifact_id {
            match site.artifact(artifact_id) {
                None => errors.push(format!(
                    "required {} references unknown artifact {}",
                    req.entry_type, artifact_id
                )),
                Some(a) if a.position != req.position => errors.push(format!(
                    "required {} at {} references artifact '{}' at {}",
                    req.entry_type, req.position, a.name, a.position
                )),
                Some(_) => {}
            }
        }
    }

    errors
}

/// Standard requirements for an artifact: a photo and a measurement in situ.
pub fn default_requirements_for(artifact: &SiteArtifact) -> [DocumentationRequirement; 2] {
    [
        DocumentationRequirement {
            entry_type: EntryType::Photo,
            position: artifact.position,
            artifact_id: Some(artifact.id),
            description: format!("Photograph the {} in situ", artifact.name),
        },
        DocumentationRequirement {
            entry_type: EntryType::Measurement,
            position: artifact.position,
            artifact_id: Some(artifact.id),
            description: format!("Record the position and depth of the {}", artifact.name),
        },
    ]
}

const PRACTICE_FINDS: [&str; 10] = [
    "amphora",
    "anchor stock",
    "bronze coin",
    "oil lamp",
    "ship's bell",
    "sounding weight",
    "glass bead",
    "cannonball",
    "astrolabe",
    "rigging block",
];

/// Build a deterministic practice site. The same seed and difficulty always
/// produce the same layout.
pub fn generate_practice_site(id: u64, seed: u64, difficulty: Difficulty) -> ExcavationSite {
    let mut rng = StdRng::seed_from_u64(seed);
    let (side, artifact_count) = match difficulty {
        Difficulty::Beginner => (5, 3),
        Difficulty::Intermediate => (8, 5),
        Difficulty::Advanced => (10, 8),
    };

    let mut positions: Vec<GridPosition> = (0..side)
        .flat_map(|y| (0..side).map(move |x| GridPosition::new(x, y)))
        .collect();
    positions.shuffle(&mut rng);

    let artifacts: Vec<SiteArtifact> = positions
        .into_iter()
        .take(artifact_count)
        .enumerate()
        .map(|(i, position)| {
            let name = PRACTICE_FINDS[rng.gen_range(0..PRACTICE_FINDS.len())];
            let condition = ArtifactCondition::ALL[rng.gen_range(0..ArtifactCondition::ALL.len())];
            // Round to a tenth so the reveal threshold is easy to reason about.
            let depth = (rng.gen_range(0.2_f32..0.9) * 10.0).round() / 10.0;
            SiteArtifact {
                id: i as u64 + 1,
                name: name.to_string(),
                position,
                depth,
                condition,
                description: format!("Practice find #{}", i + 1),
            }
        })
        .collect();

    let required_documentation = artifacts
        .iter()
        .flat_map(default_requirements_for)
        .collect();

    ExcavationSite {
        id,
        name: format!("Practice site {} ({})", seed, difficulty),
        description: "Procedurally generated training site".to_string(),
        width: side,
        height: side,
        artifacts,
        required_documentation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_site() -> ExcavationSite {
        let artifact = SiteArtifact {
            id: 1,
            name: "amphora".into(),
            position: GridPosition::new(2, 2),
            depth: 0.5,
            condition: ArtifactCondition::Good,
            description: String::new(),
        };
        let required_documentation = default_requirements_for(&artifact).to_vec();
        ExcavationSite {
            id: 1,
            name: "Harbour wall".into(),
            description: String::new(),
            width: 5,
            height: 5,
            artifacts: vec![artifact],
            required_documentation,
        }
    }

    #[test]
    fn test_valid_site() {
        assert!(validate_site(&small_site()).is_empty());
    }

    #[test]
    fn test_artifact_out_of_bounds() {
        let mut site = small_site();
        site.artifacts[0].position = GridPosition::new(5, 0);
        let errors = validate_site(&site);
        assert!(errors.iter().any(|e| e.contains("outside the grid")));
    }

    #[test]
    fn test_bad_depth_and_duplicate_ids() {
        let mut site = small_site();
        let mut dup = site.artifacts[0].clone();
        dup.depth = 1.5;
        site.artifacts.push(dup);
        let errors = validate_site(&site);
        assert!(errors.iter().any(|e| e.contains("duplicate artifact id")));
        assert!(errors.iter().any(|e| e.contains("outside [0, 1]")));
    }

    #[test]
    fn test_requirement_with_unknown_artifact() {
        let mut site = small_site();
        site.required_documentation[0].artifact_id = Some(42);
        assert!(validate_site(&site)
            .iter()
            .any(|e| e.contains("unknown artifact 42")));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let mut site = small_site();
        site.width = 0;
        site.artifacts.clear();
        site.required_documentation.clear();
        assert_eq!(validate_site(&site).len(), 1);
    }

    #[test]
    fn test_artifacts_at() {
        let site = small_site();
        assert_eq!(site.artifacts_at(GridPosition::new(2, 2)).count(), 1);
        assert_eq!(site.artifacts_at(GridPosition::new(0, 0)).count(), 0);
    }

    #[test]
    fn test_practice_site_deterministic() {
        let a = generate_practice_site(1, 7, Difficulty::Intermediate);
        let b = generate_practice_site(1, 7, Difficulty::Intermediate);
        assert_eq!(a, b);
        let c = generate_practice_site(1, 8, Difficulty::Intermediate);
        assert_ne!(a.artifacts, c.artifacts);
    }

    #[test]
    fn test_practice_sites_valid_at_every_difficulty() {
        for difficulty in Difficulty::ALL {
            for seed in 0..20 {
                let site = generate_practice_site(seed, seed, difficulty);
                assert!(validate_site(&site).is_empty(), "{:?}", validate_site(&site));
                assert_eq!(site.required_documentation.len(), site.artifacts.len() * 2);
                let cells: HashSet<_> = site.artifacts.iter().map(|a| a.position).collect();
                assert_eq!(cells.len(), site.artifacts.len());
            }
        }
    }
}
