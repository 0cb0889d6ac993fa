//! Game configuration: difficulty levels, tool increments, time limits,
//! and scoring weights.
//!
//! ```
//! use tidal_logic::config::{validate_config, Difficulty, GameConfig};
//!
//! let config = GameConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert_eq!(config.time_limit(Difficulty::Beginner), 900);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GameError, Result};
use crate::scoring::{CompletionWeights, PenaltyConfig};
use crate::tools::Tool;

// ============================================================================
// DIFFICULTY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Difficulty {
    Beginner = 0,
    Intermediate = 1,
    Advanced = 2,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Beginner),
            1 => Some(Self::Intermediate),
            2 => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Like [`from_u8`](Self::from_u8) but reports unknown values as an error.
    pub fn parse(val: u8) -> Result<Self> {
        Self::from_u8(val).ok_or(GameError::UnknownDifficulty(val))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        })
    }
}

// ============================================================================
// CONFIG
// ============================================================================

/// Depth gained per hit for each excavation tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolIncrements {
    pub trowel: f32,
    pub brush: f32,
    pub probe: f32,
}

impl Default for ToolIncrements {
    fn default() -> Self {
        Self {
            trowel: 0.6,
            brush: 0.25,
            probe: 0.1,
        }
    }
}

/// Session countdown length in seconds per difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimits {
    pub beginner: u32,
    pub intermediate: u32,
    pub advanced: u32,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            beginner: 900,
            intermediate: 600,
            advanced: 420,
        }
    }
}

/// Tunable game parameters. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tool_increments: ToolIncrements,
    pub time_limits: TimeLimits,
    pub completion_weights: CompletionWeights,
    pub penalties: PenaltyConfig,
}

impl GameConfig {
    /// Depth increment for `tool`. Non-excavation tools never dig.
    pub fn increment_for(&self, tool: Tool) -> f32 {
        match tool {
            Tool::Trowel => self.tool_increments.trowel,
            Tool::Brush => self.tool_increments.brush,
            Tool::Probe => self.tool_increments.probe,
            Tool::MeasuringTape | Tool::Camera | Tool::Sieve => 0.0,
        }
    }

    pub fn time_limit(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Beginner => self.time_limits.beginner,
            Difficulty::Intermediate => self.time_limits.intermediate,
            Difficulty::Advanced => self.time_limits.advanced,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GameConfig =
            serde_json::from_str(json).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(GameError::InvalidConfig(errors.join("; ")));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Validate a config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &GameConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let inc = &config.tool_increments;
    for (name, value) in [
        ("trowel", inc.trowel),
        ("brush", inc.brush),
        ("probe", inc.probe),
    ] {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            errors.push(format!(
                "{} increment must be in (0, 1], got {}",
                name, value
            ));
        }
    }

    for difficulty in Difficulty::ALL {
        if config.time_limit(difficulty) == 0 {
            errors.push(format!("{} time limit must be positive", difficulty));
        }
    }
    let limits = &config.time_limits;
    if limits.beginner < limits.intermediate || limits.intermediate < limits.advanced {
        errors.push("time limits must not grow with difficulty".to_string());
    }

    let w = &config.completion_weights;
    if [w.excavation, w.artifacts, w.documentation]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        errors.push("completion weights must be non-negative".to_string());
    } else if w.excavation + w.artifacts + w.documentation <= 0.0 {
        errors.push("completion weights must not all be zero".to_string());
    }

    let p = &config.penalties;
    if !p.per_violation.is_finite() || p.per_violation < 0.0 {
        errors.push("per-violation penalty must be non-negative".to_string());
    }
    if !p.per_severe.is_finite() || p.per_severe < 0.0 {
        errors.push("severe-violation penalty must be non-negative".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_roundtrip() {
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_u8(d as u8), Some(d));
        }
        assert!(Difficulty::from_u8(9).is_none());
        assert!(matches!(
            Difficulty::parse(9),
            Err(GameError::UnknownDifficulty(9))
        ));
    }

    #[test]
    fn test_default_config_valid() {
        assert!(validate_config(&GameConfig::default()).is_empty());
    }

    #[test]
    fn test_increments() {
        let c = GameConfig::default();
        assert!((c.increment_for(Tool::Trowel) - 0.6).abs() < 1e-6);
        assert!(c.increment_for(Tool::Trowel) > c.increment_for(Tool::Brush));
        assert!(c.increment_for(Tool::Brush) > c.increment_for(Tool::Probe));
        assert_eq!(c.increment_for(Tool::Camera), 0.0);
        assert_eq!(c.increment_for(Tool::Sieve), 0.0);
    }

    #[test]
    fn test_time_limits_shrink_with_difficulty() {
        let c = GameConfig::default();
        assert!(c.time_limit(Difficulty::Beginner) > c.time_limit(Difficulty::Intermediate));
        assert!(c.time_limit(Difficulty::Intermediate) > c.time_limit(Difficulty::Advanced));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c = GameConfig::from_json(r#"{"tool_increments":{"trowel":0.5,"brush":0.2,"probe":0.05}}"#)
            .unwrap();
        assert!((c.tool_increments.trowel - 0.5).abs() < 1e-6);
        assert_eq!(c.time_limits, TimeLimits::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let c = GameConfig::default();
        let back = GameConfig::from_json(&c.to_json().unwrap()).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut c = GameConfig::default();
        c.tool_increments.brush = 0.0;
        c.time_limits.advanced = 0;
        c.completion_weights.documentation = -1.0;
        let errors = validate_config(&c);
        assert_eq!(errors.len(), 3);

        let json = serde_json::to_string(&c).unwrap();
        assert!(matches!(
            GameConfig::from_json(&json),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            GameConfig::from_json("{not json"),
            Err(GameError::InvalidConfig(_))
        ));
    }
}
