//! SpacetimeDB table definitions for the excavation game.
//!
//! Enum-valued columns are stored as `u8` codes matching the `#[repr(u8)]`
//! enums in tidal-logic. Session game state is the tagged JSON blob produced
//! by `GameData::encode`.

use spacetimedb::{table, Identity, SpacetimeType, Timestamp};

// ============================================================================
// PLAYERS
// ============================================================================

/// A registered player. The first player to register becomes an admin.
#[table(name = player, public)]
#[derive(Clone)]
pub struct Player {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[unique]
    pub identity: Identity,
    pub display_name: String,
    pub is_admin: bool,
    pub online: bool,
    pub joined_at: Timestamp,
}

/// Per-player tallies across all sessions
#[table(name = user_progress, public)]
#[derive(Clone)]
pub struct PlayerProgress {
    #[primary_key]
    pub user_id: u64,
    pub games_started: u32,
    pub games_completed: u32,
    pub games_abandoned: u32,
    pub best_score: u32,
    pub total_score: u64,
    pub total_artifacts_found: u32,
    pub total_violations: u32,
}

// ============================================================================
// SITES
// ============================================================================

#[table(name = excavation_site, public)]
#[derive(Clone)]
pub struct DigSite {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub name: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub created_by: Identity,
    pub created_at: Timestamp,
}

#[table(name = site_artifact, public)]
#[derive(Clone)]
pub struct Artifact {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub site_id: u64,
    pub name: String,
    pub x: u32,
    pub y: u32,
    /// Burial depth in [0, 1]
    pub depth: f32,
    pub condition: u8, // artifact_conditions::*
    pub description: String,
}

#[table(name = documentation_requirement, public)]
#[derive(Clone)]
pub struct DocRequirement {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub site_id: u64,
    pub entry_type: u8, // entry_types::*
    pub x: u32,
    pub y: u32,
    pub artifact_id: Option<u64>,
    pub description: String,
}

// ============================================================================
// SESSIONS
// ============================================================================

/// Final numbers of a completed session
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub overall_score: u32,
    pub completion_percentage: f32,
    pub artifacts_found: u32,
    pub total_artifacts: u32,
    pub documentation_quality: f32,
    pub protocol_compliance: f32,
    pub violations: u32,
}

#[table(name = game_session, public)]
#[derive(Clone)]
pub struct GameSession {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub user_id: u64,
    pub site_id: u64,
    pub difficulty: u8, // difficulties::*
    pub game_type: u8,  // game_types::*
    pub status: u8,     // session_statuses::*
    pub score: u32,
    pub max_score: u32,
    pub completion_percentage: f32,
    /// Seconds left, as last reported by the client
    pub time_remaining: u32,
    /// Tagged JSON game state
    pub game_state: String,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub result: Option<StoredResult>,
}

/// Append-only per-session action log
#[table(name = session_action, public)]
pub struct SessionAction {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    #[index(btree)]
    pub session_id: u64,
    pub sequence: u32,
    pub at_ms: u64,
    pub kind: u8, // ActionKind::code()
    /// Full action as JSON
    pub detail: String,
}

/// Outcome of the most recent excavation action, for the client to render
#[table(name = last_feedback, public)]
pub struct LastFeedback {
    #[primary_key]
    pub session_id: u64,
    pub x: u32,
    pub y: u32,
    pub tool: String,
    pub depth: f32,
    pub discoveries: Vec<u64>,
    pub violation_messages: Vec<String>,
    pub at_ms: u64,
}

/// Answer to the most recent completion request. A refused documentation
/// challenge lists what is still missing; the session stays active.
#[table(name = completion_feedback, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionFeedback {
    #[primary_key]
    pub session_id: u64,
    pub success: bool,
    pub overall_score: u32,
    pub missing: Vec<String>,
    pub at_ms: u64,
}

// ============================================================================
// ADMINISTRATION
// ============================================================================

/// Game settings singleton (id always 0)
#[table(name = game_settings, public)]
#[derive(Clone)]
pub struct GameSettings {
    #[primary_key]
    pub id: u32,
    pub config_json: String,
    pub updated_at: Timestamp,
}

#[table(name = audit_log)]
pub struct AuditEntry {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub actor: Identity,
    pub action: String,
    pub target_id: u64,
    pub detail: String,
    pub at: Timestamp,
}

/// Append-only snapshots of authored content
#[table(name = content_version)]
pub struct ContentRevision {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub kind: u8, // content_kinds::*
    #[index(btree)]
    pub content_id: u64,
    pub version: u32,
    pub snapshot: String,
    pub note: String,
    pub author: Identity,
    pub at: Timestamp,
}

// ============================================================================
// ENUM CONSTANTS
// ============================================================================

pub mod artifact_conditions {
    pub const EXCELLENT: u8 = 0;
    pub const GOOD: u8 = 1;
    pub const FAIR: u8 = 2;
    pub const POOR: u8 = 3;
    pub const FRAGMENTARY: u8 = 4;
}

pub mod entry_types {
    pub const DISCOVERY: u8 = 0;
    pub const MEASUREMENT: u8 = 1;
    pub const PHOTO: u8 = 2;
    pub const NOTE: u8 = 3;
    pub const SAMPLE: u8 = 4;
}

pub mod difficulties {
    pub const BEGINNER: u8 = 0;
    pub const INTERMEDIATE: u8 = 1;
    pub const ADVANCED: u8 = 2;
}

pub mod game_types {
    pub const EXCAVATION: u8 = 0;
    pub const DOCUMENTATION: u8 = 1;
}

pub mod session_statuses {
    pub const ACTIVE: u8 = 0;
    pub const COMPLETED: u8 = 1;
    pub const ABANDONED: u8 = 2;
}

pub mod content_kinds {
    pub const SITE: u8 = 0;
    pub const ARTIFACT: u8 = 1;
    pub const REQUIREMENT: u8 = 2;
    pub const CONFIG: u8 = 3;
}
