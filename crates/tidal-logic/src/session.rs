//! Game sessions: the stored record, the append-only action log, and the
//! operations clients call.
//!
//! Each operation is one read-modify-write against a [`GameStore`]. The host
//! (SpacetimeDB reducer, in-memory harness) guarantees that one call runs
//! atomically, so no locking happens here.
//!
//! Status transitions:
//!
//! ```text
//! active ──complete──▶ completed
//!    └────abandon───▶ abandoned
//! ```
//!
//! Nothing leaves `completed` or `abandoned`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{Difficulty, GameConfig};
use crate::documentation::{DocumentationEntry, EntryType};
use crate::error::{GameError, Result};
use crate::grid::GridPosition;
use crate::progress::UserProgress;
use crate::scoring::{compliance_score, compute_completion, overall_score, CompletionBreakdown};
use crate::site::ExcavationSite;
use crate::state::{ActionFeedback, GameData, GameType, MissingRequirement, NewEntry};
use crate::timer::reconcile_time_remaining;
use crate::tools::Tool;

/// Highest score a session can reach.
pub const MAX_SCORE: u32 = 100;

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SessionStatus {
    Active = 0,
    Completed = 1,
    Abandoned = 2,
}

impl SessionStatus {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Active),
            1 => Some(Self::Completed),
            2 => Some(Self::Abandoned),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        })
    }
}

/// Final numbers reported when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub overall_score: u32,
    pub completion_percentage: f32,
    pub artifacts_found: u32,
    pub total_artifacts: u32,
    pub documentation_quality: f32,
    pub protocol_compliance: f32,
    pub violations: u32,
}

/// The stored session row. `game_state` is the encoded [`GameData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: u64,
    pub user_id: u64,
    pub site_id: u64,
    pub difficulty: Difficulty,
    pub game_type: GameType,
    pub status: SessionStatus,
    pub score: u32,
    pub max_score: u32,
    pub completion_percentage: f32,
    /// Seconds left on the client countdown, as last reported.
    pub time_remaining: u32,
    pub game_state: String,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub result: Option<GameResult>,
}

/// What happened, as recorded in the action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Started {
        difficulty: Difficulty,
        game_type: GameType,
    },
    Excavated {
        position: GridPosition,
        tool: Tool,
        discoveries: u32,
        violations: u32,
    },
    ToolChanged {
        tool: Tool,
    },
    Documented {
        entry_type: EntryType,
        position: GridPosition,
        required: bool,
    },
    TimeSynced {
        remaining: u32,
    },
    Completed {
        overall_score: u32,
    },
    Abandoned,
}

impl ActionKind {
    /// Compact numeric code for storage columns.
    pub fn code(&self) -> u8 {
        match self {
            Self::Started { .. } => 0,
            Self::Excavated { .. } => 1,
            Self::ToolChanged { .. } => 2,
            Self::Documented { .. } => 3,
            Self::TimeSynced { .. } => 4,
            Self::Completed { .. } => 5,
            Self::Abandoned => 6,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                difficulty,
                game_type,
            } => write!(f, "started {} game ({})", game_type, difficulty),
            Self::Excavated {
                position,
                tool,
                discoveries,
                violations,
            } => write!(
                f,
                "{} at {}: {} discoveries, {} violations",
                tool, position, discoveries, violations
            ),
            Self::ToolChanged { tool } => write!(f, "switched to {}", tool),
            Self::Documented {
                entry_type,
                position,
                required,
            } => write!(
                f,
                "{} recorded at {}{}",
                entry_type,
                position,
                if *required { " (required)" } else { "" }
            ),
            Self::TimeSynced { remaining } => write!(f, "{}s remaining", remaining),
            Self::Completed { overall_score } => write!(f, "completed with {}", overall_score),
            Self::Abandoned => f.write_str("abandoned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub session_id: u64,
    /// Position in the session's log, starting at 0.
    pub sequence: u32,
    pub at_ms: u64,
    pub action: ActionKind,
}

/// Outcome of a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    Completed(GameResult),
    /// Documentation challenge not finished yet; the session stays active.
    RequirementsUnmet { missing: Vec<MissingRequirement> },
}

/// Everything a client needs to render a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub session: SessionRecord,
    pub site: ExcavationSite,
    pub game_data: GameData,
    pub completion: CompletionBreakdown,
    pub protocol_compliance: f32,
}

// ============================================================================
// STORE
// ============================================================================

/// Persistence the session operations run against.
///
/// Implemented over SpacetimeDB tables by the server module and by
/// [`InMemoryStore`](crate::store::InMemoryStore) for tests and the harness.
pub trait GameStore {
    fn site(&self, site_id: u64) -> Result<Option<ExcavationSite>>;
    fn session(&self, session_id: u64) -> Result<Option<SessionRecord>>;
    /// Insert a new session, ignoring `session.id`. Returns the assigned id.
    fn insert_session(&mut self, session: SessionRecord) -> Result<u64>;
    fn update_session(&mut self, session: &SessionRecord) -> Result<()>;
    fn append_action(&mut self, entry: ActionLogEntry) -> Result<()>;
    fn action_count(&self, session_id: u64) -> Result<u32>;
    fn progress(&self, user_id: u64) -> Result<Option<UserProgress>>;
    fn save_progress(&mut self, progress: &UserProgress) -> Result<()>;
}

fn log_action<S: GameStore + ?Sized>(
    store: &mut S,
    session_id: u64,
    at_ms: u64,
    action: ActionKind,
) -> Result<()> {
    let sequence = store.action_count(session_id)?;
    store.append_action(ActionLogEntry {
        session_id,
        sequence,
        at_ms,
        action,
    })
}

fn update_progress<S: GameStore + ?Sized>(
    store: &mut S,
    user_id: u64,
    apply: impl FnOnce(&mut UserProgress),
) -> Result<()> {
    let mut progress = store
        .progress(user_id)?
        .unwrap_or_else(|| UserProgress::new(user_id));
    apply(&mut progress);
    store.save_progress(&progress)
}

fn require_site<S: GameStore + ?Sized>(store: &S, site_id: u64) -> Result<ExcavationSite> {
    store.site(site_id)?.ok_or(GameError::SiteNotFound(site_id))
}

fn require_session<S: GameStore + ?Sized>(store: &S, session_id: u64) -> Result<SessionRecord> {
    store
        .session(session_id)?
        .ok_or(GameError::SessionNotFound(session_id))
}

/// Session, site and decoded state, in one load.
struct Loaded {
    session: SessionRecord,
    site: ExcavationSite,
    data: GameData,
}

fn load<S: GameStore + ?Sized>(store: &S, session_id: u64) -> Result<Loaded> {
    let session = require_session(store, session_id)?;
    let site = require_site(store, session.site_id)?;
    let data = GameData::decode(session_id, &session.game_state, &site)?;
    if data.game_type() != session.game_type {
        return Err(GameError::InvalidState {
            session_id,
            reason: format!(
                "record says {} but state is {}",
                session.game_type,
                data.game_type()
            ),
        });
    }
    Ok(Loaded {
        session,
        site,
        data,
    })
}

fn load_active<S: GameStore + ?Sized>(store: &S, session_id: u64) -> Result<Loaded> {
    let loaded = load(store, session_id)?;
    if loaded.session.status != SessionStatus::Active {
        return Err(GameError::SessionNotActive {
            session_id,
            status: loaded.session.status,
        });
    }
    Ok(loaded)
}

fn score_state(data: &GameData, config: &GameConfig) -> (CompletionBreakdown, f32) {
    let state = data.state();
    let completion = compute_completion(&state.completion_inputs(), &config.completion_weights);
    let compliance = compliance_score(
        state.violations.len(),
        state.severe_violations(),
        &config.penalties,
    );
    (completion, compliance)
}

/// Re-score and write back the session with its new state.
fn persist<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    mut loaded: Loaded,
) -> Result<SessionRecord> {
    let (completion, compliance) = score_state(&loaded.data, config);
    loaded.session.completion_percentage = completion.overall;
    loaded.session.score = overall_score(completion.overall, compliance);
    loaded.session.game_state = loaded.data.encode()?;
    store.update_session(&loaded.session)?;
    Ok(loaded.session)
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Create a session for `user_id` on `site_id`. Returns the new session id.
pub fn start_game<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    user_id: u64,
    site_id: u64,
    difficulty: Difficulty,
    game_type: GameType,
    now_ms: u64,
) -> Result<u64> {
    let site = require_site(store, site_id)?;
    let data = GameData::new(game_type, &site);
    let (completion, _) = score_state(&data, config);

    let session_id = store.insert_session(SessionRecord {
        id: 0,
        user_id,
        site_id,
        difficulty,
        game_type,
        status: SessionStatus::Active,
        score: 0,
        max_score: MAX_SCORE,
        completion_percentage: completion.overall,
        time_remaining: config.time_limit(difficulty),
        game_state: data.encode()?,
        started_at_ms: now_ms,
        ended_at_ms: None,
        result: None,
    })?;

    log_action(
        store,
        session_id,
        now_ms,
        ActionKind::Started {
            difficulty,
            game_type,
        },
    )?;
    update_progress(store, user_id, UserProgress::record_start)?;

    log::info!(
        "Session {} started: user {} on site '{}' ({}, {})",
        session_id,
        user_id,
        site.name,
        game_type,
        difficulty
    );
    Ok(session_id)
}

/// Apply a tool to a cell. Misuse is recorded as a violation, not an error.
pub fn process_excavation_action<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    session_id: u64,
    position: GridPosition,
    tool: Tool,
    now_ms: u64,
) -> Result<ActionFeedback> {
    let mut loaded = load_active(store, session_id)?;
    let feedback = loaded
        .data
        .state_mut()
        .excavate(position, tool, config)?;

    for violation in &feedback.violations {
        log::warn!(
            "Session {}: {} violation: {}",
            session_id,
            violation.severity,
            violation.message
        );
    }
    for discovery in &feedback.discoveries {
        log::info!(
            "Session {}: discovered '{}' at {}",
            session_id,
            discovery.name,
            discovery.position
        );
    }

    persist(store, config, loaded)?;
    log_action(
        store,
        session_id,
        now_ms,
        ActionKind::Excavated {
            position,
            tool,
            discoveries: feedback.discoveries.len() as u32,
            violations: feedback.violations.len() as u32,
        },
    )?;
    Ok(feedback)
}

/// Put a different tool in the player's hand.
pub fn change_tool<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    session_id: u64,
    tool: Tool,
    now_ms: u64,
) -> Result<()> {
    let mut loaded = load_active(store, session_id)?;
    if loaded.data.state().current_tool == tool {
        return Ok(());
    }
    loaded.data.state_mut().current_tool = tool;
    persist(store, config, loaded)?;
    log_action(store, session_id, now_ms, ActionKind::ToolChanged { tool })
}

/// Record a field-notebook entry.
#[allow(clippy::too_many_arguments)]
pub fn add_documentation_entry<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    session_id: u64,
    entry_type: EntryType,
    content: &str,
    position: GridPosition,
    artifact_id: Option<u64>,
    now_ms: u64,
) -> Result<DocumentationEntry> {
    let mut loaded = load_active(store, session_id)?;
    let entry = loaded
        .data
        .state_mut()
        .record_documentation(
            loaded.site.id,
            NewEntry {
                entry_type,
                content: content.to_string(),
                position,
                artifact_id,
            },
            now_ms,
        )?
        .clone();

    persist(store, config, loaded)?;
    log_action(
        store,
        session_id,
        now_ms,
        ActionKind::Documented {
            entry_type,
            position,
            required: entry.required,
        },
    )?;
    Ok(entry)
}

/// Finish a session and report its final score.
///
/// Completing an already completed session returns the stored result
/// without re-scoring or logging. A documentation challenge with unmet
/// requirements stays active and reports what is missing, unless the clock
/// has run out.
pub fn complete_game<S: GameStore + ?Sized>(
    store: &mut S,
    config: &GameConfig,
    session_id: u64,
    now_ms: u64,
) -> Result<CompletionOutcome> {
    let loaded = load(store, session_id)?;
    match loaded.session.status {
        SessionStatus::Active => {}
        SessionStatus::Completed => {
            let result = loaded
                .session
                .result
                .clone()
                .ok_or_else(|| GameError::InvalidState {
                    session_id,
                    reason: "completed session has no result".to_string(),
                })?;
            return Ok(CompletionOutcome::Completed(result));
        }
        status @ SessionStatus::Abandoned => {
            return Err(GameError::SessionNotActive { session_id, status });
        }
    }

    if loaded.data.game_type() == GameType::Documentation && loaded.session.time_remaining > 0 {
        let missing = loaded.data.state().missing_requirements();
        if !missing.is_empty() {
            log::info!(
                "Session {}: completion refused, {} requirement(s) outstanding",
                session_id,
                missing.len()
            );
            return Ok(CompletionOutcome::RequirementsUnmet { missing });
        }
    }

    let (completion, compliance) = score_state(&loaded.data, config);
    let state = loaded.data.state();
    let result = GameResult {
        overall_score: overall_score(completion.overall, compliance),
        completion_percentage: completion.overall,
        artifacts_found: state.discovered_artifacts.len() as u32,
        total_artifacts: state.artifacts.len() as u32,
        documentation_quality: completion.documentation,
        protocol_compliance: compliance,
        violations: state.violations.len() as u32,
    };

    let mut session = loaded.session;
    session.status = SessionStatus::Completed;
    session.score = result.overall_score;
    session.completion_percentage = result.completion_percentage;
    session.ended_at_ms = Some(now_ms);
    session.result = Some(result.clone());
    store.update_session(&session)?;

    log_action(
        store,
        session_id,
        now_ms,
        ActionKind::Completed {
            overall_score: result.overall_score,
        },
    )?;
    update_progress(store, session.user_id, |p| p.record_completion(&result))?;

    log::info!(
        "Session {} completed: score {}/{}, {}/{} artifacts, compliance {:.0}",
        session_id,
        result.overall_score,
        MAX_SCORE,
        result.artifacts_found,
        result.total_artifacts,
        result.protocol_compliance
    );
    Ok(CompletionOutcome::Completed(result))
}

/// Leave a session without completing it. Abandoning twice is a no-op.
pub fn abandon_game<S: GameStore + ?Sized>(
    store: &mut S,
    session_id: u64,
    now_ms: u64,
) -> Result<()> {
    let mut session = require_session(store, session_id)?;
    match session.status {
        SessionStatus::Active => {}
        SessionStatus::Abandoned => return Ok(()),
        status @ SessionStatus::Completed => {
            return Err(GameError::SessionNotActive { session_id, status });
        }
    }

    session.status = SessionStatus::Abandoned;
    session.ended_at_ms = Some(now_ms);
    store.update_session(&session)?;
    log_action(store, session_id, now_ms, ActionKind::Abandoned)?;
    update_progress(store, session.user_id, UserProgress::record_abandon)?;

    log::info!("Session {} abandoned", session_id);
    Ok(())
}

/// Record the client's countdown. Returns the remaining time now stored.
pub fn sync_time_remaining<S: GameStore + ?Sized>(
    store: &mut S,
    session_id: u64,
    reported_seconds: u32,
    now_ms: u64,
) -> Result<u32> {
    let mut session = require_session(store, session_id)?;
    if session.status != SessionStatus::Active {
        return Err(GameError::SessionNotActive {
            session_id,
            status: session.status,
        });
    }

    let remaining = reconcile_time_remaining(session.time_remaining, reported_seconds);
    if remaining != session.time_remaining {
        session.time_remaining = remaining;
        store.update_session(&session)?;
        log_action(
            store,
            session_id,
            now_ms,
            ActionKind::TimeSynced { remaining },
        )?;
    }
    Ok(remaining)
}

/// Session, site and decoded state for rendering.
pub fn get_game_state<S: GameStore + ?Sized>(
    store: &S,
    config: &GameConfig,
    session_id: u64,
) -> Result<GameStateView> {
    let loaded = load(store, session_id)?;
    let (completion, protocol_compliance) = score_state(&loaded.data, config);
    Ok(GameStateView {
        session: loaded.session,
        site: loaded.site,
        game_data: loaded.data,
        completion,
        protocol_compliance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::from_u8(s as u8), Some(s));
        }
        assert!(SessionStatus::from_u8(3).is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Abandoned.is_terminal());
    }

    #[test]
    fn test_action_codes_unique() {
        let actions = [
            ActionKind::Started {
                difficulty: Difficulty::Beginner,
                game_type: GameType::Excavation,
            },
            ActionKind::Excavated {
                position: GridPosition::new(0, 0),
                tool: Tool::Brush,
                discoveries: 0,
                violations: 0,
            },
            ActionKind::ToolChanged { tool: Tool::Camera },
            ActionKind::Documented {
                entry_type: EntryType::Note,
                position: GridPosition::new(0, 0),
                required: false,
            },
            ActionKind::TimeSynced { remaining: 1 },
            ActionKind::Completed { overall_score: 1 },
            ActionKind::Abandoned,
        ];
        let codes: std::collections::HashSet<u8> = actions.iter().map(|a| a.code()).collect();
        assert_eq!(codes.len(), actions.len());
    }

    #[test]
    fn test_action_display() {
        let a = ActionKind::Excavated {
            position: GridPosition::new(2, 3),
            tool: Tool::Trowel,
            discoveries: 1,
            violations: 0,
        };
        assert_eq!(a.to_string(), "trowel at (2, 3): 1 discoveries, 0 violations");
        let d = ActionKind::Documented {
            entry_type: EntryType::Photo,
            position: GridPosition::new(1, 1),
            required: true,
        };
        assert_eq!(d.to_string(), "photo recorded at (1, 1) (required)");
    }

    #[test]
    fn test_action_json_tagged() {
        let json = serde_json::to_string(&ActionKind::ToolChanged { tool: Tool::Sieve }).unwrap();
        assert_eq!(json, r#"{"action":"tool_changed","tool":"sieve"}"#);
    }
}
