//! Client-facing reducers for playing a session.
//!
//! Each reducer resolves the calling player, checks they own the session,
//! and hands off to the matching operation in `tidal_logic::session`.
//! Returning `Err` rolls back the whole call.

use crate::store::{load_config, now_ms, TableStore};
use crate::tables::*;
use spacetimedb::{reducer, ReducerContext, Table};
use tidal_logic::config::{Difficulty, GameConfig};
use tidal_logic::documentation::EntryType;
use tidal_logic::grid::GridPosition;
use tidal_logic::session::{self, CompletionOutcome};
use tidal_logic::state::GameType;
use tidal_logic::tools::Tool;

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Seed the settings singleton on first publish
#[reducer(init)]
pub fn init(ctx: &ReducerContext) -> Result<(), String> {
    if ctx.db.game_settings().id().find(0).is_some() {
        return Ok(());
    }
    let config_json = GameConfig::default().to_json().map_err(|e| e.to_string())?;
    ctx.db.game_settings().insert(GameSettings {
        id: 0,
        config_json,
        updated_at: ctx.timestamp,
    });
    log::info!("Game settings initialized with defaults");
    Ok(())
}

/// Called when a client connects
#[reducer(client_connected)]
pub fn client_connected(ctx: &ReducerContext) {
    log::info!("Client connected: {:?}", ctx.sender);
    if let Some(mut player) = ctx.db.player().identity().find(ctx.sender) {
        player.online = true;
        ctx.db.player().id().update(player);
    }
}

/// Called when a client disconnects. Sessions stay active so the player can
/// resume them.
#[reducer(client_disconnected)]
pub fn client_disconnected(ctx: &ReducerContext) {
    log::info!("Client disconnected: {:?}", ctx.sender);
    if let Some(mut player) = ctx.db.player().identity().find(ctx.sender) {
        player.online = false;
        ctx.db.player().id().update(player);
    }
}

// ============================================================================
// PLAYERS
// ============================================================================

/// Register the caller, or rename them if already registered
#[reducer]
pub fn register_player(ctx: &ReducerContext, display_name: String) -> Result<(), String> {
    let display_name = display_name.trim().to_string();
    if display_name.is_empty() {
        return Err("display name is empty".to_string());
    }

    if let Some(mut player) = ctx.db.player().identity().find(ctx.sender) {
        log::info!("Player {} renamed to '{}'", player.id, display_name);
        player.display_name = display_name;
        ctx.db.player().id().update(player);
        return Ok(());
    }

    let is_admin = ctx.db.player().count() == 0;
    let player = ctx.db.player().insert(Player {
        id: 0,
        identity: ctx.sender,
        display_name,
        is_admin,
        online: true,
        joined_at: ctx.timestamp,
    });
    log::info!(
        "Player {} registered as '{}'{}",
        player.id,
        player.display_name,
        if is_admin { " (admin)" } else { "" }
    );
    Ok(())
}

pub(crate) fn current_player(ctx: &ReducerContext) -> Result<Player, String> {
    ctx.db
        .player()
        .identity()
        .find(ctx.sender)
        .ok_or_else(|| "caller is not a registered player".to_string())
}

/// Ensure the caller owns `session_id`.
fn require_owner(ctx: &ReducerContext, session_id: u64) -> Result<(), String> {
    let player = current_player(ctx)?;
    let Some(session) = ctx.db.game_session().id().find(session_id) else {
        return Err(format!("session not found: {}", session_id));
    };
    if session.user_id != player.id {
        log::warn!(
            "Player {} tried to act on session {} owned by {}",
            player.id,
            session_id,
            session.user_id
        );
        return Err(format!("session {} belongs to another player", session_id));
    }
    Ok(())
}

// ============================================================================
// SESSION REDUCERS
// ============================================================================

fn start(
    ctx: &ReducerContext,
    site_id: u64,
    difficulty: u8,
    game_type: GameType,
) -> Result<(), String> {
    let player = current_player(ctx)?;
    let difficulty = Difficulty::parse(difficulty).map_err(|e| e.to_string())?;
    let config = load_config(ctx).map_err(|e| e.to_string())?;
    let mut store = TableStore::new(ctx);
    session::start_game(
        &mut store,
        &config,
        player.id,
        site_id,
        difficulty,
        game_type,
        now_ms(ctx),
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

/// Start a free excavation session
#[reducer]
pub fn start_game(ctx: &ReducerContext, site_id: u64, difficulty: u8) -> Result<(), String> {
    start(ctx, site_id, difficulty, GameType::Excavation)
}

/// Start a documentation challenge
#[reducer]
pub fn start_documentation_challenge(
    ctx: &ReducerContext,
    site_id: u64,
    difficulty: u8,
) -> Result<(), String> {
    start(ctx, site_id, difficulty, GameType::Documentation)
}

/// Apply a tool to a grid cell. Misuse is recorded as a violation.
#[reducer]
pub fn process_excavation_action(
    ctx: &ReducerContext,
    session_id: u64,
    x: u32,
    y: u32,
    tool: String,
) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let tool: Tool = tool.parse().map_err(|e: tidal_logic::GameError| e.to_string())?;
    let config = load_config(ctx).map_err(|e| e.to_string())?;
    let at_ms = now_ms(ctx);
    let mut store = TableStore::new(ctx);

    let feedback = session::process_excavation_action(
        &mut store,
        &config,
        session_id,
        GridPosition::new(x, y),
        tool,
        at_ms,
    )
    .map_err(|e| e.to_string())?;

    let row = LastFeedback {
        session_id,
        x,
        y,
        tool: tool.id().to_string(),
        depth: feedback.cell.excavation_depth,
        discoveries: feedback.discoveries.iter().map(|d| d.artifact_id).collect(),
        violation_messages: feedback
            .violations
            .iter()
            .map(|v| format!("[{}] {}", v.severity, v.message))
            .collect(),
        at_ms,
    };
    if ctx.db.last_feedback().session_id().find(session_id).is_some() {
        ctx.db.last_feedback().session_id().update(row);
    } else {
        ctx.db.last_feedback().insert(row);
    }
    Ok(())
}

#[reducer]
pub fn change_tool(ctx: &ReducerContext, session_id: u64, tool: String) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let tool: Tool = tool.parse().map_err(|e: tidal_logic::GameError| e.to_string())?;
    let config = load_config(ctx).map_err(|e| e.to_string())?;
    let mut store = TableStore::new(ctx);
    session::change_tool(&mut store, &config, session_id, tool, now_ms(ctx))
        .map_err(|e| e.to_string())
}

#[reducer]
pub fn add_documentation_entry(
    ctx: &ReducerContext,
    session_id: u64,
    entry_type: String,
    content: String,
    x: u32,
    y: u32,
    artifact_id: Option<u64>,
) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let entry_type: EntryType = entry_type
        .parse()
        .map_err(|e: tidal_logic::GameError| e.to_string())?;
    let config = load_config(ctx).map_err(|e| e.to_string())?;
    let mut store = TableStore::new(ctx);
    let entry = session::add_documentation_entry(
        &mut store,
        &config,
        session_id,
        entry_type,
        &content,
        GridPosition::new(x, y),
        artifact_id,
        now_ms(ctx),
    )
    .map_err(|e| e.to_string())?;
    log::debug!(
        "Session {}: entry {} ({}){}",
        session_id,
        entry.id,
        entry.entry_type,
        if entry.required { " required" } else { "" }
    );
    Ok(())
}

/// Finish a session. The outcome lands in `completion_feedback`; a refused
/// documentation challenge is not an error.
#[reducer]
pub fn complete_game(ctx: &ReducerContext, session_id: u64) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let config = load_config(ctx).map_err(|e| e.to_string())?;
    let at_ms = now_ms(ctx);
    let mut store = TableStore::new(ctx);
    let outcome = session::complete_game(&mut store, &config, session_id, at_ms)
        .map_err(|e| e.to_string())?;

    let row = completion_feedback_row(session_id, &outcome, at_ms);
    if ctx.db.completion_feedback().session_id().find(session_id).is_some() {
        ctx.db.completion_feedback().session_id().update(row);
    } else {
        ctx.db.completion_feedback().insert(row);
    }
    Ok(())
}

fn completion_feedback_row(
    session_id: u64,
    outcome: &CompletionOutcome,
    at_ms: u64,
) -> CompletionFeedback {
    match outcome {
        CompletionOutcome::Completed(result) => CompletionFeedback {
            session_id,
            success: true,
            overall_score: result.overall_score,
            missing: Vec::new(),
            at_ms,
        },
        CompletionOutcome::RequirementsUnmet { missing } => CompletionFeedback {
            session_id,
            success: false,
            overall_score: 0,
            missing: missing.iter().map(|m| m.to_string()).collect(),
            at_ms,
        },
    }
}

#[reducer]
pub fn abandon_game(ctx: &ReducerContext, session_id: u64) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let mut store = TableStore::new(ctx);
    session::abandon_game(&mut store, session_id, now_ms(ctx)).map_err(|e| e.to_string())
}

/// Record the client's countdown. The stored value only ever decreases.
#[reducer]
pub fn sync_time_remaining(
    ctx: &ReducerContext,
    session_id: u64,
    seconds: u32,
) -> Result<(), String> {
    require_owner(ctx, session_id)?;
    let mut store = TableStore::new(ctx);
    let remaining = session::sync_time_remaining(&mut store, session_id, seconds, now_ms(ctx))
        .map_err(|e| e.to_string())?;
    if remaining == 0 {
        log::info!("Session {} ran out of time", session_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidal_logic::session::GameResult;
    use tidal_logic::state::MissingRequirement;

    #[test]
    fn test_unmet_requirements_become_feedback() {
        let outcome = CompletionOutcome::RequirementsUnmet {
            missing: vec![
                MissingRequirement::ArtifactsRemaining { count: 2 },
                MissingRequirement::Documentation {
                    entry_type: EntryType::Photo,
                    position: GridPosition::new(3, 1),
                    description: "Photograph the hull timber".into(),
                },
            ],
        };
        let row = completion_feedback_row(9, &outcome, 1_500);
        assert!(!row.success);
        assert_eq!(row.session_id, 9);
        assert_eq!(row.overall_score, 0);
        assert_eq!(
            row.missing,
            vec![
                "2 artifact(s) still buried".to_string(),
                "missing photo at (3, 1): Photograph the hull timber".to_string(),
            ]
        );
    }

    #[test]
    fn test_completed_outcome_reports_score() {
        let outcome = CompletionOutcome::Completed(GameResult {
            overall_score: 72,
            completion_percentage: 80.0,
            artifacts_found: 3,
            total_artifacts: 4,
            documentation_quality: 50.0,
            protocol_compliance: 90.0,
            violations: 1,
        });
        let row = completion_feedback_row(4, &outcome, 2_000);
        assert!(row.success);
        assert_eq!(row.overall_score, 72);
        assert!(row.missing.is_empty());
    }
}
