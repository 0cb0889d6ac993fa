//! `GameStore` over SpacetimeDB tables.
//!
//! Reducers run in a transaction, so a failed operation rolls back every
//! row it touched here.

use crate::tables::*;
use spacetimedb::{ReducerContext, Table};
use tidal_logic::config::{Difficulty, GameConfig};
use tidal_logic::documentation::{DocumentationRequirement, EntryType};
use tidal_logic::grid::GridPosition;
use tidal_logic::progress::UserProgress;
use tidal_logic::session::{ActionLogEntry, GameResult, GameStore, SessionRecord, SessionStatus};
use tidal_logic::site::{ArtifactCondition, ExcavationSite, SiteArtifact};
use tidal_logic::state::GameType;
use tidal_logic::{GameError, Result};

/// Milliseconds since the Unix epoch for the current reducer call.
pub fn now_ms(ctx: &ReducerContext) -> u64 {
    (ctx.timestamp.to_micros_since_unix_epoch() / 1000).max(0) as u64
}

/// Current game settings. Falls back to defaults before `init` has seeded
/// the singleton.
pub fn load_config(ctx: &ReducerContext) -> Result<GameConfig> {
    match ctx.db.game_settings().id().find(0) {
        Some(settings) => GameConfig::from_json(&settings.config_json),
        None => {
            log::warn!("game_settings missing, using defaults");
            Ok(GameConfig::default())
        }
    }
}

pub struct TableStore<'a> {
    ctx: &'a ReducerContext,
}

impl<'a> TableStore<'a> {
    pub fn new(ctx: &'a ReducerContext) -> Self {
        Self { ctx }
    }
}

// ============================================================================
// ROW CONVERSIONS
// ============================================================================

fn corrupt(what: &str, id: u64, value: u8) -> GameError {
    GameError::Storage(format!("{} {} has unknown code {}", what, id, value))
}

pub fn artifact_from_row(row: &Artifact) -> Result<SiteArtifact> {
    Ok(SiteArtifact {
        id: row.id,
        name: row.name.clone(),
        position: GridPosition::new(row.x, row.y),
        depth: row.depth,
        condition: ArtifactCondition::from_u8(row.condition)
            .ok_or_else(|| corrupt("artifact", row.id, row.condition))?,
        description: row.description.clone(),
    })
}

pub fn requirement_from_row(row: &DocRequirement) -> Result<DocumentationRequirement> {
    Ok(DocumentationRequirement {
        entry_type: EntryType::from_u8(row.entry_type)
            .ok_or_else(|| corrupt("requirement", row.id, row.entry_type))?,
        position: GridPosition::new(row.x, row.y),
        artifact_id: row.artifact_id,
        description: row.description.clone(),
    })
}

fn result_from_row(r: &StoredResult) -> GameResult {
    GameResult {
        overall_score: r.overall_score,
        completion_percentage: r.completion_percentage,
        artifacts_found: r.artifacts_found,
        total_artifacts: r.total_artifacts,
        documentation_quality: r.documentation_quality,
        protocol_compliance: r.protocol_compliance,
        violations: r.violations,
    }
}

fn result_to_row(r: &GameResult) -> StoredResult {
    StoredResult {
        overall_score: r.overall_score,
        completion_percentage: r.completion_percentage,
        artifacts_found: r.artifacts_found,
        total_artifacts: r.total_artifacts,
        documentation_quality: r.documentation_quality,
        protocol_compliance: r.protocol_compliance,
        violations: r.violations,
    }
}

fn session_from_row(row: &GameSession) -> Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.id,
        user_id: row.user_id,
        site_id: row.site_id,
        difficulty: Difficulty::from_u8(row.difficulty)
            .ok_or_else(|| corrupt("session difficulty", row.id, row.difficulty))?,
        game_type: GameType::from_u8(row.game_type)
            .ok_or_else(|| corrupt("session game type", row.id, row.game_type))?,
        status: SessionStatus::from_u8(row.status)
            .ok_or_else(|| corrupt("session status", row.id, row.status))?,
        score: row.score,
        max_score: row.max_score,
        completion_percentage: row.completion_percentage,
        time_remaining: row.time_remaining,
        game_state: row.game_state.clone(),
        started_at_ms: row.started_at_ms,
        ended_at_ms: row.ended_at_ms,
        result: row.result.as_ref().map(result_from_row),
    })
}

fn session_to_row(s: &SessionRecord) -> GameSession {
    GameSession {
        id: s.id,
        user_id: s.user_id,
        site_id: s.site_id,
        difficulty: s.difficulty as u8,
        game_type: s.game_type as u8,
        status: s.status as u8,
        score: s.score,
        max_score: s.max_score,
        completion_percentage: s.completion_percentage,
        time_remaining: s.time_remaining,
        game_state: s.game_state.clone(),
        started_at_ms: s.started_at_ms,
        ended_at_ms: s.ended_at_ms,
        result: s.result.as_ref().map(result_to_row),
    }
}

fn progress_to_row(p: &UserProgress) -> PlayerProgress {
    PlayerProgress {
        user_id: p.user_id,
        games_started: p.games_started,
        games_completed: p.games_completed,
        games_abandoned: p.games_abandoned,
        best_score: p.best_score,
        total_score: p.total_score,
        total_artifacts_found: p.total_artifacts_found,
        total_violations: p.total_violations,
    }
}

// ============================================================================
// GAME STORE
// ============================================================================

impl GameStore for TableStore<'_> {
    fn site(&self, site_id: u64) -> Result<Option<ExcavationSite>> {
        let Some(row) = self.ctx.db.excavation_site().id().find(site_id) else {
            return Ok(None);
        };

        let mut artifacts = self
            .ctx
            .db
            .site_artifact()
            .site_id()
            .filter(&site_id)
            .map(|a| artifact_from_row(&a))
            .collect::<Result<Vec<_>>>()?;
        artifacts.sort_by_key(|a| a.id);

        let mut requirement_rows: Vec<DocRequirement> = self
            .ctx
            .db
            .documentation_requirement()
            .site_id()
            .filter(&site_id)
            .collect();
        requirement_rows.sort_by_key(|r| r.id);
        let required_documentation = requirement_rows
            .iter()
            .map(requirement_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ExcavationSite {
            id: row.id,
            name: row.name,
            description: row.description,
            width: row.width,
            height: row.height,
            artifacts,
            required_documentation,
        }))
    }

    fn session(&self, session_id: u64) -> Result<Option<SessionRecord>> {
        self.ctx
            .db
            .game_session()
            .id()
            .find(session_id)
            .map(|row| session_from_row(&row))
            .transpose()
    }

    fn insert_session(&mut self, session: SessionRecord) -> Result<u64> {
        let mut row = session_to_row(&session);
        row.id = 0;
        Ok(self.ctx.db.game_session().insert(row).id)
    }

    fn update_session(&mut self, session: &SessionRecord) -> Result<()> {
        self.ctx.db.game_session().id().update(session_to_row(session));
        Ok(())
    }

    fn append_action(&mut self, entry: ActionLogEntry) -> Result<()> {
        self.ctx.db.session_action().insert(SessionAction {
            id: 0,
            session_id: entry.session_id,
            sequence: entry.sequence,
            at_ms: entry.at_ms,
            kind: entry.action.code(),
            detail: serde_json::to_string(&entry.action)?,
        });
        Ok(())
    }

    fn action_count(&self, session_id: u64) -> Result<u32> {
        Ok(self
            .ctx
            .db
            .session_action()
            .session_id()
            .filter(&session_id)
            .count() as u32)
    }

    fn progress(&self, user_id: u64) -> Result<Option<UserProgress>> {
        Ok(self
            .ctx
            .db
            .user_progress()
            .user_id()
            .find(user_id)
            .map(|row| UserProgress {
                user_id: row.user_id,
                games_started: row.games_started,
                games_completed: row.games_completed,
                games_abandoned: row.games_abandoned,
                best_score: row.best_score,
                total_score: row.total_score,
                total_artifacts_found: row.total_artifacts_found,
                total_violations: row.total_violations,
            }))
    }

    fn save_progress(&mut self, progress: &UserProgress) -> Result<()> {
        let row = progress_to_row(progress);
        if self.ctx.db.user_progress().user_id().find(row.user_id).is_some() {
            self.ctx.db.user_progress().user_id().update(row);
        } else {
            self.ctx.db.user_progress().insert(row);
        }
        Ok(())
    }
}
