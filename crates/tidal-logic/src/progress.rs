//! Per-user progress tallies and plain statistics over session records.

use serde::{Deserialize, Serialize};

use crate::session::{GameResult, SessionRecord, SessionStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: u64,
    pub games_started: u32,
    pub games_completed: u32,
    pub games_abandoned: u32,
    pub best_score: u32,
    pub total_score: u64,
    pub total_artifacts_found: u32,
    pub total_violations: u32,
}

impl UserProgress {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn record_start(&mut self) {
        self.games_started += 1;
    }

    pub fn record_completion(&mut self, result: &GameResult) {
        self.games_completed += 1;
        self.best_score = self.best_score.max(result.overall_score);
        self.total_score += result.overall_score as u64;
        self.total_artifacts_found += result.artifacts_found;
        self.total_violations += result.violations;
    }

    pub fn record_abandon(&mut self) {
        self.games_abandoned += 1;
    }

    pub fn average_score(&self) -> f32 {
        if self.games_completed == 0 {
            0.0
        } else {
            self.total_score as f32 / self.games_completed as f32
        }
    }
}

/// Aggregate view over a set of sessions (e.g. all plays of one site).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub abandoned: usize,
    /// Mean final score of completed sessions.
    pub average_score: f32,
    /// Mean completion percentage of completed sessions.
    pub average_completion: f32,
    /// Completed / (completed + abandoned), as a percentage.
    pub completion_rate: f32,
}

pub fn summarize_sessions<'a>(
    sessions: impl IntoIterator<Item = &'a SessionRecord>,
) -> SessionStatistics {
    let mut stats = SessionStatistics::default();
    let mut score_sum = 0.0_f32;
    let mut completion_sum = 0.0_f32;

    for session in sessions {
        stats.total += 1;
        match session.status {
            SessionStatus::Active => stats.active += 1,
            SessionStatus::Abandoned => stats.abandoned += 1,
            SessionStatus::Completed => {
                stats.completed += 1;
                score_sum += session.score as f32;
                completion_sum += session.completion_percentage;
            }
        }
    }

    if stats.completed > 0 {
        stats.average_score = score_sum / stats.completed as f32;
        stats.average_completion = completion_sum / stats.completed as f32;
    }
    let finished = stats.completed + stats.abandoned;
    if finished > 0 {
        stats.completion_rate = stats.completed as f32 / finished as f32 * 100.0;
    }
    stats
}
