//! Error type shared by every game operation.

use crate::session::SessionStatus;

/// Hard failures surfaced to the caller.
///
/// Tool/cell mismatches are not errors; they are recorded as protocol
/// violations and the action still goes through.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("session not found: {0}")]
    SessionNotFound(u64),

    #[error("site not found: {0}")]
    SiteNotFound(u64),

    #[error("artifact {artifact_id} does not belong to site {site_id}")]
    UnknownArtifact { site_id: u64, artifact_id: u64 },

    #[error("artifact {0} has not been discovered yet")]
    ArtifactNotDiscovered(u64),

    #[error("session {session_id} is {status}, not active")]
    SessionNotActive {
        session_id: u64,
        status: SessionStatus,
    },

    #[error("position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown documentation type: {0}")]
    UnknownEntryType(String),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(u8),

    #[error("documentation content is empty")]
    EmptyContent,

    #[error("cannot photograph unexcavated cell ({x}, {y})")]
    PhotoOfUnexcavatedCell { x: u32, y: u32 },

    #[error("corrupt game state for session {session_id}: {source}")]
    CorruptState {
        session_id: u64,
        source: serde_json::Error,
    },

    #[error("invalid game state for session {session_id}: {reason}")]
    InvalidState { session_id: u64, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid site: {0}")]
    InvalidSite(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
