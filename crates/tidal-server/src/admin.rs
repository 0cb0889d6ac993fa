//! Admin reducers for authoring sites and tuning the game.
//!
//! Every change writes an audit row and a content snapshot so earlier
//! versions of a site or config can be inspected later.

use crate::reducers::current_player;
use crate::store::{load_config, TableStore};
use crate::tables::*;
use serde::Serialize;
use spacetimedb::{reducer, ReducerContext, Table};
use tidal_logic::config::{Difficulty, GameConfig};
use tidal_logic::content::{snapshot, ContentKind, ContentVersion};
use tidal_logic::documentation::{DocumentationRequirement, EntryType};
use tidal_logic::grid::GridPosition;
use tidal_logic::session::GameStore;
use tidal_logic::site::{
    default_requirements_for, generate_practice_site as build_practice_site, validate_site,
    ArtifactCondition, ExcavationSite, SiteArtifact,
};

fn require_admin(ctx: &ReducerContext) -> Result<Player, String> {
    let player = current_player(ctx)?;
    if !player.is_admin {
        log::warn!("Non-admin player {} attempted an admin action", player.id);
        return Err("admin privileges required".to_string());
    }
    Ok(player)
}

fn audit(ctx: &ReducerContext, action: &str, target_id: u64, detail: String) {
    log::info!("[ADMIN] {} {}: {}", action, target_id, detail);
    ctx.db.audit_log().insert(AuditEntry {
        id: 0,
        actor: ctx.sender,
        action: action.to_string(),
        target_id,
        detail,
        at: ctx.timestamp,
    });
}

/// Append the next snapshot of a piece of content.
fn record_version<T: Serialize>(
    ctx: &ReducerContext,
    kind: ContentKind,
    content_id: u64,
    value: &T,
    note: &str,
) -> Result<(), String> {
    let history: Vec<ContentVersion> = ctx
        .db
        .content_version()
        .content_id()
        .filter(&content_id)
        .filter(|r| r.kind == kind as u8)
        .map(|r| ContentVersion {
            kind,
            content_id: r.content_id,
            version: r.version,
            snapshot: String::new(),
            note: r.note,
        })
        .collect();
    let version = snapshot(&history, kind, content_id, value, note).map_err(|e| e.to_string())?;
    ctx.db.content_version().insert(ContentRevision {
        id: 0,
        kind: version.kind as u8,
        content_id: version.content_id,
        version: version.version,
        snapshot: version.snapshot,
        note: version.note,
        author: ctx.sender,
        at: ctx.timestamp,
    });
    Ok(())
}

fn load_site(ctx: &ReducerContext, site_id: u64) -> Result<ExcavationSite, String> {
    TableStore::new(ctx)
        .site(site_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("site not found: {}", site_id))
}

fn check_site(site: &ExcavationSite) -> Result<(), String> {
    let errors = validate_site(site);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn insert_requirement(
    ctx: &ReducerContext,
    site_id: u64,
    req: &DocumentationRequirement,
) -> DocRequirement {
    ctx.db.documentation_requirement().insert(DocRequirement {
        id: 0,
        site_id,
        entry_type: req.entry_type as u8,
        x: req.position.x,
        y: req.position.y,
        artifact_id: req.artifact_id,
        description: req.description.clone(),
    })
}

// ============================================================================
// SITE AUTHORING
// ============================================================================

#[reducer]
pub fn create_site(
    ctx: &ReducerContext,
    name: String,
    description: String,
    width: u32,
    height: u32,
) -> Result<(), String> {
    require_admin(ctx)?;
    let mut site = ExcavationSite {
        id: 0,
        name: name.trim().to_string(),
        description,
        width,
        height,
        artifacts: Vec::new(),
        required_documentation: Vec::new(),
    };
    check_site(&site)?;

    let row = ctx.db.excavation_site().insert(DigSite {
        id: 0,
        name: site.name.clone(),
        description: site.description.clone(),
        width,
        height,
        created_by: ctx.sender,
        created_at: ctx.timestamp,
    });
    site.id = row.id;
    record_version(ctx, ContentKind::Site, site.id, &site, "created")?;
    audit(ctx, "create_site", site.id, format!("'{}' {}x{}", site.name, width, height));
    Ok(())
}

/// Bury an artifact. With `default_requirements`, also require a photo and a
/// measurement of it.
#[reducer]
#[allow(clippy::too_many_arguments)]
pub fn add_site_artifact(
    ctx: &ReducerContext,
    site_id: u64,
    name: String,
    x: u32,
    y: u32,
    depth: f32,
    condition: u8,
    description: String,
    default_requirements: bool,
) -> Result<(), String> {
    require_admin(ctx)?;
    let condition = ArtifactCondition::from_u8(condition)
        .ok_or_else(|| format!("unknown artifact condition: {}", condition))?;
    let mut site = load_site(ctx, site_id)?;
    let next_id = site.artifacts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    let mut artifact = SiteArtifact {
        id: next_id,
        name: name.trim().to_string(),
        position: GridPosition::new(x, y),
        depth,
        condition,
        description,
    };
    site.artifacts.push(artifact.clone());
    check_site(&site)?;

    let row = ctx.db.site_artifact().insert(Artifact {
        id: 0,
        site_id,
        name: artifact.name.clone(),
        x,
        y,
        depth,
        condition: condition as u8,
        description: artifact.description.clone(),
    });
    artifact.id = row.id;
    record_version(ctx, ContentKind::Artifact, artifact.id, &artifact, "created")?;

    if default_requirements {
        for req in default_requirements_for(&artifact) {
            let req_row = insert_requirement(ctx, site_id, &req);
            record_version(ctx, ContentKind::Requirement, req_row.id, &req, "default")?;
        }
    }
    audit(
        ctx,
        "add_site_artifact",
        artifact.id,
        format!("'{}' at {} on site {}", artifact.name, artifact.position, site_id),
    );
    Ok(())
}

#[reducer]
pub fn add_documentation_requirement(
    ctx: &ReducerContext,
    site_id: u64,
    entry_type: String,
    x: u32,
    y: u32,
    artifact_id: Option<u64>,
    description: String,
) -> Result<(), String> {
    require_admin(ctx)?;
    let entry_type: EntryType = entry_type
        .parse()
        .map_err(|e: tidal_logic::GameError| e.to_string())?;
    let mut site = load_site(ctx, site_id)?;
    let req = DocumentationRequirement {
        entry_type,
        position: GridPosition::new(x, y),
        artifact_id,
        description: description.trim().to_string(),
    };
    site.required_documentation.push(req.clone());
    check_site(&site)?;

    let row = insert_requirement(ctx, site_id, &req);
    record_version(ctx, ContentKind::Requirement, row.id, &req, "created")?;
    audit(
        ctx,
        "add_documentation_requirement",
        row.id,
        format!("{} at {} on site {}", entry_type, req.position, site_id),
    );
    Ok(())
}

/// Create a seeded practice site with default documentation requirements.
#[reducer]
pub fn generate_practice_site(ctx: &ReducerContext, seed: u64, difficulty: u8) -> Result<(), String> {
    require_admin(ctx)?;
    let difficulty = Difficulty::parse(difficulty).map_err(|e| e.to_string())?;
    let mut site = build_practice_site(0, seed, difficulty);

    let row = ctx.db.excavation_site().insert(DigSite {
        id: 0,
        name: site.name.clone(),
        description: site.description.clone(),
        width: site.width,
        height: site.height,
        created_by: ctx.sender,
        created_at: ctx.timestamp,
    });
    site.id = row.id;

    // Artifact ids are reassigned by the table; remap requirements to match.
    let mut remapped = Vec::with_capacity(site.artifacts.len());
    for artifact in &mut site.artifacts {
        let stored = ctx.db.site_artifact().insert(Artifact {
            id: 0,
            site_id: site.id,
            name: artifact.name.clone(),
            x: artifact.position.x,
            y: artifact.position.y,
            depth: artifact.depth,
            condition: artifact.condition as u8,
            description: artifact.description.clone(),
        });
        remapped.push((artifact.id, stored.id));
        artifact.id = stored.id;
    }
    for req in &mut site.required_documentation {
        req.artifact_id = req.artifact_id.and_then(|old| {
            remapped
                .iter()
                .find(|(from, _)| *from == old)
                .map(|(_, to)| *to)
        });
        insert_requirement(ctx, site.id, req);
    }

    record_version(ctx, ContentKind::Site, site.id, &site, "generated")?;
    audit(
        ctx,
        "generate_practice_site",
        site.id,
        format!("seed {} ({}), {} artifacts", seed, difficulty, site.artifacts.len()),
    );
    Ok(())
}

// ============================================================================
// SETTINGS & ROLES
// ============================================================================

/// Replace the game config. The JSON is validated before it is stored.
#[reducer]
pub fn update_game_config(ctx: &ReducerContext, config_json: String) -> Result<(), String> {
    require_admin(ctx)?;
    let config = GameConfig::from_json(&config_json).map_err(|e| e.to_string())?;
    let previous = load_config(ctx).map_err(|e| e.to_string())?;
    if previous == config {
        return Ok(());
    }

    let settings = GameSettings {
        id: 0,
        config_json: config.to_json().map_err(|e| e.to_string())?,
        updated_at: ctx.timestamp,
    };
    if ctx.db.game_settings().id().find(0).is_some() {
        ctx.db.game_settings().id().update(settings);
    } else {
        ctx.db.game_settings().insert(settings);
    }

    record_version(ctx, ContentKind::Config, 0, &config, "updated")?;
    audit(ctx, "update_game_config", 0, config_summary(&config));
    Ok(())
}

fn config_summary(config: &GameConfig) -> String {
    format!(
        "time limits {}/{}/{}s, increments {}/{}/{}",
        config.time_limits.beginner,
        config.time_limits.intermediate,
        config.time_limits.advanced,
        config.tool_increments.trowel,
        config.tool_increments.brush,
        config.tool_increments.probe
    )
}

#[reducer]
pub fn grant_admin(ctx: &ReducerContext, player_id: u64) -> Result<(), String> {
    require_admin(ctx)?;
    let Some(mut player) = ctx.db.player().id().find(player_id) else {
        return Err(format!("player not found: {}", player_id));
    };
    if player.is_admin {
        return Ok(());
    }
    player.is_admin = true;
    let name = player.display_name.clone();
    ctx.db.player().id().update(player);
    audit(ctx, "grant_admin", player_id, name);
    Ok(())
}
