//! Pure excavation game logic for Tidal Explorers.
//!
//! This crate contains the dig-site session state machine independent of any
//! database, engine, or runtime. Transition functions take plain data and
//! return results, making them unit-testable and portable across SpacetimeDB
//! (WASM), the headless harness, and any future host.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Difficulty levels, tool increments, time limits, scoring weights |
//! | [`content`] | Append-only content-version log helpers |
//! | [`documentation`] | Documentation entry types and requirement matching |
//! | [`error`] | `GameError` and the crate `Result` alias |
//! | [`grid`] | Grid positions, cells, and the excavation grid |
//! | [`progress`] | Per-user progress tallies and session statistics |
//! | [`scoring`] | Completion sub-scores, compliance score, final score |
//! | [`session`] | Session records, action log, and the game operations |
//! | [`site`] | Excavation sites, artifacts, validation, practice sites |
//! | [`state`] | Typed per-session game state and its transitions |
//! | [`store`] | In-memory `GameStore` for tests and headless runs |
//! | [`timer`] | Client-side countdown |
//! | [`tools`] | Tool kinds and the tool/cell compatibility check |
//! | [`violations`] | Protocol violations and severities |

pub mod config;
pub mod content;
pub mod documentation;
pub mod error;
pub mod grid;
pub mod progress;
pub mod scoring;
pub mod session;
pub mod site;
pub mod state;
pub mod store;
pub mod timer;
pub mod tools;
pub mod violations;

pub use error::{GameError, Result};
