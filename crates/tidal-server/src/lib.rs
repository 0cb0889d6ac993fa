//! Tidal Explorers Server - SpacetimeDB Module
//!
//! Underwater archaeology training game running as a SpacetimeDB module.
//! Game rules live in tidal-logic; reducers here resolve the caller, load
//! rows through `store::TableStore`, and persist the result. Clients
//! subscribe to the public tables to render sessions.

mod admin;
mod reducers;
mod store;
mod tables;

pub use admin::*;
pub use reducers::*;
pub use tables::*;
