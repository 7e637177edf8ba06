//! # planclone-graph
//!
//! Microsoft Graph Planner binding of [`planclone_core::PlannerService`],
//! over blocking `ureq` calls with a bearer token.

mod client;
mod wire;

pub use client::{AccessToken, GraphClient};
