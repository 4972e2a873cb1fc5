//! Authoritative player movement server
//!
//! Per-tick movement interception for players and vehicles, plus the
//! fixed-step simulation that drives it.

pub mod config;
pub mod game;
pub mod movement;
pub mod util;
