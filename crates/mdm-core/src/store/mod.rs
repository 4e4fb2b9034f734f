//! Release store (SQLite via sqlx).
//!
//! Holds movies and their per-format releases (one forum thread each, with
//! the raw mirror list). The orchestrator reads pending work from here and
//! writes back cascading completion marks.

mod db;
mod releases;
mod types;


pub use db::ReleaseDb;
pub use types::*;

#[cfg(test)]
pub(crate) use db::open_memory;
