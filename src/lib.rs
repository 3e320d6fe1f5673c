//! Download-cache-transform pipeline for ESPN NBA data: season schedules,
//! per-game summaries, and flattened play-by-play / box score tables.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod games;
pub mod logging;
pub mod pool;
pub mod report;
pub mod schedule;
pub mod source;
pub mod store;
pub mod table;

#[cfg(test)]
mod testkit;
