//! # Scoring.
//!
//! - [`ScoreBoard`] shared counters every worker reports to
//! - [`calc`] / [`summarize`] turn counters into a [`BenchmarkResult`]
//! - [`Reporter`] publishes results (every report interval and once at the end)

mod board;
mod calc;
mod report;
mod tag;

pub use board::{ErrorCounts, ScoreBoard, Verdict};
pub use calc::{BenchmarkResult, ScoreTable, calc, summarize};
pub use report::{LogReporter, Reporter};
pub use tag::{Coefficient, ScoreTag};
