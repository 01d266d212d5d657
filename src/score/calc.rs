//! # Final score computation.
//!
//! ```text
//! raw       = Σ Mag(n) tags × n  +  Σ Fraction(n) tags / n
//! deduction = 50 × (application + HTTP errors)  +  100 × ⌊timeouts / 100⌋
//! score     = max(raw − deduction, 0) × ⌊active students / 10⌋
//! ```
//!
//! A run fails on any critical error, on more deductible errors than the threshold, or
//! when `raw − deduction <= 0`. The first applicable reason wins.

use super::{Coefficient, ErrorCounts, ScoreBoard, ScoreTag};

const DEDUCTION_PER_ERROR: i64 = 50;
const TIMEOUT_DEDUCTION: i64 = 100;
const TIMEOUTS_PER_DEDUCTION: i64 = 100;

/// Count per [`ScoreTag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTable {
    counts: [i64; ScoreTag::ALL.len()],
}

impl ScoreTable {
    pub fn from_fn(f: impl Fn(ScoreTag) -> i64) -> Self {
        Self {
            counts: std::array::from_fn(|i| f(ScoreTag::ALL[i])),
        }
    }

    pub fn get(&self, tag: ScoreTag) -> i64 {
        self.counts[tag.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreTag, i64)> + '_ {
        ScoreTag::ALL.iter().map(|t| (*t, self.get(*t)))
    }
}

/// `(total, raw, deduction)`; `total` may be negative.
pub fn calc(table: &ScoreTable, deduction_count: i64, timeout_count: i64) -> (i64, i64, i64) {
    let raw: i64 = table
        .iter()
        .map(|(tag, n)| match tag.coefficient() {
            Coefficient::Mag(m) => n * m,
            Coefficient::Fraction(f) => n / f,
            Coefficient::Unscored => 0,
        })
        .sum();
    let deduction = deduction_count * DEDUCTION_PER_ERROR
        + (timeout_count / TIMEOUTS_PER_DEDUCTION) * TIMEOUT_DEDUCTION;
    (raw - deduction, raw, deduction)
}

/// Result sent to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkResult {
    pub finished: bool,
    pub passed: bool,
    pub score: i64,
    pub raw: i64,
    pub deduction: i64,
    pub reason: String,
    pub errors: ErrorCounts,
    pub breakdown: ScoreTable,
    pub active_students: usize,
}

/// Builds the result from the board; `abort_reason` is set when the run was aborted.
pub fn summarize(
    board: &ScoreBoard,
    active_students: usize,
    finished: bool,
    abort_reason: Option<&str>,
) -> BenchmarkResult {
    let errors = board.errors();
    let breakdown = board.table();
    let (total, raw, deduction) = calc(&breakdown, errors.deduction, errors.timeout);

    let mut passed = true;
    let mut reason = "passed".to_string();
    if errors.critical > 0 {
        passed = false;
        reason = "a critical error occurred".to_string();
    } else if errors.deduction > board.fail_threshold() {
        passed = false;
        reason = format!("more than {} errors occurred", board.fail_threshold());
    }
    let total = if total <= 0 {
        if passed {
            passed = false;
            reason = "score was zero or below".to_string();
        }
        0
    } else {
        total
    };
    if passed {
        if let Some(r) = abort_reason {
            passed = false;
            reason = r.to_string();
        }
    }

    let multiplier = (active_students / 10) as i64;
    BenchmarkResult {
        finished,
        passed,
        score: total * multiplier,
        raw,
        deduction,
        reason,
        errors,
        breakdown,
        active_students,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    #[test]
    fn raw_uses_coefficients() {
        let table = ScoreTable::from_fn(|t| match t {
            ScoreTag::RegisterCourses => 3,
            ScoreTag::SubmitAssignment => 2,
            ScoreTag::GetGrades => 25,
            ScoreTag::GetAnnouncementList => 9,
            _ => 1000,
        });
        let (total, raw, deduction) = calc(&table, 0, 0);
        assert_eq!(raw, 30 + 10 + 2);
        assert_eq!(deduction, 0);
        assert_eq!(total, raw);
    }

    #[test]
    fn deduction_counts_errors_and_timeout_blocks() {
        let table = ScoreTable::default();
        assert_eq!(calc(&table, 2, 199), (-200, 0, 200));
        assert_eq!(calc(&table, 0, 200).2, 200);
    }

    #[test]
    fn empty_run_fails_with_zero_score() {
        let board = ScoreBoard::new(100);
        let r = summarize(&board, 50, true, None);
        assert!(!r.passed);
        assert_eq!(r.score, 0);
        assert_eq!(r.reason, "score was zero or below");
    }

    #[test]
    fn score_scales_with_active_students() {
        let board = ScoreBoard::new(100);
        board.add_n(ScoreTag::RegisterCourses, 10);
        board.record_error(&LoadError::http("x"));
        let r = summarize(&board, 57, true, None);
        assert!(r.passed);
        assert_eq!((r.raw, r.deduction), (100, 50));
        assert_eq!(r.score, 50 * 5);
    }

    #[test]
    fn critical_error_fails_first() {
        let board = ScoreBoard::new(100);
        board.add_n(ScoreTag::RegisterCourses, 10);
        board.record_error(&LoadError::critical("x"));
        let r = summarize(&board, 50, false, Some("aborted"));
        assert!(!r.passed);
        assert_eq!(r.reason, "a critical error occurred");
    }
}
