//! # Random data for the load: courses, classes, announcements, submissions, scores.
//!
//! A [`Generator`] is owned by one run. Course codes (`M0001`, `L0001`, ...) and
//! announcement timestamps are drawn from per-generator counters, so codes never repeat
//! and `created_at` strictly increases in generation order.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::api::endpoints::SearchParam;
use crate::model::{
    Announcement, ClassParam, Course, CourseKind, CourseParam, DAYS, PERIODS, Timeslot,
};

const MAJOR_PROBABILITY: f64 = 0.7;

const MAJOR_PREFIX: &[&str] = &["Advanced", "Quantum", "Applied", "Functional", "Modern"];
const MAJOR_MID1: &[&str] = &[
    "Computing", "Computer", "Programming", "Algorithm", "Digital", "Management",
    "Language", "Communication", "Statistics", "Chair", "Life", "Bio",
];
const MAJOR_MID2: &[&str] = &[
    "Networks", "Modeling", "Mechatronics", "Design", "Systems", "Science", "Mechanics",
    "Engineering", "Chemistry", "Analysis", "Literacy",
];
const MAJOR_SUFFIX: &[&str] = &[
    "Basics", "Practice", "Exercises", "Introduction", "Overview", "Topics", "Theory",
    "I", "II", "A", "B", "C",
];
const LIBERAL_MID1: &[&str] = &[
    "Economics", "Statistics", "Chair", "Law", "Philosophy", "Religion", "Politics",
    "Culture", "Sociology", "Drawing", "Art", "Literature", "Language",
];
const LIBERAL_MID2: &[&str] = &[
    "Overview", "Basics", "History", "Modeling", "Design", "Systems", "Science",
];
const LIBERAL_SUFFIX: &[&str] = &["Introduction", "I", "II", "A", "B", "C"];
const COURSE_DESCRIPTION1: &[&str] = &[
    "Submitting the assignment counts as attendance.",
    "Attendance is taken in every class.",
    "Attendance is taken in randomly chosen classes.",
];
const COURSE_DESCRIPTION2: &[&str] = &[
    "Grades are based on submitted assignments.",
    "Grades are based on attendance and submitted assignments.",
];
const CLASS_ROOMS: &[&str] = &["H101", "S323", "S423", "S512", "S513", "W933", "M011"];
const CLASS_TASKS: &[&str] = &[
    "Summarise the class in at most 300 words.",
    "Write 500 to 1000 words on what you researched about today's topic.",
    "Submit your answers to the quiz given in class.",
];
const POPULAR_TEACHERS: &[&str] = &[
    "teacher 1", "teacher 2", "teacher 3", "teacher 4", "teacher 5", "teacher 6",
];

const SCORE_MEAN: f64 = 60.0;
const SCORE_STDDEV: f64 = 12.0;
const SCORE_MAX: i64 = 100;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Per-run source of generated load data.
#[derive(Debug)]
pub struct Generator {
    time_base: i64,
    time_count: AtomicI64,
    major_code: AtomicU32,
    liberal_code: AtomicU32,
}

impl Default for Generator {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self::with_time_base(now)
    }
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose timestamps start right after `base` (unix seconds).
    pub fn with_time_base(base: i64) -> Self {
        Self {
            time_base: base,
            time_count: AtomicI64::new(0),
            major_code: AtomicU32::new(0),
            liberal_code: AtomicU32::new(0),
        }
    }

    /// Next timestamp; strictly increasing across calls.
    pub fn next_time(&self) -> i64 {
        self.time_base + self.time_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Parameters for a new course taught by `teacher_name` in `slot`.
    pub fn course_param(&self, slot: Timeslot, teacher_name: &str) -> CourseParam {
        let mut rng = rand::rng();
        let major = rng.random_bool(MAJOR_PROBABILITY);

        let mut name = Vec::with_capacity(4);
        let (kind, code, mid1, mid2) = if major {
            if rng.random_bool(0.5) {
                name.push(pick(&mut rng, MAJOR_PREFIX));
            }
            let code = self.major_code.fetch_add(1, Ordering::Relaxed) + 1;
            (
                CourseKind::Major,
                format!("M{code:04}"),
                pick(&mut rng, MAJOR_MID1),
                pick(&mut rng, MAJOR_MID2),
            )
        } else {
            let code = self.liberal_code.fetch_add(1, Ordering::Relaxed) + 1;
            (
                CourseKind::Liberal,
                format!("L{code:04}"),
                pick(&mut rng, LIBERAL_MID1),
                pick(&mut rng, LIBERAL_MID2),
            )
        };
        name.push(mid1);
        name.push(mid2);
        name.push(pick(
            &mut rng,
            if major { MAJOR_SUFFIX } else { LIBERAL_SUFFIX },
        ));

        CourseParam {
            code,
            kind,
            name: name.join(" "),
            description: format!(
                "{} {}",
                pick(&mut rng, COURSE_DESCRIPTION1),
                pick(&mut rng, COURSE_DESCRIPTION2)
            ),
            credit: rng.random_range(1..=3),
            teacher: teacher_name.to_string(),
            slot,
            keywords: format!("{mid1} {mid2}"),
        }
    }

    /// Parameters for class number `part` (1-based) of `course`.
    pub fn class_param(&self, course: &Course, part: u8) -> ClassParam {
        let mut rng = rand::rng();
        let name = &course.param.name;
        let title = match rng.random_range(0..3) {
            0 => format!("{name} class {part}"),
            1 => format!("Class {part}"),
            _ => "New class".to_string(),
        };

        let mut description = String::new();
        match rng.random_range(0..4) {
            0 => description.push_str(&format!("Class {part} of {name}. ")),
            1 => description.push_str(&format!("A class of {name}. ")),
            _ => {}
        }
        match rng.random_range(0..5) {
            0 => description.push_str(&format!(
                "Today's meeting id is {:03}-{:03}-{:04}. ",
                rng.random_range(0..1000),
                rng.random_range(0..1000),
                rng.random_range(0..10000)
            )),
            1 => description.push_str(&format!(
                "Today's room is {}. ",
                pick(&mut rng, CLASS_ROOMS)
            )),
            _ => {}
        }
        description.push_str(pick(&mut rng, CLASS_TASKS));

        ClassParam {
            title,
            description,
            part,
        }
    }

    /// Announcement that `param`'s class was added to `course`.
    pub fn announcement(&self, course: &Course, param: &ClassParam) -> Announcement {
        let created_at = self.next_time();
        Announcement {
            id: ulid_like(created_at.saturating_mul(1000) as u64),
            course_id: course.id.clone(),
            course_name: course.param.name.clone(),
            title: format!("Class added: {}", param.title),
            message: format!(
                "A new class was added: {}\n{}",
                param.title, param.description
            ),
            created_at,
        }
    }

    /// Assignment file for `student_code` in class `part`: `(file name, bytes)`.
    pub fn submission(&self, student_code: &str, part: u8) -> (String, Vec<u8>) {
        let mut rng = rand::rng();
        let body_len = rng.random_range(64..512);
        let mut data = b"%PDF-1.7\n".to_vec();
        data.extend(format!("% {student_code} part {part}\n").bytes());
        data.extend((0..body_len).map(|_| rng.random_range(b'a'..=b'z')));
        data.extend_from_slice(b"\n%%EOF\n");
        (format!("{student_code}-{part}.pdf"), data)
    }

    /// One search filter: a timeslot half the time, otherwise type, teacher or keyword.
    pub fn search_param(&self) -> SearchParam {
        let mut rng = rand::rng();
        let mut param = SearchParam::default();
        if rng.random_bool(0.5) {
            let slot = Timeslot::new(
                rng.random_range(0..DAYS as u8),
                rng.random_range(0..PERIODS as u8),
            );
            if let Some(slot) = slot {
                param.day_of_week = Some(slot.day_name());
                param.period = Some(slot.period + 1);
            }
        } else if rng.random_bool(0.5) {
            let kind = if rng.random_bool(0.5) {
                CourseKind::Liberal
            } else {
                CourseKind::Major
            };
            param.kind = Some(kind.as_str());
        } else if rng.random_bool(0.5) {
            param.teacher = Some(pick(&mut rng, POPULAR_TEACHERS).to_string());
        } else {
            let pool = if rng.random_bool(0.5) {
                MAJOR_MID2
            } else {
                LIBERAL_MID1
            };
            param.keywords = vec![pick(&mut rng, pool).to_string()];
        }
        param
    }

    /// Score in `0..=100`, roughly normal around 60.
    pub fn score(&self) -> u32 {
        let mut rng = rand::rng();
        // Box-Muller
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        let mut score = (z * SCORE_STDDEV + SCORE_MEAN).round() as i64;
        if score > SCORE_MAX {
            score = 2 * SCORE_MEAN as i64 - score;
        }
        score.clamp(0, SCORE_MAX) as u32
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

/// 26-char Crockford base32 id: 48-bit millisecond timestamp then 80 random bits.
fn ulid_like(millis: u64) -> String {
    let mut rng = rand::rng();
    let random: u128 = rng.random::<u128>() & ((1u128 << 80) - 1);
    let value = (u128::from(millis & ((1u64 << 48) - 1)) << 80) | random;
    (0..26)
        .rev()
        .map(|i| CROCKFORD[((value >> (i * 5)) & 0x1f) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::course;

    #[test]
    fn course_codes_are_unique_and_prefixed() {
        let g = Generator::with_time_base(0);
        let slot = Timeslot::new(1, 2).unwrap();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..200 {
            let p = g.course_param(slot, "teacher");
            assert!(p.code.starts_with('M') || p.code.starts_with('L'));
            assert_eq!(p.code.len(), 5);
            assert!((1..=3).contains(&p.credit));
            assert_eq!(p.slot, slot);
            assert!(codes.insert(p.code));
        }
    }

    #[test]
    fn announcements_have_increasing_timestamps_and_ids() {
        let g = Generator::with_time_base(1_600_000_000);
        let c = course("c1", Timeslot::new(0, 0).unwrap(), 5);
        let param = g.class_param(&c, 1);
        let a = g.announcement(&c, &param);
        let b = g.announcement(&c, &param);
        assert_eq!(a.created_at, 1_600_000_001);
        assert!(b.created_at > a.created_at);
        assert_eq!(a.id.len(), 26);
        assert!(b.id[..10] > a.id[..10]);
        assert_eq!(a.course_id, "c1");
    }

    #[test]
    fn scores_stay_in_range() {
        let g = Generator::new();
        for _ in 0..1000 {
            assert!(g.score() <= 100);
        }
    }

    #[test]
    fn search_param_sets_one_filter_group() {
        let g = Generator::new();
        for _ in 0..100 {
            let q = g.search_param().to_query();
            assert!(!q.is_empty());
        }
    }

    #[test]
    fn submission_looks_like_pdf() {
        let (name, data) = Generator::new().submission("S00001", 3);
        assert_eq!(name, "S00001-3.pdf");
        assert!(data.starts_with(b"%PDF-"));
        assert!(data.ends_with(b"%%EOF\n"));
    }
}
