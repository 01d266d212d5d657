//! Classes held by a course and the assignments submitted to them.

use std::collections::HashMap;
use std::sync::Mutex;

/// Parameters of a class before it is created on the target.
#[derive(Debug, Clone)]
pub struct ClassParam {
    pub title: String,
    pub description: String,
    /// 1-based position within the course.
    pub part: u8,
}

/// One submitted assignment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub file_name: String,
    pub size: usize,
    /// Filled when the teacher posts scores.
    pub score: Option<u32>,
}

impl Submission {
    pub fn new(file_name: impl Into<String>, size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            size,
            score: None,
        }
    }
}

/// A class of a course with its per-student submission store.
#[derive(Debug)]
pub struct Class {
    pub id: String,
    pub part: u8,
    pub title: String,
    submissions: Mutex<HashMap<String, Submission>>,
}

impl Class {
    pub fn new(id: impl Into<String>, param: &ClassParam) -> Self {
        Self {
            id: id.into(),
            part: param.part,
            title: param.title.clone(),
            submissions: Mutex::new(HashMap::new()),
        }
    }

    /// Records (or replaces) the submission of `student`.
    pub fn add_submission(&self, student: &str, submission: Submission) {
        self.lock().insert(student.to_string(), submission);
    }

    pub fn submission_of(&self, student: &str) -> Option<Submission> {
        self.lock().get(student).cloned()
    }

    /// Sets the score of an existing submission; returns `false` if `student` submitted nothing.
    pub fn set_score(&self, student: &str, score: u32) -> bool {
        match self.lock().get_mut(student) {
            Some(sub) => {
                sub.score = Some(score);
                true
            }
            None => false,
        }
    }

    /// Codes of students that submitted, sorted.
    pub fn submitters(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.lock().keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn submission_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Submission>> {
        self.submissions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_apply_only_to_submitters() {
        let class = Class::new(
            "cl-1",
            &ClassParam {
                title: "part 1".into(),
                description: String::new(),
                part: 1,
            },
        );
        class.add_submission("S2", Submission::new("S2-1.pdf", 128));
        class.add_submission("S1", Submission::new("S1-1.pdf", 64));

        assert!(class.set_score("S1", 80));
        assert!(!class.set_score("S3", 80));
        assert_eq!(class.submission_of("S1").unwrap().score, Some(80));
        assert_eq!(class.submitters(), vec!["S1".to_string(), "S2".to_string()]);
    }
}
