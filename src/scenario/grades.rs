//! What a student's `GET /api/users/me/grades` must show.
//!
//! The expectation is captured before the request. Courses still running are only
//! checked for presence. Closed courses must also carry the total score the teacher
//! posted. The summary (credits, GPA) is only compared when nothing can close in the
//! meantime, i.e. once the load is over.

use std::collections::HashMap;

use crate::{api::endpoints::Grades, error::LoadError, model::Student};

const GPA_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub(super) struct GradeExpectation {
    /// course code -> total score, known once the course closed
    courses: HashMap<String, Option<u32>>,
    credits: u32,
    gpa: f64,
}

impl GradeExpectation {
    pub(super) fn capture(student: &Student) -> Self {
        // enrollments first: a closing course gets its result before it leaves them
        let mut courses: HashMap<String, Option<u32>> = student
            .enrollments()
            .into_iter()
            .map(|e| (e.course_code, None))
            .collect();
        for r in student.results() {
            courses.insert(r.course_code, Some(r.total_score));
        }
        Self {
            courses,
            credits: student.total_credit(),
            gpa: student.gpa(),
        }
    }

    /// Checks `grades` of `student`; `with_summary` also compares credits and GPA.
    pub(super) fn verify(
        &self,
        student: &str,
        grades: &Grades,
        with_summary: bool,
    ) -> Result<(), LoadError> {
        if grades.courses.len() != self.courses.len() {
            return Err(LoadError::application(format!(
                "grades of {student} list {} courses, expected {}",
                grades.courses.len(),
                self.courses.len()
            )));
        }
        for g in &grades.courses {
            match self.courses.get(&g.code) {
                None => {
                    return Err(LoadError::application(format!(
                        "grades of {student} contain unknown course {}",
                        g.code
                    )));
                }
                Some(Some(total)) if g.total_score != i64::from(*total) => {
                    return Err(LoadError::application(format!(
                        "grades of {student}: course {} totals {}, expected {total}",
                        g.code, g.total_score
                    )));
                }
                Some(_) => {}
            }
        }

        if with_summary {
            let summary = &grades.summary;
            if summary.credits != self.credits {
                return Err(LoadError::application(format!(
                    "grades of {student}: {} credits, expected {}",
                    summary.credits, self.credits
                )));
            }
            if (summary.gpa - self.gpa).abs() > GPA_TOLERANCE {
                return Err(LoadError::application(format!(
                    "grades of {student}: gpa {}, expected {}",
                    summary.gpa, self.gpa
                )));
            }
        }
        Ok(())
    }
}
