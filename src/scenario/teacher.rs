//! # Teacher loop: one course from registration to closure.
//!
//! ```text
//! wait_start (full, or course-full wait after the first registration, or load end)
//!   └─► leave the waiting list, status in-progress
//!        └─► for each class:
//!              add class ─► send announcement ─► broadcast to students
//!              wait (≤ read wait) for students to read it
//!              students submit assignments
//!              download submissions (zip holds every upload) ─► post scores
//!        └─► status closed ─► record results ─► release timeslots
//!        └─► publish one new course (same timeslot) and one new student
//! ```
//!
//! Registered students get their timeslot back whenever this worker ends, closed
//! or not.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::LoadContext;
use crate::{
    api::endpoints::{self, ScoreEntry},
    error::LoadError,
    events::{Event, EventKind},
    model::{Class, Completion, Course, CourseResult, CourseStatus, Student, Submission},
    score::ScoreTag,
    tasks::Task,
};

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_END_OF_DIRECTORY: &[u8] = b"PK\x05\x06";

/// Number of local file headers in `archive`, or `None` when it is not a zip file.
fn zip_entries(archive: &[u8]) -> Option<usize> {
    if !archive.starts_with(ZIP_LOCAL_HEADER) && !archive.starts_with(ZIP_END_OF_DIRECTORY) {
        return None;
    }
    Some(
        archive
            .windows(ZIP_LOCAL_HEADER.len())
            .filter(|w| *w == ZIP_LOCAL_HEADER)
            .count(),
    )
}

/// Drives one course.
pub struct TeacherWorker {
    name: String,
    ctx: Arc<LoadContext>,
    course: Arc<Course>,
}

/// How the course ended.
enum Outcome {
    Closed,
    /// Stopped before closing (load window over).
    Unfinished,
}

impl TeacherWorker {
    pub fn new(ctx: Arc<LoadContext>, course: Arc<Course>) -> Self {
        Self {
            name: format!("teacher/{}", course.id),
            ctx,
            course,
        }
    }

    async fn teach(&self, token: &CancellationToken) -> Result<Outcome, LoadError> {
        let ctx = &self.ctx;
        let course = &self.course;

        let completion = tokio::select! {
            c = course.wait_start(token, ctx.cfg.course_full_wait) => c,
            _ = tokio::time::sleep_until(ctx.load_end()) => return Ok(Outcome::Unfinished),
        };
        let started = match completion {
            Completion::Cancelled => return Err(LoadError::Canceled),
            Completion::Full => course.set_status(CourseStatus::InProgress),
            Completion::Waited => course.start_early(),
        };
        ctx.registry.remove_from_waiting(course);
        self.check(started)?;
        if ctx.is_no_request_time(token) {
            return Ok(Outcome::Unfinished);
        }

        let teacher = course.teacher();
        let res = ctx
            .retrying(token, &self.name, || {
                endpoints::set_course_status(teacher.agent(), &course.id, CourseStatus::InProgress)
            })
            .await;
        self.check(res)?;
        ctx.bus().publish(
            Event::new(EventKind::CourseStarted)
                .with_course(course.id.as_str())
                .with_count(course.snapshot().registered),
        );

        for part in 1..=ctx.cfg.classes_per_course {
            if ctx.is_no_request_time(token) {
                return Ok(Outcome::Unfinished);
            }
            let part = u8::try_from(part).unwrap_or(u8::MAX);
            self.hold_class(token, part).await?;
        }

        if ctx.is_no_request_time(token) {
            return Ok(Outcome::Unfinished);
        }
        let res = ctx
            .retrying(token, &self.name, || {
                endpoints::set_course_status(teacher.agent(), &course.id, CourseStatus::Closed)
            })
            .await;
        self.check(res)?;
        self.check(course.set_status(CourseStatus::Closed))?;
        ctx.bus()
            .publish(Event::new(EventKind::CourseClosed).with_course(course.id.as_str()));

        // result first: a grades check in between must still see the course
        for student in course.students() {
            student.record_result(CourseResult {
                course_id: course.id.clone(),
                course_code: course.param.code.clone(),
                credit: course.credit(),
                total_score: course.total_score_of(student.code()),
            });
            student.finish_enrollment(&course.id);
        }
        Ok(Outcome::Closed)
    }

    async fn hold_class(&self, token: &CancellationToken, part: u8) -> Result<(), LoadError> {
        let ctx = &self.ctx;
        let course = &self.course;
        let teacher = course.teacher();

        let param = ctx.generator.class_param(course, part);
        let class_id = ctx
            .retrying(token, &self.name, || {
                endpoints::add_class(teacher.agent(), &course.id, &param)
            })
            .await;
        let class = Arc::new(Class::new(self.check(class_id)?, &param));
        course.add_class(Arc::clone(&class));
        ctx.score(ScoreTag::AddClass);

        let announcement = Arc::new(ctx.generator.announcement(course, &param));
        let sent = ctx
            .retrying(token, &self.name, || {
                endpoints::send_announcement(teacher.agent(), &announcement)
            })
            .await;
        self.check(sent)?;
        course.broadcast_announcement(&announcement);

        let students = course.students();
        let wait = ctx.cfg.read_announcement_wait;
        let read = join_all(
            students
                .iter()
                .map(|s| s.wait_read(&announcement.id, token, wait)),
        )
        .await;
        debug!(
            course = %course.id,
            part,
            read = read.iter().filter(|r| **r).count(),
            students = students.len(),
            "class announcement read"
        );
        if ctx.is_no_request_time(token) {
            return Ok(());
        }

        let uploads = join_all(students.iter().map(|s| self.submit(s, &class))).await;
        for res in uploads {
            if let Err(e) = res {
                ctx.report(&e);
            }
        }
        if ctx.is_no_request_time(token) {
            return Ok(());
        }

        let export = ctx
            .retrying(token, &self.name, || {
                endpoints::download_submissions(teacher.agent(), &course.id, &class.id)
            })
            .await;
        let archive = self.check(export)?;
        let submitted = class.submission_count();
        match zip_entries(&archive) {
            None => ctx.report(&LoadError::application(format!(
                "submission archive of class {} is not a zip file",
                class.id
            ))),
            Some(files) if files < submitted => ctx.report(&LoadError::application(format!(
                "submission archive of class {} holds {files} files, expected {submitted}",
                class.id
            ))),
            Some(_) => {}
        }

        let scores: Vec<ScoreEntry> = class
            .submitters()
            .into_iter()
            .map(|code| ScoreEntry {
                user_code: code,
                score: ctx.generator.score(),
            })
            .collect();
        let posted = ctx
            .retrying(token, &self.name, || {
                endpoints::post_scores(teacher.agent(), &course.id, &class.id, &scores)
            })
            .await;
        self.check(posted)?;
        for entry in &scores {
            class.set_score(&entry.user_code, entry.score);
        }
        ctx.score(ScoreTag::RegisterScores);
        Ok(())
    }

    /// A student lists the classes and submits the assignment of `class`.
    async fn submit(&self, student: &Student, class: &Class) -> Result<(), LoadError> {
        let ctx = &self.ctx;
        let course_id = &self.course.id;

        let classes = endpoints::get_classes(student.agent(), course_id).await?;
        if !classes.iter().any(|c| c.id == class.id) {
            return Err(LoadError::application(format!(
                "class {} missing from the class list of course {course_id}",
                class.id
            )));
        }

        let (file_name, data) = ctx.generator.submission(student.code(), class.part);
        let size = data.len();
        endpoints::submit_assignment(student.agent(), course_id, &class.id, &file_name, data)
            .await?;
        class.add_submission(student.code(), Submission::new(file_name, size));
        ctx.score(ScoreTag::SubmitAssignment);
        Ok(())
    }

    /// Reports a failure (cancellation excluded) and passes it on.
    fn check<T>(&self, res: Result<T, LoadError>) -> Result<T, LoadError> {
        if let Err(e) = &res {
            if !e.is_retryable() {
                self.ctx.report(e);
            }
        }
        res
    }

    /// Gives every registered student their timeslot back.
    fn release_students(&self) {
        for student in self.course.students() {
            student.release_slot(self.course.slot());
        }
    }
}

#[async_trait]
impl Task for TeacherWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: CancellationToken) -> Result<(), LoadError> {
        let res = self.teach(&token).await;
        self.release_students();

        match res {
            Ok(Outcome::Closed) => {
                let ctx = &self.ctx;
                if let Err(e) = ctx.add_course(&token, self.course.slot()).await {
                    ctx.report(&e);
                }
                if let Err(e) = ctx.activate_student(&token).await {
                    ctx.report(&e);
                }
                Ok(())
            }
            Ok(Outcome::Unfinished) => Ok(()),
            // the retry window closed; already reported
            Err(LoadError::Timeout { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_files_of_a_zip_archive() {
        let mut archive = Vec::new();
        for name in ["S1-1.pdf", "S2-1.pdf"] {
            archive.extend_from_slice(ZIP_LOCAL_HEADER);
            archive.extend_from_slice(name.as_bytes());
        }
        archive.extend_from_slice(ZIP_END_OF_DIRECTORY);
        assert_eq!(zip_entries(&archive), Some(2));
        assert_eq!(zip_entries(b"PK\x05\x06\0\0"), Some(0));
    }

    #[test]
    fn rejects_what_is_not_a_zip_archive() {
        assert_eq!(zip_entries(b""), None);
        assert_eq!(zip_entries(b"%PDF-1.4"), None);
    }
}
