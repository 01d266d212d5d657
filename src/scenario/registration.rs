//! # Student registration loop.
//!
//! ```text
//! loop {
//!   at cap? ── wait for a released timeslot (≤ grade-retry wait, ≤ load end)
//!   GET grades (once the student has courses)
//!   GET /api/courses × searches_per_registration (following `next`)
//!   GET one course detail, GET registered courses
//!   pace ≥ 100ms since the iteration began
//!   matcher.reserve(budget) ──► PUT registrations (timeouts retried)
//!        ├─ ok      ──► commit batch (courses closed meanwhile free their timeslot)
//!        └─ failure ──► roll back batch, end the loop
//! }
//! ```
//!
//! A timed-out read is skipped; any other failed request ends this worker only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{LoadContext, grades::GradeExpectation};
use crate::{
    api::endpoints,
    error::LoadError,
    events::{Event, EventKind},
    model::{ReservedBatch, Student},
    score::ScoreTag,
    tasks::Task,
};

/// Minimum length of one registration iteration.
const REGISTRATION_PACE: Duration = Duration::from_millis(100);

/// Grades, search and registration for one student.
pub struct RegistrationWorker {
    name: String,
    ctx: Arc<LoadContext>,
    student: Arc<Student>,
}

impl RegistrationWorker {
    pub fn new(ctx: Arc<LoadContext>, student: Arc<Student>) -> Self {
        Self {
            name: format!("registration/{}", student.code()),
            ctx,
            student,
        }
    }

    /// One iteration. `Ok(false)` ends the loop quietly (load window over).
    async fn iterate(&self, token: &CancellationToken) -> Result<bool, LoadError> {
        let ctx = &self.ctx;
        let cfg = &ctx.cfg;
        let student = &self.student;
        let agent = student.agent();

        if student.registering_count() >= cfg.registration_cap {
            let deadline = (Instant::now() + cfg.grade_retry_wait).min(ctx.load_end());
            student
                .wait_slot_release(cfg.registration_cap, token, Some(deadline))
                .await;
        }
        let pace = Instant::now() + REGISTRATION_PACE;
        if ctx.is_no_request_time(token) {
            return Ok(false);
        }

        if !student.enrollments().is_empty() || !student.results().is_empty() {
            let expect = GradeExpectation::capture(student);
            if let Some(grades) = ctx.absorb_timeout(endpoints::get_grades(agent).await)? {
                // courses may close while the request is in flight; no summary check
                match expect.verify(student.code(), &grades, false) {
                    Ok(()) => ctx.score(ScoreTag::GetGrades),
                    Err(e) => ctx.report(&e),
                }
            }
        }
        if student.registering_count() >= cfg.registration_cap {
            sleep_until(token, pace).await;
            return Ok(true);
        }

        let mut target = None;
        let mut next: Option<String> = None;
        let mut param = ctx.generator.search_param();
        for _ in 0..cfg.searches_per_registration {
            if ctx.is_no_request_time(token) {
                return Ok(false);
            }
            let res = endpoints::search_courses(agent, &param, next.as_deref()).await;
            match ctx.absorb_timeout(res)? {
                Some((courses, links)) => {
                    ctx.score(ScoreTag::SearchCourses);
                    if let Some(first) = courses.first() {
                        target = Some(first.id.clone());
                    }
                    next = links.next;
                }
                None => next = None,
            }
            // later pages keep the same filters
            if next.is_none() {
                param = ctx.generator.search_param();
            }
        }

        if let Some(id) = target {
            if ctx.is_no_request_time(token) {
                return Ok(false);
            }
            if let Some(detail) = ctx.absorb_timeout(endpoints::get_course_detail(agent, &id).await)? {
                if let Some(known) = ctx.registry.get(&detail.id) {
                    if known.param.code != detail.code || known.credit() != detail.credit {
                        ctx.report(&LoadError::application(format!(
                            "course {} detail does not match what was registered",
                            detail.id
                        )));
                    }
                }
            }
        }

        if ctx.is_no_request_time(token) {
            return Ok(false);
        }
        if let Some(registered) = ctx.absorb_timeout(endpoints::get_registered_courses(agent).await)? {
            for c in &registered {
                let known = ctx
                    .registry
                    .get(&c.id)
                    .is_some_and(|course| course.is_registered(student.code()));
                if !known {
                    ctx.report(&LoadError::application(format!(
                        "course {} listed as registered for {} but never registered",
                        c.id,
                        student.code()
                    )));
                }
            }
        }

        sleep_until(token, pace).await;
        self.register(token).await
    }

    /// Reserves seats and registers them on the target.
    async fn register(&self, token: &CancellationToken) -> Result<bool, LoadError> {
        let ctx = &self.ctx;
        let student = &self.student;

        let budget = ctx
            .cfg
            .registration_cap
            .saturating_sub(student.registering_count());
        if budget == 0 {
            return Ok(true);
        }
        let batch = match ctx.matcher.reserve(student, budget) {
            Ok(batch) => batch,
            Err(e) => {
                ctx.report(&e);
                return Err(e);
            }
        };
        if batch.is_empty() {
            return Ok(true);
        }
        if ctx.is_no_request_time(token) {
            self.roll_back(batch, "load window over")?;
            return Ok(false);
        }

        let ids = batch.course_ids();
        let res = ctx
            .retrying(token, &self.name, || {
                endpoints::register_courses(student.agent(), &ids)
            })
            .await;

        match res {
            Ok(()) => {
                // a late success after the load window is not scored
                if Instant::now() < ctx.load_end() {
                    ctx.score(ScoreTag::RegisterCourses);
                }
                match batch.commit() {
                    Ok(settled) => {
                        for course in settled.filled {
                            ctx.bus().publish(
                                Event::new(EventKind::CourseFull)
                                    .with_course(course.id.as_str())
                                    .with_count(course.seat_cap()),
                            );
                        }
                        for course in settled.refused {
                            ctx.bus().publish(
                                Event::new(EventKind::ReservationRolledBack)
                                    .with_student(student.code())
                                    .with_course(course.id.as_str())
                                    .with_count(1)
                                    .with_reason("course closed before commit"),
                            );
                        }
                        Ok(true)
                    }
                    Err(e) => {
                        ctx.report(&e);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                self.roll_back(batch, &e.as_message())?;
                match e {
                    // timeouts were reported while retrying
                    LoadError::Timeout { .. } => Ok(false),
                    LoadError::Canceled => Err(e),
                    e => {
                        ctx.report(&e);
                        Err(e)
                    }
                }
            }
        }
    }

    fn roll_back(&self, batch: ReservedBatch, reason: &str) -> Result<(), LoadError> {
        let seats = batch.len();
        if let Err(e) = batch.rollback() {
            self.ctx.report(&e);
            return Err(e);
        }
        self.ctx.bus().publish(
            Event::new(EventKind::ReservationRolledBack)
                .with_student(self.student.code())
                .with_count(seats)
                .with_reason(reason),
        );
        Ok(())
    }
}

#[async_trait]
impl Task for RegistrationWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: CancellationToken) -> Result<(), LoadError> {
        loop {
            if token.is_cancelled() {
                return Err(LoadError::Canceled);
            }
            if !self.iterate(&token).await? {
                return Ok(());
            }
        }
    }
}

async fn sleep_until(token: &CancellationToken, deadline: Instant) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep_until(deadline) => {}
    }
}
