//! # Benchmark phases.
//!
//! ```text
//! run()
//!  ├─ prepare   teacher login, course list probe          (failure → critical)
//!  ├─ NO_LOAD?  stop here
//!  ├─ load      install work graph, reporter loop, initial courses + students,
//!  │            supervisor.drive(load window + retry window)
//!  ├─ validate  seats, reservations and timetables         (violation → critical)
//!  │            grades of every 10th student with a closed course
//!  └─ report    final BenchmarkResult (finished = true)
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{LoadContext, grades::GradeExpectation, install};
use crate::{
    api::{Connector, endpoints},
    config::Config,
    core::{StopCause, Supervisor, SupervisorBuilder},
    error::{LoadError, RuntimeError},
    model::{Timeslot, UserPool},
    score::{BenchmarkResult, LogReporter, Reporter, summarize},
    subscribers::{LogWriter, Subscribe},
    tasks::{TaskFn, TaskRef},
};

/// Regular teachers in the user pool (the sample teacher comes on top).
const TEACHER_COUNT: usize = 50;

/// One in this many finished students gets the final grade check.
const GRADE_SAMPLE_EVERY: usize = 10;
const GRADE_CHECKS_IN_FLIGHT: usize = 16;

/// One benchmark run against one target.
pub struct Benchmark {
    cfg: Config,
    connector: Arc<dyn Connector>,
    reporter: Arc<dyn Reporter>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Benchmark {
    /// Benchmark that reports to the log and logs runtime events.
    pub fn new(cfg: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            cfg,
            connector,
            reporter: Arc::new(LogReporter),
            subscribers: vec![Arc::new(LogWriter::new())],
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the runtime event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs every phase and returns the final result.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn run(&self) -> Result<BenchmarkResult, RuntimeError> {
        let sup = SupervisorBuilder::new(self.cfg.clone())
            .with_subscribers(self.subscribers.clone())
            .build();
        let users = UserPool::new(Arc::clone(&self.connector), TEACHER_COUNT)
            .map_err(|e| RuntimeError::Client(e.as_message()))?;
        let ctx = Arc::new(LoadContext::new(
            self.cfg.clone(),
            users,
            sup.bus().clone(),
            sup.token().clone(),
        ));

        info!(target = %self.cfg.target, "prepare");
        let prepared = match prepare(&ctx).await {
            Ok(()) => true,
            Err(e) => {
                ctx.report(&LoadError::critical(format!("prepare failed: {}", e.as_message())));
                false
            }
        };

        if prepared && !self.cfg.no_load {
            self.load(&sup, &ctx).await;
            validate(&ctx);
            validate_grades(&ctx).await;
        } else if let Err(e) = sup.shutdown("load skipped").await {
            warn!(error = %e, "shutdown");
        }
        ctx.topics.close();

        let mut result = summarize(&ctx.board, ctx.active_students(), true, ctx.abort_reason());
        if self.cfg.no_load && prepared {
            result.passed = ctx.board.errors().critical == 0;
            result.reason = "load skipped".to_string();
        }
        if let Err(e) = self.reporter.report(&result).await {
            error!(error = %e, "final report");
        }
        Ok(result)
    }

    async fn load(&self, sup: &Arc<Supervisor>, ctx: &Arc<LoadContext>) {
        info!(window = ?self.cfg.load_window, "load");
        install(sup, ctx);
        let load_end = ctx.begin_load();
        sup.spawn(reporter_loop(Arc::clone(ctx), Arc::clone(&self.reporter)));

        ctx.initial_load(sup.token()).await;

        let window = load_end.saturating_duration_since(Instant::now()) + self.cfg.retry_window;
        let (cause, res) = sup.drive(window).await;
        if cause == StopCause::Signal {
            ctx.abort("terminated by signal");
        }
        info!(cause = cause.as_str(), "load finished");
        if let Err(e) = res {
            error!(error = %e, "workers did not stop in time");
        }
    }
}

/// Teacher login and a course list probe.
async fn prepare(ctx: &LoadContext) -> Result<(), LoadError> {
    let teacher = ctx.users.random_teacher();
    teacher
        .login_once(|| endpoints::login(teacher.agent(), &teacher.account))
        .await?;
    endpoints::search_courses(teacher.agent(), &Default::default(), None).await?;
    Ok(())
}

/// Intermediate reports every `report_interval` until the run is cancelled.
fn reporter_loop(ctx: Arc<LoadContext>, reporter: Arc<dyn Reporter>) -> TaskRef {
    TaskFn::arc("reporter", move |token: CancellationToken| {
        let ctx = Arc::clone(&ctx);
        let reporter = Arc::clone(&reporter);
        async move {
            let every = ctx.cfg.report_interval.max(Duration::from_millis(10));
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = token.cancelled() => return Err(LoadError::Canceled),
                    _ = ticker.tick() => {}
                }
                let result =
                    summarize(&ctx.board, ctx.active_students(), false, ctx.abort_reason());
                if let Err(e) = reporter.report(&result).await {
                    warn!(error = %e, "intermediate report");
                }
            }
        }
    })
}

/// End-of-run consistency checks; every violation is critical.
fn validate(ctx: &LoadContext) {
    let courses = ctx.registry.snapshot_for_validation();
    for course in courses.values() {
        let seats = course.snapshot();
        if seats.reservations != 0 {
            ctx.report(&LoadError::critical(format!(
                "course {} still holds {} reservations",
                course.id, seats.reservations
            )));
        }
        if seats.registered > course.seat_cap() {
            ctx.report(&LoadError::critical(format!(
                "course {} has {} students over a cap of {}",
                course.id,
                seats.registered,
                course.seat_cap()
            )));
        }
    }

    for student in ctx.students() {
        for (slot, course_id) in student.timetable() {
            let held = courses
                .get(&course_id)
                .is_some_and(|c| c.slot() == slot && c.is_registered(student.code()));
            if !held {
                ctx.report(&LoadError::critical(timetable_violation(
                    student.code(),
                    slot,
                    &course_id,
                )));
            }
        }
    }
}

/// Final grades of a sample of students, summary included; mismatches are critical.
async fn validate_grades(ctx: &LoadContext) {
    let mut finished: Vec<_> = ctx
        .students()
        .into_iter()
        .filter(|s| !s.results().is_empty())
        .collect();
    finished.sort_by(|a, b| a.code().cmp(b.code()));

    let checks = finished
        .into_iter()
        .step_by(GRADE_SAMPLE_EVERY)
        .map(|student| async move {
            let expect = GradeExpectation::capture(&student);
            let grades = endpoints::get_grades(student.agent()).await?;
            expect.verify(student.code(), &grades, true)
        });
    let failures: Vec<LoadError> = stream::iter(checks)
        .buffer_unordered(GRADE_CHECKS_IN_FLIGHT)
        .filter_map(|res| async move { res.err() })
        .collect()
        .await;
    for e in failures {
        ctx.report(&LoadError::critical(format!(
            "grade validation failed: {}",
            e.as_message()
        )));
    }
}

fn timetable_violation(student: &str, slot: Timeslot, course_id: &str) -> String {
    format!("student {student} holds timeslot {slot} for course {course_id} without a registration")
}
