//! Adding load: new courses, new students and the initial batch of both.

use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::LoadContext;
use crate::{
    api::endpoints,
    error::LoadError,
    events::{Event, EventKind},
    model::{Course, DAYS, PERIODS, Student, Timeslot},
    score::ScoreTag,
};

const SLOTS: usize = DAYS * PERIODS;

impl LoadContext {
    /// Creates a course in `slot` on the target and publishes it.
    ///
    /// A random teacher logs in (once per teacher), posts the course, and the course
    /// joins the registry and the waiting list before the course topic fires.
    pub async fn add_course(
        &self,
        ctx: &CancellationToken,
        slot: Timeslot,
    ) -> Result<Arc<Course>, LoadError> {
        if self.is_no_request_time(ctx) {
            return Err(LoadError::Canceled);
        }
        let teacher = self.users.random_teacher();
        teacher
            .login_once(|| endpoints::login(teacher.agent(), &teacher.account))
            .await?;

        let param = self.generator.course_param(slot, &teacher.account.name);
        let id = endpoints::add_course(teacher.agent(), &param).await?;
        self.score(ScoreTag::AddCourse);

        let course = Arc::new(Course::new(id, param, teacher, self.cfg.seat_cap));
        self.registry.add(Arc::clone(&course));
        self.capacity
            .inc_by(slot, i32::try_from(self.cfg.seat_cap).unwrap_or(i32::MAX));

        self.bus()
            .publish(Event::new(EventKind::CourseAdded).with_course(course.id.as_str()));
        self.topics.courses.publish(&course);
        Ok(course)
    }

    /// Logs a new student in and publishes it.
    pub async fn activate_student(&self, ctx: &CancellationToken) -> Result<Arc<Student>, LoadError> {
        if self.is_no_request_time(ctx) {
            return Err(LoadError::Canceled);
        }
        let student = self.users.new_student()?;
        endpoints::login(student.agent(), &student.account).await?;
        self.add_active_student(&student);

        self.bus()
            .publish(Event::new(EventKind::StudentActivated).with_student(student.code()));
        self.topics.students.publish(&student);
        Ok(student)
    }

    /// Adds the initial courses, spread over shuffled timeslots, and the initial
    /// students, all concurrently.
    ///
    /// Failures are reported. Ending up with no course or no student is critical.
    pub async fn initial_load(&self, ctx: &CancellationToken) {
        let mut order: Vec<usize> = (0..self.cfg.initial_courses).collect();
        order.shuffle(&mut rand::rng());

        let courses = order.into_iter().filter_map(|i| {
            let ts = i % SLOTS;
            Timeslot::new((ts / PERIODS) as u8, (ts % PERIODS) as u8)
        });
        let add_courses = join_all(courses.map(|slot| self.add_course(ctx, slot)));
        let add_students =
            join_all((0..self.cfg.initial_students).map(|_| self.activate_student(ctx)));
        let (courses, students) = tokio::join!(add_courses, add_students);

        for err in courses
            .iter()
            .filter_map(|r| r.as_ref().err())
            .chain(students.iter().filter_map(|r| r.as_ref().err()))
        {
            self.report(err);
        }

        let added = self.registry.count();
        let active = self.active_students();
        info!(courses = added, students = active, "initial load added");
        if added == 0 {
            self.report(&LoadError::critical("no course could be added"));
        } else if active == 0 {
            self.report(&LoadError::critical("no student could log in"));
        }
    }
}
