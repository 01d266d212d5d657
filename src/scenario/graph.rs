//! Topic subscribers that turn published students and courses into workers.

use std::sync::Arc;

use super::{AnnouncementWorker, LoadContext, RegistrationWorker, TeacherWorker};
use crate::{core::Supervisor, tasks::TaskRef};

/// Installs the three work-graph subscribers, in this order:
///
/// 1. student → [`RegistrationWorker`]
/// 2. student → [`AnnouncementWorker`]
/// 3. course  → [`TeacherWorker`]
///
/// The closures keep `ctx` alive until `ctx.topics` is closed.
pub fn install(sup: &Arc<Supervisor>, ctx: &Arc<LoadContext>) {
    let (s, c) = (Arc::clone(sup), Arc::clone(ctx));
    ctx.topics.students.subscribe("registration", move |student| {
        let task: TaskRef = Arc::new(RegistrationWorker::new(Arc::clone(&c), Arc::clone(student)));
        s.spawn(task);
    });

    let (s, c) = (Arc::clone(sup), Arc::clone(ctx));
    ctx.topics.students.subscribe("announcements", move |student| {
        let task: TaskRef = Arc::new(AnnouncementWorker::new(Arc::clone(&c), Arc::clone(student)));
        s.spawn(task);
    });

    let (s, c) = (Arc::clone(sup), Arc::clone(ctx));
    ctx.topics.courses.subscribe("teacher", move |course| {
        let task: TaskRef = Arc::new(TeacherWorker::new(Arc::clone(&c), Arc::clone(course)));
        s.spawn(task);
    });
}
