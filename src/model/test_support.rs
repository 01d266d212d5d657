//! Fixtures shared by the model unit tests.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    Announcement, Course, CourseKind, CourseParam, Student, Teacher, Timeslot, UserAccount,
};
use crate::api::{ApiRequest, Connector, HttpAgent, RawResponse};
use crate::error::LoadError;

/// Agent that answers every request with `200` and an empty body.
pub struct NullAgent;

#[async_trait]
impl HttpAgent for NullAgent {
    async fn send(&self, _req: ApiRequest) -> Result<RawResponse, LoadError> {
        Ok(RawResponse::new(200))
    }
}

pub struct NullConnector;

impl Connector for NullConnector {
    fn connect(&self) -> Result<Arc<dyn HttpAgent>, LoadError> {
        Ok(Arc::new(NullAgent))
    }
}

fn account(code: &str) -> UserAccount {
    UserAccount {
        code: code.to_string(),
        name: code.to_string(),
        password: code.to_string(),
        is_admin: false,
    }
}

pub fn student(code: &str) -> Arc<Student> {
    Arc::new(Student::new(account(code), Arc::new(NullAgent)))
}

pub fn course(id: &str, slot: Timeslot, seat_cap: usize) -> Course {
    let teacher = Arc::new(Teacher::new(account("T00001"), Arc::new(NullAgent)));
    let param = CourseParam {
        code: format!("M-{id}"),
        kind: CourseKind::Major,
        name: format!("course {id}"),
        description: String::new(),
        credit: 2,
        teacher: "T00001".into(),
        slot,
        keywords: String::new(),
    };
    Course::new(id, param, teacher, seat_cap)
}

pub fn announcement(id: &str, created_at: i64) -> Arc<Announcement> {
    Arc::new(Announcement {
        id: id.to_string(),
        course_id: "c1".into(),
        course_name: "course c1".into(),
        title: format!("title {id}"),
        message: String::new(),
        created_at,
    })
}
