//! Typed wrappers for every remote endpoint used by the load engine.
//!
//! Each wrapper fixes the method, path and acceptable status codes of one endpoint and
//! decodes the response body where one is expected.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Body, HttpAgent, Links, Method, RawResponse, decode, parse_link_header, request};
use crate::error::LoadError;
use crate::model::{Announcement, ClassParam, CourseParam, CourseStatus, UserAccount};

#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddClassResponse {
    pub class_id: String,
}

/// Course as returned by search and detail endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseDetail {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub credit: u8,
    pub period: u8,
    pub day_of_week: String,
    pub teacher: String,
    #[serde(default)]
    pub keywords: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassSummary {
    pub id: String,
    pub part: u8,
    pub title: String,
    #[serde(default)]
    pub submission_closed: bool,
    #[serde(default)]
    pub submitted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementSummary {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    pub title: String,
    pub unread: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementList {
    pub unread_count: usize,
    pub announcements: Vec<AnnouncementSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementDetail {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    pub title: String,
    pub message: String,
    pub unread: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredCourse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    pub period: u8,
    pub day_of_week: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeSummary {
    pub credits: u32,
    pub gpa: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseGrade {
    pub name: String,
    pub code: String,
    pub total_score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Grades {
    #[serde(default)]
    pub summary: GradeSummary,
    #[serde(default)]
    pub courses: Vec<CourseGrade>,
}

/// One entry of a score upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub user_code: String,
    pub score: u32,
}

/// Course search filters; `None` fields are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParam {
    pub kind: Option<&'static str>,
    pub credit: Option<u8>,
    pub teacher: Option<String>,
    pub day_of_week: Option<&'static str>,
    pub period: Option<u8>,
    pub keywords: Vec<String>,
}

impl SearchParam {
    /// Encodes the filters as a query string (without the leading `?`).
    pub fn to_query(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(k) = self.kind {
            pairs.push(("type", k.to_string()));
        }
        if let Some(c) = self.credit {
            pairs.push(("credit", c.to_string()));
        }
        if let Some(t) = &self.teacher {
            pairs.push(("teacher", t.clone()));
        }
        if let Some(p) = self.period {
            pairs.push(("period", p.to_string()));
        }
        if let Some(d) = self.day_of_week {
            pairs.push(("day_of_week", d.to_string()));
        }
        if !self.keywords.is_empty() {
            pairs.push(("keywords", self.keywords.join(" ")));
        }
        pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={}", encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Minimal percent-encoding for query values.
fn encode(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for b in v.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Extracts paging links from all `Link` headers of `res`.
pub fn links_of(res: &RawResponse) -> Result<Links, LoadError> {
    let mut links = Links::default();
    for value in res.header_values("link") {
        let parsed = parse_link_header(value)?;
        links.prev = parsed.prev.or(links.prev);
        links.next = parsed.next.or(links.next);
    }
    Ok(links)
}

pub async fn login(agent: &dyn HttpAgent, account: &UserAccount) -> Result<(), LoadError> {
    let body = json!({ "code": account.code, "password": account.password });
    request(agent, Method::Post, "/login", Body::Json(body), &[200]).await?;
    Ok(())
}

pub async fn logout(agent: &dyn HttpAgent) -> Result<(), LoadError> {
    request(agent, Method::Post, "/logout", Body::Empty, &[200]).await?;
    Ok(())
}

/// Creates a course and returns its id.
pub async fn add_course(agent: &dyn HttpAgent, param: &CourseParam) -> Result<String, LoadError> {
    let body = json!({
        "code": param.code,
        "type": param.kind.as_str(),
        "name": param.name,
        "description": param.description,
        "credit": param.credit,
        "period": param.slot.period + 1,
        "day_of_week": param.slot.day_name(),
        "keywords": param.keywords,
    });
    let res = request(agent, Method::Post, "/api/courses", Body::Json(body), &[201]).await?;
    let id: IdResponse = decode(&res, "POST /api/courses")?;
    Ok(id.id)
}

/// Searches courses. `page_path` overrides the query with a `next` link target.
pub async fn search_courses(
    agent: &dyn HttpAgent,
    param: &SearchParam,
    page_path: Option<&str>,
) -> Result<(Vec<CourseDetail>, Links), LoadError> {
    let path = match page_path {
        Some(p) => p.to_string(),
        None => {
            let q = param.to_query();
            if q.is_empty() {
                "/api/courses".to_string()
            } else {
                format!("/api/courses?{q}")
            }
        }
    };
    let res = request(agent, Method::Get, path, Body::Empty, &[200]).await?;
    let courses = decode(&res, "GET /api/courses")?;
    Ok((courses, links_of(&res)?))
}

pub async fn get_course_detail(agent: &dyn HttpAgent, id: &str) -> Result<CourseDetail, LoadError> {
    let path = format!("/api/courses/{id}");
    let res = request(agent, Method::Get, &*path, Body::Empty, &[200]).await?;
    decode(&res, &path)
}

pub async fn set_course_status(
    agent: &dyn HttpAgent,
    id: &str,
    status: CourseStatus,
) -> Result<(), LoadError> {
    let body = json!({ "status": status.as_str() });
    let path = format!("/api/courses/{id}/status");
    request(agent, Method::Put, path, Body::Json(body), &[200]).await?;
    Ok(())
}

/// Adds a class and returns its id.
pub async fn add_class(
    agent: &dyn HttpAgent,
    course_id: &str,
    param: &ClassParam,
) -> Result<String, LoadError> {
    let body = json!({
        "part": param.part,
        "title": param.title,
        "description": param.description,
    });
    let path = format!("/api/courses/{course_id}/classes");
    let res = request(agent, Method::Post, &*path, Body::Json(body), &[201]).await?;
    let created: AddClassResponse = decode(&res, &path)?;
    Ok(created.class_id)
}

pub async fn get_classes(
    agent: &dyn HttpAgent,
    course_id: &str,
) -> Result<Vec<ClassSummary>, LoadError> {
    let path = format!("/api/courses/{course_id}/classes");
    let res = request(agent, Method::Get, &*path, Body::Empty, &[200]).await?;
    decode(&res, &path)
}

/// Uploads an assignment as `multipart/form-data` with field `file`.
pub async fn submit_assignment(
    agent: &dyn HttpAgent,
    course_id: &str,
    class_id: &str,
    file_name: &str,
    data: Vec<u8>,
) -> Result<(), LoadError> {
    let body = Body::Multipart {
        field: "file",
        file_name: file_name.to_string(),
        content_type: "application/pdf".to_string(),
        data,
    };
    let path = format!("/api/courses/{course_id}/classes/{class_id}/assignments");
    request(agent, Method::Post, path, body, &[204]).await?;
    Ok(())
}

pub async fn post_scores(
    agent: &dyn HttpAgent,
    course_id: &str,
    class_id: &str,
    scores: &[ScoreEntry],
) -> Result<(), LoadError> {
    let body = serde_json::to_value(scores)
        .map_err(|e| LoadError::critical(format!("encode scores: {e}")))?;
    let path = format!("/api/courses/{course_id}/classes/{class_id}/assignments/scores");
    request(agent, Method::Put, path, Body::Json(body), &[204]).await?;
    Ok(())
}

/// Downloads the zip archive of all submissions of a class.
pub async fn download_submissions(
    agent: &dyn HttpAgent,
    course_id: &str,
    class_id: &str,
) -> Result<Vec<u8>, LoadError> {
    let path = format!("/api/courses/{course_id}/classes/{class_id}/assignments/export");
    let res = request(agent, Method::Get, path, Body::Empty, &[200]).await?;
    Ok(res.body)
}

pub async fn send_announcement(agent: &dyn HttpAgent, a: &Announcement) -> Result<(), LoadError> {
    let body = json!({
        "id": a.id,
        "course_id": a.course_id,
        "title": a.title,
        "message": a.message,
    });
    request(agent, Method::Post, "/api/announcements", Body::Json(body), &[201]).await?;
    Ok(())
}

/// Fetches one page of announcements. `page_path` is a `next` link target, if any.
pub async fn get_announcement_list(
    agent: &dyn HttpAgent,
    page_path: Option<&str>,
) -> Result<(AnnouncementList, Links), LoadError> {
    let path = page_path.unwrap_or("/api/announcements").to_string();
    let res = request(agent, Method::Get, path, Body::Empty, &[200]).await?;
    let list = decode(&res, "GET /api/announcements")?;
    Ok((list, links_of(&res)?))
}

pub async fn get_announcement_detail(
    agent: &dyn HttpAgent,
    id: &str,
) -> Result<AnnouncementDetail, LoadError> {
    let path = format!("/api/announcements/{id}");
    let res = request(agent, Method::Get, &*path, Body::Empty, &[200]).await?;
    decode(&res, &path)
}

pub async fn get_registered_courses(
    agent: &dyn HttpAgent,
) -> Result<Vec<RegisteredCourse>, LoadError> {
    let res = request(agent, Method::Get, "/api/users/me/courses", Body::Empty, &[200]).await?;
    decode(&res, "GET /api/users/me/courses")
}

/// Registers the student to every course in `course_ids` (idempotent on the target).
pub async fn register_courses(agent: &dyn HttpAgent, course_ids: &[String]) -> Result<(), LoadError> {
    let body = serde_json::Value::Array(course_ids.iter().map(|id| json!({ "id": id })).collect());
    request(agent, Method::Put, "/api/users/me/courses", Body::Json(body), &[200]).await?;
    Ok(())
}

pub async fn get_grades(agent: &dyn HttpAgent) -> Result<Grades, LoadError> {
    let res = request(agent, Method::Get, "/api/users/me/grades", Body::Empty, &[200]).await?;
    decode(&res, "GET /api/users/me/grades")
}
