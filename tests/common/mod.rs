//! In-memory stand-in for the target web application.
//!
//! Every connected agent is one user session. The shared [`FakeTarget`] keeps just
//! enough state (courses, classes, scores, announcements, registrations) for the
//! workers' checks and the final grade validation to pass against a well-behaved
//! server.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use courseload::Config;
use courseload::LoadError;
use courseload::api::{ApiRequest, Body, Connector, HttpAgent, Method, RawResponse};
use courseload::model::Timeslot;
use courseload::model::{Course, CourseKind, CourseParam, Student, Teacher, UserAccount};

#[derive(Default)]
struct State {
    /// course id -> body of the creating request
    courses: HashMap<String, Value>,
    /// course id -> status sent by the teacher
    statuses: HashMap<String, String>,
    /// course id -> class ids
    classes: HashMap<String, Vec<String>>,
    /// class id -> uploaded file names
    submissions: HashMap<String, Vec<String>>,
    /// class id -> user code -> score
    scores: HashMap<String, HashMap<String, u32>>,
    /// announcement id -> (course id, title, message)
    announcements: HashMap<String, (String, String, String)>,
}

/// Shared fake server.
#[derive(Default)]
pub struct FakeTarget {
    state: Mutex<State>,
    next_id: AtomicU64,
    /// Artificial latency per request.
    latency: Mutex<Duration>,
    /// Status returned by `PUT /api/users/me/courses` (200 when unset).
    register_status: Mutex<Option<u16>>,
    /// Submission downloads still to time out.
    export_timeouts: AtomicUsize,
    pub requests: AtomicUsize,
}

impl FakeTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        *self.latency.lock().unwrap() = latency;
        self
    }

    pub fn fail_registrations(&self, status: u16) {
        *self.register_status.lock().unwrap() = Some(status);
    }

    /// Makes the next `n` submission downloads time out.
    pub fn time_out_exports(&self, n: usize) {
        self.export_timeouts.store(n, Ordering::SeqCst);
    }

    fn take_export_timeout(&self) -> bool {
        self.export_timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn id(&self, prefix: &str) -> String {
        format!("{prefix}{:08}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// One session against a [`FakeTarget`].
pub struct FakeAgent {
    target: Arc<FakeTarget>,
    /// Code of the logged in user.
    user: Mutex<Option<String>>,
    registered: Mutex<HashSet<String>>,
}

impl FakeAgent {
    fn handle(&self, req: &ApiRequest) -> RawResponse {
        let t = &self.target;
        let path = req.path.split('?').next().unwrap_or_default();
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (req.method, parts.as_slice()) {
            (Method::Post, ["login"]) => {
                *self.user.lock().unwrap() = Some(json_field(&req.body, "code"));
                RawResponse::new(200)
            }
            (Method::Post, ["logout"]) => RawResponse::new(200),

            (Method::Post, ["api", "courses"]) => {
                let id = t.id("C");
                let body = match &req.body {
                    Body::Json(v) => v.clone(),
                    _ => Value::Null,
                };
                t.state.lock().unwrap().courses.insert(id.clone(), body);
                RawResponse::new(201).with_json(&json!({ "id": id }))
            }
            (Method::Get, ["api", "courses"]) => RawResponse::new(200).with_json(&json!([])),
            (Method::Get, ["api", "courses", id]) => {
                let st = t.state.lock().unwrap();
                match st.courses.get(*id) {
                    Some(body) => {
                        let mut detail = body.clone();
                        detail["id"] = json!(id);
                        detail["teacher"] = json!("teacher");
                        detail["status"] = json!("registration");
                        RawResponse::new(200).with_json(&detail)
                    }
                    None => RawResponse::new(404),
                }
            }
            (Method::Put, ["api", "courses", cid, "status"]) => {
                let status = json_field(&req.body, "status");
                t.state.lock().unwrap().statuses.insert(cid.to_string(), status);
                RawResponse::new(200)
            }
            (Method::Post, ["api", "courses", cid, "classes"]) => {
                let id = t.id("K");
                t.state
                    .lock()
                    .unwrap()
                    .classes
                    .entry(cid.to_string())
                    .or_default()
                    .push(id.clone());
                RawResponse::new(201).with_json(&json!({ "class_id": id }))
            }
            (Method::Get, ["api", "courses", cid, "classes"]) => {
                let st = t.state.lock().unwrap();
                let list: Vec<Value> = st
                    .classes
                    .get(*cid)
                    .into_iter()
                    .flatten()
                    .enumerate()
                    .map(|(i, id)| json!({ "id": id, "part": i + 1, "title": "class" }))
                    .collect();
                RawResponse::new(200).with_json(&Value::Array(list))
            }
            (Method::Post, ["api", "courses", _, "classes", kid, "assignments"]) => {
                let file_name = match &req.body {
                    Body::Multipart { file_name, .. } => file_name.clone(),
                    _ => String::new(),
                };
                t.state
                    .lock()
                    .unwrap()
                    .submissions
                    .entry(kid.to_string())
                    .or_default()
                    .push(file_name);
                RawResponse::new(204)
            }
            (Method::Put, ["api", "courses", _, "classes", kid, "assignments", "scores"]) => {
                if let Body::Json(Value::Array(items)) = &req.body {
                    let mut st = t.state.lock().unwrap();
                    let scores = st.scores.entry(kid.to_string()).or_default();
                    for item in items {
                        let code = item["user_code"].as_str().unwrap_or_default();
                        let score = item["score"].as_u64().unwrap_or_default();
                        scores.insert(code.to_string(), score as u32);
                    }
                }
                RawResponse::new(204)
            }
            (Method::Get, ["api", "courses", _, "classes", kid, "assignments", "export"]) => {
                let st = t.state.lock().unwrap();
                let mut res = RawResponse::new(200);
                res.body = fake_zip(st.submissions.get(*kid).map_or(&[][..], Vec::as_slice));
                res
            }

            (Method::Post, ["api", "announcements"]) => {
                let id = json_field(&req.body, "id");
                let entry = (
                    json_field(&req.body, "course_id"),
                    json_field(&req.body, "title"),
                    json_field(&req.body, "message"),
                );
                t.state.lock().unwrap().announcements.insert(id, entry);
                RawResponse::new(201)
            }
            (Method::Get, ["api", "announcements"]) => RawResponse::new(200)
                .with_json(&json!({ "unread_count": 0, "announcements": [] })),
            (Method::Get, ["api", "announcements", id]) => {
                let st = t.state.lock().unwrap();
                match st.announcements.get(*id) {
                    Some((course_id, title, message)) => RawResponse::new(200).with_json(&json!({
                        "id": id,
                        "course_id": course_id,
                        "title": title,
                        "message": message,
                        "unread": false,
                    })),
                    None => RawResponse::new(404),
                }
            }

            (Method::Get, ["api", "users", "me", "courses"]) => {
                RawResponse::new(200).with_json(&json!([]))
            }
            (Method::Put, ["api", "users", "me", "courses"]) => {
                if let Some(status) = *t.register_status.lock().unwrap() {
                    return RawResponse::new(status);
                }
                if let Body::Json(Value::Array(items)) = &req.body {
                    let mut reg = self.registered.lock().unwrap();
                    for item in items {
                        if let Some(id) = item.get("id").and_then(Value::as_str) {
                            reg.insert(id.to_string());
                        }
                    }
                }
                RawResponse::new(200)
            }
            (Method::Get, ["api", "users", "me", "grades"]) => {
                let user = self.user.lock().unwrap().clone().unwrap_or_default();
                let st = t.state.lock().unwrap();
                let mut courses = Vec::new();
                let (mut credits, mut points) = (0u64, 0u64);
                for id in self.registered.lock().unwrap().iter() {
                    let Some(c) = st.courses.get(id) else { continue };
                    let total: u64 = st
                        .classes
                        .get(id)
                        .into_iter()
                        .flatten()
                        .filter_map(|kid| st.scores.get(kid)?.get(&user))
                        .map(|s| u64::from(*s))
                        .sum();
                    if st.statuses.get(id).map(String::as_str) == Some("closed") {
                        let credit = c["credit"].as_u64().unwrap_or_default();
                        credits += credit;
                        points += total * credit;
                    }
                    courses.push(json!({ "name": c["name"], "code": c["code"], "total_score": total }));
                }
                let gpa = if credits == 0 {
                    0.0
                } else {
                    points as f64 / 100.0 / credits as f64
                };
                RawResponse::new(200).with_json(&json!({
                    "summary": { "credits": credits, "gpa": gpa },
                    "courses": courses,
                }))
            }

            _ => RawResponse::new(404),
        }
    }
}

#[async_trait]
impl HttpAgent for FakeAgent {
    async fn send(&self, req: ApiRequest) -> Result<RawResponse, LoadError> {
        self.target.requests.fetch_add(1, Ordering::Relaxed);
        let latency = *self.target.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if req.path.ends_with("/export") && self.target.take_export_timeout() {
            return Err(LoadError::Timeout {
                timeout: Duration::from_secs(1),
            });
        }
        Ok(self.handle(&req))
    }
}

/// Connector handing out [`FakeAgent`]s of one target.
pub struct FakeConnector(pub Arc<FakeTarget>);

impl Connector for FakeConnector {
    fn connect(&self) -> Result<Arc<dyn HttpAgent>, LoadError> {
        Ok(Arc::new(FakeAgent {
            target: Arc::clone(&self.0),
            user: Mutex::new(None),
            registered: Mutex::new(HashSet::new()),
        }))
    }
}

fn json_field(body: &Body, key: &str) -> String {
    match body {
        Body::Json(v) => v
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Local file header per submission, then the end-of-central-directory record.
fn fake_zip(files: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for name in files {
        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(name.as_bytes());
    }
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0; 18]);
    out
}

/// A small, fast configuration for end-to-end runs.
pub fn fast_config() -> Config {
    Config {
        initial_students: 6,
        initial_courses: 4,
        registration_cap: 3,
        seat_cap: 3,
        classes_per_course: 2,
        searches_per_registration: 1,
        min_page_interval: Duration::from_millis(20),
        course_full_wait: Duration::from_millis(100),
        read_announcement_wait: Duration::from_millis(200),
        grade_retry_wait: Duration::from_millis(300),
        load_window: Duration::from_secs(2),
        retry_window: Duration::from_millis(200),
        grace: Duration::from_secs(5),
        report_interval: Duration::from_millis(500),
        ..Config::default()
    }
}

// ---- model fixtures ----

fn account(code: &str) -> UserAccount {
    UserAccount {
        code: code.to_string(),
        name: code.to_string(),
        password: code.to_string(),
        is_admin: code.starts_with('T'),
    }
}

pub fn student(target: &Arc<FakeTarget>, code: &str) -> Arc<Student> {
    let agent = FakeConnector(Arc::clone(target)).connect().unwrap();
    Arc::new(Student::new(account(code), agent))
}

pub fn course(target: &Arc<FakeTarget>, id: &str, slot: Timeslot, seat_cap: usize) -> Arc<Course> {
    let agent = FakeConnector(Arc::clone(target)).connect().unwrap();
    let teacher = Arc::new(Teacher::new(account("T00001"), agent));
    let param = CourseParam {
        code: format!("M{id}"),
        kind: CourseKind::Major,
        name: format!("course {id}"),
        description: String::new(),
        credit: 2,
        teacher: "T00001".into(),
        slot,
        keywords: String::new(),
    };
    Arc::new(Course::new(id, param, teacher, seat_cap))
}
