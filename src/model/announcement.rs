/// A class announcement as sent by a teacher. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub id: String,
    pub course_id: String,
    pub course_name: String,
    pub title: String,
    pub message: String,
    /// Monotonic per-generator timestamp (seconds).
    pub created_at: i64,
}
