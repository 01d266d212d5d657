//! Accounts, teachers and the pool that hands them out.

use std::sync::{Arc, Mutex};

use rand::Rng;
use tokio::sync::OnceCell;

use crate::api::{Connector, HttpAgent};
use crate::error::LoadError;

use super::Student;

/// Login credentials and display data of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub code: String,
    pub name: String,
    pub password: String,
    pub is_admin: bool,
}

/// A teacher with one session shared by all of their courses.
pub struct Teacher {
    pub account: UserAccount,
    agent: Arc<dyn HttpAgent>,
    session: OnceCell<()>,
}

impl std::fmt::Debug for Teacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teacher")
            .field("code", &self.account.code)
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

impl Teacher {
    pub fn new(account: UserAccount, agent: Arc<dyn HttpAgent>) -> Self {
        Self {
            account,
            agent,
            session: OnceCell::new(),
        }
    }

    pub fn agent(&self) -> &dyn HttpAgent {
        self.agent.as_ref()
    }

    /// Runs `login` unless a previous call succeeded. Concurrent callers wait for the
    /// in-flight attempt; a failed attempt lets the next caller retry.
    pub async fn login_once<F, Fut>(&self, login: F) -> Result<(), LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), LoadError>>,
    {
        self.session.get_or_try_init(login).await.map(|_| ())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.initialized()
    }
}

const SAMPLE_TEACHER_EVERY: usize = 20;

#[derive(Debug, Default)]
struct PoolState {
    next_student: usize,
    teacher_picks: usize,
}

/// Deterministic supply of student accounts and a fixed set of teachers.
///
/// Every [`SAMPLE_TEACHER_EVERY`]-th pick returns the sample teacher `T00000`.
pub struct UserPool {
    connector: Arc<dyn Connector>,
    teachers: Vec<Arc<Teacher>>,
    sample_teacher: Arc<Teacher>,
    state: Mutex<PoolState>,
}

impl UserPool {
    /// Creates the pool with `teacher_count` regular teachers (at least one).
    pub fn new(connector: Arc<dyn Connector>, teacher_count: usize) -> Result<Self, LoadError> {
        let sample_teacher = Arc::new(Teacher::new(
            account("T00000", "sample teacher"),
            connector.connect()?,
        ));
        let teachers = (1..=teacher_count.max(1))
            .map(|i| {
                let code = format!("T{i:05}");
                let name = format!("teacher {i}");
                Ok(Arc::new(Teacher::new(account(&code, &name), connector.connect()?)))
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        Ok(Self {
            connector,
            teachers,
            sample_teacher,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Next unused student account with its own session.
    pub fn new_student(&self) -> Result<Arc<Student>, LoadError> {
        let n = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let n = st.next_student;
            st.next_student += 1;
            n
        };
        let (code, name) = if n == 0 {
            ("S00000".to_string(), "sample student".to_string())
        } else {
            (format!("S{n:05}"), format!("student {n}"))
        };
        Ok(Arc::new(Student::new(
            account(&code, &name),
            self.connector.connect()?,
        )))
    }

    pub fn random_teacher(&self) -> Arc<Teacher> {
        let pick = {
            let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let pick = st.teacher_picks;
            st.teacher_picks += 1;
            pick
        };
        if pick % SAMPLE_TEACHER_EVERY == 0 {
            return Arc::clone(&self.sample_teacher);
        }
        let i = rand::rng().random_range(0..self.teachers.len());
        Arc::clone(&self.teachers[i])
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Arc<Teacher>> {
        std::iter::once(&self.sample_teacher).chain(self.teachers.iter())
    }
}

fn account(code: &str, name: &str) -> UserAccount {
    UserAccount {
        code: code.to_string(),
        name: name.to_string(),
        password: code.to_string(),
        is_admin: code.starts_with('T'),
    }
}
