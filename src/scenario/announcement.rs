//! # Student announcement loop.
//!
//! Each round fetches one page of the announcement list, then reads the student's
//! unread announcements oldest first. A failed detail request puts the announcement
//! back at the front of the queue, so the next round retries it before anything newer.
//!
//! Pages follow the `next` link; after the last page the student idles until a new
//! announcement arrives (or a short poll interval passes). Two list requests are never
//! closer than `Config::min_page_interval`.
//!
//! Failures never end this loop; they are reported and the next round starts after the
//! page interval.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::LoadContext;
use crate::{
    api::endpoints::{self, AnnouncementList},
    error::LoadError,
    model::{Announcement, Student},
    score::ScoreTag,
    tasks::Task,
};

const IDLE_POLL: Duration = Duration::from_millis(400);

/// Announcement reader for one student.
pub struct AnnouncementWorker {
    name: String,
    ctx: Arc<LoadContext>,
    student: Arc<Student>,
}

impl AnnouncementWorker {
    pub fn new(ctx: Arc<LoadContext>, student: Arc<Student>) -> Self {
        Self {
            name: format!("announcements/{}", student.code()),
            ctx,
            student,
        }
    }

    /// Announcements this student already read must not be listed as unread.
    fn verify_list(&self, list: &AnnouncementList) -> Result<(), LoadError> {
        let stale = list
            .announcements
            .iter()
            .find(|a| a.unread && self.student.is_read(&a.id));
        match stale {
            Some(a) => Err(LoadError::application(format!(
                "announcement {} already read by {} but listed as unread",
                a.id,
                self.student.code()
            ))),
            None => Ok(()),
        }
    }

    /// Reads unread announcements in FIFO order. Stops at the first failure, after
    /// restoring the failed announcement to the front of the queue.
    async fn read_unread(&self, token: &CancellationToken) {
        let ctx = &self.ctx;
        while let Some(a) = self.student.pop_unread() {
            if ctx.is_no_request_time(token) {
                self.student.restore_unread(a);
                return;
            }
            if let Err(e) = self.read_one(&a).await {
                ctx.report(&e);
                self.student.restore_unread(a);
                return;
            }
        }
    }

    async fn read_one(&self, a: &Announcement) -> Result<(), LoadError> {
        let detail = endpoints::get_announcement_detail(self.student.agent(), &a.id).await?;
        if detail.course_id != a.course_id || detail.title != a.title || detail.message != a.message {
            // the target did serve it, so it counts as read
            self.student.mark_read(&a.id);
            return Err(LoadError::application(format!(
                "announcement {} detail does not match what was sent",
                a.id
            )));
        }
        self.ctx.score(ScoreTag::GetAnnouncementDetail);
        self.student.mark_read(&a.id);
        Ok(())
    }
}

#[async_trait]
impl Task for AnnouncementWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: CancellationToken) -> Result<(), LoadError> {
        let ctx = &self.ctx;
        let mut next: Option<String> = None;

        loop {
            let pace = Instant::now() + ctx.cfg.min_page_interval;
            if token.is_cancelled() {
                return Err(LoadError::Canceled);
            }
            if ctx.is_no_request_time(&token) {
                return Ok(());
            }

            match endpoints::get_announcement_list(self.student.agent(), next.as_deref()).await {
                Ok((list, links)) => {
                    match self.verify_list(&list) {
                        Ok(()) => ctx.score(ScoreTag::GetAnnouncementList),
                        Err(e) => ctx.report(&e),
                    }
                    self.read_unread(&token).await;

                    next = links.next;
                    if next.is_none() && !self.student.has_unread() {
                        self.student.wait_unread(&token, IDLE_POLL).await;
                    }
                }
                Err(e) => {
                    ctx.report(&e);
                    next = None;
                }
            }

            tokio::select! {
                _ = token.cancelled() => return Err(LoadError::Canceled),
                _ = tokio::time::sleep_until(pace) => {}
            }
        }
    }
}
