//! In-memory stand-ins for the data store, uploader and outbox, plus fixtures.
//! Only compiled for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analytics::pageviews::PageViewStore;
use crate::applications::candidates::CandidateStore;
use crate::applications::outbox::{Outbox, OutboxEntry};
use crate::applications::repository::{ApplicationStore, ApplicationUpdate, NewApplication};
use crate::applications::validation::ApplicationForm;
use crate::config::Config;
use crate::errors::AppError;
use crate::jobs::store::{JobStore, NewJob};
use crate::models::application::ApplicationRow;
use crate::models::candidate::NewCandidateRow;
use crate::models::job::JobRow;
use crate::state::AppState;
use crate::uploads::{AssetUploader, UploadFile, UploadedAsset};

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn ada_form(resume: &str) -> ApplicationForm {
    ApplicationForm {
        firstname: "Ada".into(),
        lastname: "Lovelace".into(),
        email: "ada@x.com".into(),
        phone: "+1000".into(),
        nationality: "British".into(),
        coverletter: "...".into(),
        resume: resume.into(),
    }
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile {
        file_name: name.into(),
        content_type: Some("application/pdf".into()),
        data: Bytes::from_static(b"%PDF-1.4 resume"),
    }
}

pub fn sample_job(title: &str, salary: &str) -> NewJob {
    NewJob {
        company_id: Some(Uuid::new_v4()),
        title: title.into(),
        description: "Work on things".into(),
        category: "Engineering".into(),
        category_icon: String::new(),
        job_type: "Full-time".into(),
        location: "Remote".into(),
        level: "Senior".into(),
        salary: salary.into(),
        company: "Acme".into(),
        company_logo: String::new(),
        capacity: 5,
    }
}

pub fn job_row(title: &str, job_type: &str, salary: &str) -> JobRow {
    JobRow {
        id: Uuid::new_v4(),
        company_id: None,
        title: title.into(),
        description: String::new(),
        category: "Engineering".into(),
        category_icon: String::new(),
        job_type: job_type.into(),
        location: "Remote".into(),
        level: "Mid".into(),
        salary: salary.into(),
        company: "Acme".into(),
        company_logo: String::new(),
        capacity: 1,
        applied: 0,
        created_at: Utc::now(),
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/talentio_test".into(),
        redis_url: "redis://localhost".into(),
        s3_bucket: "talentio".into(),
        s3_endpoint: "http://localhost:9000".into(),
        s3_public_url: "http://localhost:9000".into(),
        aws_access_key_id: "test".into(),
        aws_secret_access_key: "test".into(),
        port: 0,
        rust_log: "debug".into(),
        max_resume_bytes: 1024 * 1024,
        outbox_poll_secs: 1,
        page_view_window_days: 8,
    }
}

/// Concrete handles behind a test `AppState`, for seeding and assertions.
pub struct TestBackends {
    pub applications: Arc<InMemoryApplications>,
    pub candidates: Arc<InMemoryCandidates>,
    pub jobs: Arc<InMemoryJobs>,
    pub page_views: Arc<InMemoryPageViews>,
    pub uploader: Arc<ScriptedUploader>,
    pub outbox: Arc<InMemoryOutbox>,
}

pub fn test_state(uploader: ScriptedUploader) -> (AppState, TestBackends) {
    let backends = TestBackends {
        applications: Arc::new(InMemoryApplications::default()),
        candidates: Arc::new(InMemoryCandidates::default()),
        jobs: Arc::new(InMemoryJobs::default()),
        page_views: Arc::new(InMemoryPageViews::default()),
        uploader: Arc::new(uploader),
        outbox: Arc::new(InMemoryOutbox::default()),
    };
    let state = AppState {
        applications: backends.applications.clone(),
        candidates: backends.candidates.clone(),
        jobs: backends.jobs.clone(),
        page_views: backends.page_views.clone(),
        uploader: backends.uploader.clone(),
        outbox: backends.outbox.clone(),
        config: test_config(),
    };
    (state, backends)
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryApplications {
    rows: Mutex<Vec<ApplicationRow>>,
}

fn window<T: Clone>(rows: impl Iterator<Item = T>, skip: i64, limit: i64) -> Vec<T> {
    rows.skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl ApplicationStore for InMemoryApplications {
    async fn insert(&self, a: NewApplication) -> Result<ApplicationRow, AppError> {
        let row = ApplicationRow {
            id: Uuid::new_v4(),
            user_id: a.user_id,
            job_id: a.job_id,
            company_id: a.company_id,
            firstname: a.firstname,
            lastname: a.lastname,
            email: a.email,
            phone: a.phone,
            nationality: a.nationality,
            coverletter: a.coverletter,
            resume: a.resume,
            score: a.score,
            stage: a.stage.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(window(
            rows.iter().filter(|r| r.user_id == user_id).cloned(),
            skip,
            limit,
        ))
    }

    async fn find_by_company(
        &self,
        company_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(window(
            rows.iter().filter(|r| r.company_id == company_id).cloned(),
            skip,
            limit,
        ))
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ApplicationRow>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !ids.contains(&r.id));
        Ok((before - rows.len()) as u64)
    }

    async fn update_by_user_and_job(
        &self,
        update: &ApplicationUpdate,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|r| r.user_id == user_id && r.job_id == job_id)
        {
            Some(row) => {
                update.apply_to(row);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCandidates {
    rows: Mutex<Vec<NewCandidateRow>>,
}

impl InMemoryCandidates {
    pub fn records_for(&self, application_id: Uuid) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.application_id == application_id)
            .count()
    }
}

#[async_trait]
impl CandidateStore for InMemoryCandidates {
    async fn create(
        &self,
        application_id: Uuid,
        company_id: Uuid,
    ) -> Result<NewCandidateRow, AppError> {
        let mut rows = self.rows.lock().unwrap();
        // new_candidates.application_id is UNIQUE
        if rows.iter().any(|r| r.application_id == application_id) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "duplicate key value violates unique constraint on application_id {application_id}"
            )));
        }
        let row = NewCandidateRow {
            id: Uuid::new_v4(),
            application_id,
            company_id,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn count_unseen(&self, company_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.company_id == company_id)
            .count() as i64)
    }

    async fn delete(&self, application_id: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(pos) = rows.iter().position(|r| r.application_id == application_id) {
            rows.remove(pos);
        }
        Ok(())
    }

    async fn delete_many(&self, application_ids: &[Uuid]) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !application_ids.contains(&r.application_id));
        Ok((before - rows.len()) as u64)
    }
}

/// Candidate store whose writes always fail.
pub struct FailingCandidates;

#[async_trait]
impl CandidateStore for FailingCandidates {
    async fn create(&self, _: Uuid, _: Uuid) -> Result<NewCandidateRow, AppError> {
        Err(AppError::Internal(anyhow::anyhow!("connection reset")))
    }

    async fn count_unseen(&self, _: Uuid) -> Result<i64, AppError> {
        Ok(0)
    }

    async fn delete(&self, _: Uuid) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete_many(&self, _: &[Uuid]) -> Result<u64, AppError> {
        Ok(0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryJobs {
    rows: Mutex<Vec<JobRow>>,
}

#[async_trait]
impl JobStore for InMemoryJobs {
    async fn insert(&self, job: NewJob) -> Result<JobRow, AppError> {
        let row = JobRow {
            id: Uuid::new_v4(),
            company_id: job.company_id,
            title: job.title,
            description: job.description,
            category: job.category,
            category_icon: job.category_icon,
            job_type: job.job_type,
            location: job.location,
            level: job.level,
            salary: job.salary,
            company: job.company,
            company_logo: job.company_logo,
            capacity: job.capacity,
            applied: 0,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<JobRow>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(window(rows.iter().cloned(), skip, limit))
    }

    async fn list_all(&self) -> Result<Vec<JobRow>, AppError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn increment_applied(&self, id: Uuid) -> Result<i32, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
        row.applied += 1;
        Ok(row.applied)
    }

    async fn set_applied(&self, id: Uuid, applied: i32) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
        row.applied = applied;
        Ok(())
    }
}

/// Job store whose applicant-count increments fail; everything else is
/// served by an in-memory store.
pub struct FailingIncrements {
    pub inner: Arc<InMemoryJobs>,
}

#[async_trait]
impl JobStore for FailingIncrements {
    async fn insert(&self, job: NewJob) -> Result<JobRow, AppError> {
        self.inner.insert(job).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<JobRow>, AppError> {
        self.inner.list(skip, limit).await
    }

    async fn list_all(&self) -> Result<Vec<JobRow>, AppError> {
        self.inner.list_all().await
    }

    async fn increment_applied(&self, _: Uuid) -> Result<i32, AppError> {
        Err(AppError::Internal(anyhow::anyhow!("connection reset")))
    }

    async fn set_applied(&self, id: Uuid, applied: i32) -> Result<(), AppError> {
        self.inner.set_applied(id, applied).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Page views
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryPageViews {
    views: Mutex<Vec<(Uuid, DateTime<Utc>)>>,
}

#[async_trait]
impl PageViewStore for InMemoryPageViews {
    async fn record(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.views.lock().unwrap().push((company_id, at));
        Ok(())
    }

    async fn count_since(&self, company_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError> {
        Ok(self
            .views
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, at)| *c == company_id && *at > since)
            .count() as i64)
    }
}

/// Page-view store that is always down.
pub struct FailingPageViews;

#[async_trait]
impl PageViewStore for FailingPageViews {
    async fn record(&self, _: Uuid, _: DateTime<Utc>) -> Result<(), AppError> {
        Err(AppError::Internal(anyhow::anyhow!("store down")))
    }

    async fn count_since(&self, _: Uuid, _: DateTime<Utc>) -> Result<i64, AppError> {
        Err(AppError::Internal(anyhow::anyhow!("store down")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Uploader
// ────────────────────────────────────────────────────────────────────────────

enum UploadScript {
    Succeed(String),
    Empty,
    Fail,
}

/// Uploader with a fixed response, counting calls.
pub struct ScriptedUploader {
    script: UploadScript,
    calls: AtomicUsize,
}

impl ScriptedUploader {
    pub fn succeeding(url: &str) -> Self {
        Self::with(UploadScript::Succeed(url.to_string()))
    }

    /// Returns an empty result, the "nothing came back" case.
    pub fn empty() -> Self {
        Self::with(UploadScript::Empty)
    }

    pub fn failing() -> Self {
        Self::with(UploadScript::Fail)
    }

    fn with(script: UploadScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetUploader for ScriptedUploader {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<UploadedAsset>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            UploadScript::Succeed(url) => Ok(files
                .iter()
                .map(|_| UploadedAsset { url: url.clone() })
                .collect()),
            UploadScript::Empty => Ok(Vec::new()),
            UploadScript::Fail => Err(AppError::Upload("storage unavailable".into())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbox
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryOutbox {
    entries: Mutex<Vec<OutboxEntry>>,
    in_flight: Mutex<Vec<OutboxEntry>>,
    reject_pushes: AtomicBool,
}

impl InMemoryOutbox {
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn in_flight(&self) -> Vec<OutboxEntry> {
        self.in_flight.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Makes `push` fail, as if Redis were unreachable.
    pub fn reject_pushes(&self, reject: bool) {
        self.reject_pushes.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Outbox for InMemoryOutbox {
    async fn push(&self, entry: OutboxEntry) -> Result<(), AppError> {
        if self.reject_pushes.load(Ordering::SeqCst) {
            return Err(AppError::Outbox("connection refused".into()));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn pending(&self) -> Result<usize, AppError> {
        Ok(self.entries.lock().unwrap().len())
    }

    async fn claim(&self) -> Result<Option<OutboxEntry>, AppError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.is_empty() {
            return Ok(None);
        }
        let entry = entries.remove(0);
        self.in_flight.lock().unwrap().push(entry.clone());
        Ok(Some(entry))
    }

    async fn ack(&self, entry: &OutboxEntry) -> Result<(), AppError> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(pos) = in_flight.iter().position(|e| e == entry) {
            in_flight.remove(pos);
        }
        Ok(())
    }

    async fn recover(&self) -> Result<usize, AppError> {
        let recovered: Vec<OutboxEntry> = self.in_flight.lock().unwrap().drain(..).collect();
        let moved = recovered.len();
        let mut entries = self.entries.lock().unwrap();
        let queued = std::mem::take(&mut *entries);
        entries.extend(recovered);
        entries.extend(queued);
        Ok(moved)
    }
}
