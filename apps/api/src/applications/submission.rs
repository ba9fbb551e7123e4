//! Submission orchestrator.
//!
//! Validate → upload (optional) → persist → notify → increment → complete.
//! Steps run strictly in sequence. Validation and upload failures end the
//! submission before anything is written. After the application row exists,
//! the candidate record and the counter increment are best-effort: failures
//! are deferred to the outbox and the submission still completes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::applications::candidates::CandidateStore;
use crate::applications::outbox::{defer, DependentWrite, Outbox};
use crate::applications::repository::{create_application, ApplicationStore};
use crate::applications::validation::ApplicationForm;
use crate::errors::AppError;
use crate::jobs::store::JobStore;
use crate::models::application::ApplicationRow;
use crate::state::AppState;
use crate::uploads::{check_attachments, resolve_resume, AssetUploader, UploadFile};

/// Where the client lands after a successful submission.
pub const DASHBOARD_PATH: &str = "/individual/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Validating,
    Uploading,
    Persisting,
    Notifying,
    Incrementing,
    Complete,
    Failed,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Failed)
                | (Validating, Uploading)
                | (Validating, Persisting)
                | (Uploading, Failed)
                | (Uploading, Persisting)
                | (Persisting, Notifying)
                | (Notifying, Incrementing)
                | (Incrementing, Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Complete | SubmissionState::Failed)
    }
}

/// Current state plus every state visited, for logs and the response.
#[derive(Debug, Clone)]
pub struct SubmissionTracker {
    state: SubmissionState,
    trail: Vec<SubmissionState>,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self {
            state: SubmissionState::Idle,
            trail: vec![SubmissionState::Idle],
        }
    }
}

impl SubmissionTracker {
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn trail(&self) -> &[SubmissionState] {
        &self.trail
    }

    pub fn advance(&mut self, next: SubmissionState) -> Result<(), AppError> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "illegal submission transition {:?} -> {:?}",
                self.state,
                next
            )));
        }
        debug!("Submission {:?} -> {:?}", self.state, next);
        self.state = next;
        self.trail.push(next);
        Ok(())
    }

    /// Moves to `Failed` and hands back `err` for the caller to return.
    fn fail(&mut self, err: AppError) -> AppError {
        match self.advance(SubmissionState::Failed) {
            Ok(()) => err,
            Err(transition) => transition,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub form: ApplicationForm,
    pub attachments: Vec<UploadFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub application: ApplicationRow,
    pub redirect_to: &'static str,
    /// New applicant count, when the increment went through.
    pub applied: Option<i32>,
    /// Dependent writes handed to the outbox.
    pub deferred_writes: usize,
    pub trail: Vec<SubmissionState>,
}

/// Everything one submission touches.
#[derive(Clone)]
pub struct SubmissionPipeline {
    pub applications: Arc<dyn ApplicationStore>,
    pub candidates: Arc<dyn CandidateStore>,
    pub jobs: Arc<dyn JobStore>,
    pub uploader: Arc<dyn AssetUploader>,
    pub outbox: Arc<dyn Outbox>,
    pub max_resume_bytes: usize,
}

impl SubmissionPipeline {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            applications: state.applications.clone(),
            candidates: state.candidates.clone(),
            jobs: state.jobs.clone(),
            uploader: state.uploader.clone(),
            outbox: state.outbox.clone(),
            max_resume_bytes: state.config.max_resume_bytes,
        }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome, AppError> {
        let SubmissionRequest {
            job_id,
            user_id,
            form,
            attachments,
        } = request;
        let mut tracker = SubmissionTracker::default();

        // Validating
        tracker.advance(SubmissionState::Validating)?;
        let job = match self.jobs.find_by_id(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                return Err(tracker.fail(AppError::NotFound(format!("Job {job_id} not found"))))
            }
            Err(e) => return Err(tracker.fail(e)),
        };
        let has_attachment = !attachments.is_empty();
        let valid = match form.validate(has_attachment) {
            Ok(valid) => valid,
            Err(fields) => return Err(tracker.fail(fields.into())),
        };
        if let Err(fields) = check_attachments(&attachments, self.max_resume_bytes) {
            return Err(tracker.fail(fields.into()));
        }

        // Uploading
        let resume = if has_attachment {
            tracker.advance(SubmissionState::Uploading)?;
            match resolve_resume(self.uploader.as_ref(), attachments, &valid.resume).await {
                Ok(url) => url,
                Err(e) => return Err(tracker.fail(e)),
            }
        } else {
            valid.resume.clone()
        };

        // Persisting
        tracker.advance(SubmissionState::Persisting)?;
        let company_id = job.owning_company();
        let application = create_application(
            self.applications.as_ref(),
            &valid.with_resume(resume).into_form(),
            job_id,
            company_id,
            user_id,
        )
        .await?;

        let mut deferred_writes = 0;

        // Notifying
        tracker.advance(SubmissionState::Notifying)?;
        if let Err(e) = self.candidates.create(application.id, company_id).await {
            error!("Candidate record for {} failed: {e}", application.id);
            let write = DependentWrite::CreateCandidate {
                application_id: application.id,
                company_id,
            };
            if defer(self.outbox.as_ref(), write).await {
                deferred_writes += 1;
            }
        }

        // Incrementing
        tracker.advance(SubmissionState::Incrementing)?;
        let applied = match self.jobs.increment_applied(job_id).await {
            Ok(applied) => {
                if applied > job.capacity {
                    info!("Job {job_id} has {applied} applicants for {} openings", job.capacity);
                }
                Some(applied)
            }
            Err(e) => {
                error!("Applicant count for job {job_id} failed: {e}");
                if defer(self.outbox.as_ref(), DependentWrite::IncrementApplied { job_id }).await {
                    deferred_writes += 1;
                }
                None
            }
        };

        tracker.advance(SubmissionState::Complete)?;
        info!(
            "Submission complete: application {} for job {job_id}",
            application.id
        );

        Ok(SubmissionOutcome {
            application,
            redirect_to: DASHBOARD_PATH,
            applied,
            deferred_writes,
            trail: tracker.trail().to_vec(),
        })
    }
}
