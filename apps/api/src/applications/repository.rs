//! Application persistence.
//!
//! `ApplicationStore` is the data-store seam; `PgApplicationStore` is the
//! production backend. The free functions below carry the repository rules
//! (server-side re-validation, pagination policy, paired deletes) so every
//! backend gets the same behaviour.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::applications::candidates::CandidateStore;
use crate::applications::validation::{is_valid_email, ApplicationForm};
use crate::errors::{AppError, FieldErrors};
use crate::models::application::{ApplicationRow, Stage};

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Rows to skip. Never negative, even for `page <= 0`.
    pub fn skip(&self) -> i64 {
        self.limit
            .saturating_mul(self.page.saturating_sub(1))
            .max(0)
    }

    /// Page size actually applied: non-positive limits fall back to 10.
    pub fn effective_limit(&self) -> i64 {
        if self.limit > 0 {
            self.limit
        } else {
            Self::DEFAULT_LIMIT
        }
    }

    pub fn total_pages(&self, count: i64) -> i64 {
        let limit = self.effective_limit();
        let count = count.max(0);
        count / limit + i64::from(count % limit != 0)
    }
}

/// `?page=&limit=` query parameters shared by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    Pagination::DEFAULT_LIMIT
}

impl From<PageQuery> for Pagination {
    fn from(q: PageQuery) -> Self {
        Pagination::new(q.page, q.limit)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

/// Values for a new application row. The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub company_id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub nationality: String,
    pub coverletter: String,
    pub resume: String,
    pub score: f64,
    pub stage: Stage,
}

/// The closed set of fields a partial update may touch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nationality: Option<String>,
    pub coverletter: Option<String>,
    pub resume: Option<String>,
    pub score: Option<f64>,
    pub stage: Option<Stage>,
}

impl ApplicationUpdate {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.nationality.is_none()
            && self.coverletter.is_none()
            && self.resume.is_none()
            && self.score.is_none()
            && self.stage.is_none()
    }

    /// Supplied text fields follow the form schema: non-empty, valid email.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let text_fields: [(&'static str, &Option<String>); 7] = [
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("email", &self.email),
            ("phone", &self.phone),
            ("nationality", &self.nationality),
            ("coverletter", &self.coverletter),
            ("resume", &self.resume),
        ];
        for (field, value) in text_fields {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    errors.push(field, format!("{field} must not be empty"));
                }
            }
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !is_valid_email(&email.trim().to_lowercase()) {
                errors.push("email", "email must be a valid address");
            }
        }
        if let Some(score) = self.score {
            if !score.is_finite() {
                errors.push("score", "score must be a finite number");
            }
        }
        errors.into_result(())
    }

    /// Applies the supplied fields to an in-memory row.
    pub fn apply_to(&self, row: &mut ApplicationRow) {
        let assign = |target: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *target = v.trim().to_string();
            }
        };
        assign(&mut row.firstname, &self.firstname);
        assign(&mut row.lastname, &self.lastname);
        assign(&mut row.email, &self.email);
        assign(&mut row.phone, &self.phone);
        assign(&mut row.nationality, &self.nationality);
        assign(&mut row.coverletter, &self.coverletter);
        assign(&mut row.resume, &self.resume);
        if let Some(email) = &self.email {
            row.email = email.trim().to_lowercase();
        }
        if let Some(score) = self.score {
            row.score = score;
        }
        if let Some(stage) = self.stage {
            row.stage = stage.as_str().to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPage {
    pub applications: Vec<ApplicationRow>,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub applications_deleted: u64,
    pub candidates_deleted: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Store trait
// ────────────────────────────────────────────────────────────────────────────

/// Data-store operations on application rows.
///
/// Carried in `AppState` as `Arc<dyn ApplicationStore>`.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert(&self, application: NewApplication) -> Result<ApplicationRow, AppError>;

    /// Rows for `user_id` in insertion order, windowed by `skip`/`limit`.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError>;

    async fn find_by_company(
        &self,
        company_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError>;

    /// Size of the whole collection, unfiltered.
    async fn count_all(&self) -> Result<i64, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ApplicationRow>, AppError>;

    async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<u64, AppError>;

    /// Updates the first row matching `(user_id, job_id)`. Returns rows touched.
    async fn update_by_user_and_job(
        &self,
        update: &ApplicationUpdate,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<u64, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Repository operations
// ────────────────────────────────────────────────────────────────────────────

/// Re-validates the form server-side, then inserts with score 0.0 and stage
/// "in review".
pub async fn create_application(
    store: &dyn ApplicationStore,
    form: &ApplicationForm,
    job_id: Uuid,
    company_id: Uuid,
    user_id: Uuid,
) -> Result<ApplicationRow, AppError> {
    let valid = form.validate(false)?;

    let row = store
        .insert(NewApplication {
            user_id,
            job_id,
            company_id,
            firstname: valid.firstname,
            lastname: valid.lastname,
            email: valid.email,
            phone: valid.phone,
            nationality: valid.nationality,
            coverletter: valid.coverletter,
            resume: valid.resume,
            score: 0.0,
            stage: Stage::InReview,
        })
        .await?;

    info!(
        "Created application {} for job {job_id} (user {user_id}, company {company_id})",
        row.id
    );
    Ok(row)
}

/// Page of a user's applications.
///
/// `total_pages` is derived from the size of the whole collection, not the
/// user's subset.
pub async fn list_by_user(
    store: &dyn ApplicationStore,
    user_id: Uuid,
    page: Pagination,
) -> Result<ApplicationPage, AppError> {
    let applications = store
        .find_by_user(user_id, page.skip(), page.effective_limit())
        .await?;
    let total = store.count_all().await?;
    Ok(ApplicationPage {
        applications,
        total_pages: page.total_pages(total),
    })
}

/// Page of a company's applicants. Same pagination approximation as
/// [`list_by_user`].
pub async fn list_by_company(
    store: &dyn ApplicationStore,
    company_id: Uuid,
    page: Pagination,
) -> Result<ApplicationPage, AppError> {
    let applications = store
        .find_by_company(company_id, page.skip(), page.effective_limit())
        .await?;
    let total = store.count_all().await?;
    Ok(ApplicationPage {
        applications,
        total_pages: page.total_pages(total),
    })
}

pub async fn get_by_id(store: &dyn ApplicationStore, id: Uuid) -> Result<ApplicationRow, AppError> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// Deletes the applications, then their candidate records. Two separate
/// deletes; the second still runs when the first matched nothing.
pub async fn delete_many(
    applications: &dyn ApplicationStore,
    candidates: &dyn CandidateStore,
    ids: &[Uuid],
) -> Result<DeleteReport, AppError> {
    if ids.is_empty() {
        return Ok(DeleteReport {
            applications_deleted: 0,
            candidates_deleted: 0,
        });
    }

    let applications_deleted = applications.delete_by_ids(ids).await?;
    let candidates_deleted = candidates.delete_many(ids).await?;

    info!(
        "Deleted {applications_deleted} applications and {candidates_deleted} candidate records"
    );
    Ok(DeleteReport {
        applications_deleted,
        candidates_deleted,
    })
}

/// Partial update of the application for `(user_id, job_id)`. Matching
/// nothing is not an error.
pub async fn update_by_user_and_job(
    store: &dyn ApplicationStore,
    update: &ApplicationUpdate,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<u64, AppError> {
    update.validate()?;
    if update.is_empty() {
        return Ok(0);
    }
    store.update_by_user_and_job(update, user_id, job_id).await
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn insert(&self, a: NewApplication) -> Result<ApplicationRow, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (id, user_id, job_id, company_id, firstname, lastname, email, phone,
                 nationality, coverletter, resume, score, stage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(a.user_id)
        .bind(a.job_id)
        .bind(a.company_id)
        .bind(&a.firstname)
        .bind(&a.lastname)
        .bind(&a.email)
        .bind(&a.phone)
        .bind(&a.nationality)
        .bind(&a.coverletter)
        .bind(&a.resume)
        .bind(a.score)
        .bind(a.stage.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        Ok(sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at, id OFFSET $2 LIMIT $3",
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_by_company(
        &self,
        company_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        Ok(sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE company_id = $1 ORDER BY created_at, id OFFSET $2 LIMIT $3",
        )
        .bind(company_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ApplicationRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_by_user_and_job(
        &self,
        update: &ApplicationUpdate,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<u64, AppError> {
        let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).map(String::from);
        let result = sqlx::query(
            r#"
            UPDATE applications SET
                firstname   = COALESCE($1, firstname),
                lastname    = COALESCE($2, lastname),
                email       = COALESCE($3, email),
                phone       = COALESCE($4, phone),
                nationality = COALESCE($5, nationality),
                coverletter = COALESCE($6, coverletter),
                resume      = COALESCE($7, resume),
                score       = COALESCE($8, score),
                stage       = COALESCE($9, stage)
            WHERE id = (
                SELECT id FROM applications
                WHERE user_id = $10 AND job_id = $11
                ORDER BY created_at, id
                LIMIT 1
            )
            "#,
        )
        .bind(trimmed(&update.firstname))
        .bind(trimmed(&update.lastname))
        .bind(update.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(trimmed(&update.phone))
        .bind(trimmed(&update.nationality))
        .bind(trimmed(&update.coverletter))
        .bind(trimmed(&update.resume))
        .bind(update.score)
        .bind(update.stage.map(|s| s.as_str()))
        .bind(user_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
