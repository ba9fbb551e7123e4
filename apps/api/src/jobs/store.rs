use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobRow;

/// Values for a new job row. `applied` always starts at zero.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub company_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub category_icon: String,
    pub job_type: String,
    pub location: String,
    pub level: String,
    pub salary: String,
    pub company: String,
    pub company_logo: String,
    pub capacity: i32,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: NewJob) -> Result<JobRow, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRow>, AppError>;

    /// Jobs in posting order, windowed by `skip`/`limit`.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<JobRow>, AppError>;

    async fn list_all(&self) -> Result<Vec<JobRow>, AppError>;

    /// Atomically adds one applicant and returns the new count.
    async fn increment_applied(&self, id: Uuid) -> Result<i32, AppError>;

    /// Overwrites the applicant count. Last write wins.
    async fn set_applied(&self, id: Uuid, applied: i32) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: NewJob) -> Result<JobRow, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (id, company_id, title, description, category, category_icon, job_type,
                 location, level, salary, company, company_logo, capacity, applied)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.company_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.category)
        .bind(&job.category_icon)
        .bind(&job.job_type)
        .bind(&job.location)
        .bind(&job.level)
        .bind(&job.salary)
        .bind(&job.company)
        .bind(&job.company_logo)
        .bind(job.capacity)
        .fetch_one(&self.pool)
        .await?;

        info!("Posted job {} ({})", row.id, row.title);
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<JobRow>, AppError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs ORDER BY created_at, id OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_all(&self) -> Result<Vec<JobRow>, AppError> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn increment_applied(&self, id: Uuid) -> Result<i32, AppError> {
        let applied: Option<i32> = sqlx::query_scalar(
            "UPDATE jobs SET applied = applied + 1 WHERE id = $1 RETURNING applied",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        applied.ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }

    async fn set_applied(&self, id: Uuid, applied: i32) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE jobs SET applied = $1 WHERE id = $2")
            .bind(applied)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {id} not found")));
        }
        Ok(())
    }
}
