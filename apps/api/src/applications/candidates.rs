//! "New candidate" records: one per application the company has not reviewed.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::NewCandidateRow;

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Plain insert. Callers create exactly one record per application.
    async fn create(&self, application_id: Uuid, company_id: Uuid)
        -> Result<NewCandidateRow, AppError>;

    async fn count_unseen(&self, company_id: Uuid) -> Result<i64, AppError>;

    /// Removes the record for `application_id`; succeeds when there is none.
    async fn delete(&self, application_id: Uuid) -> Result<(), AppError>;

    /// Removes every record whose application is in `application_ids`.
    async fn delete_many(&self, application_ids: &[Uuid]) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn create(
        &self,
        application_id: Uuid,
        company_id: Uuid,
    ) -> Result<NewCandidateRow, AppError> {
        let row = sqlx::query_as::<_, NewCandidateRow>(
            "INSERT INTO new_candidates (id, application_id, company_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(application_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        info!("Recorded new candidate for application {application_id} (company {company_id})");
        Ok(row)
    }

    async fn count_unseen(&self, company_id: Uuid) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM new_candidates WHERE company_id = $1")
                .bind(company_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn delete(&self, application_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM new_candidates WHERE application_id = $1")
            .bind(application_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_many(&self, application_ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM new_candidates WHERE application_id = ANY($1)")
            .bind(application_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
