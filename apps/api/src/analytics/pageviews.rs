//! Company page-view analytics.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

#[async_trait]
pub trait PageViewStore: Send + Sync {
    async fn record(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Views for `company_id` strictly newer than `since`.
    async fn count_since(&self, company_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError>;
}

#[derive(Clone)]
pub struct PgPageViewStore {
    pool: PgPool,
}

impl PgPageViewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageViewStore for PgPageViewStore {
    async fn record(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("INSERT INTO company_page_views (id, company_id, viewed_at) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_since(&self, company_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM company_page_views WHERE company_id = $1 AND viewed_at > $2",
        )
        .bind(company_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?)
    }
}

/// Start of the reporting window. The default of 8 days covers the full
/// previous week plus today.
pub fn window_start(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    now - Duration::days(window_days)
}

pub async fn increment_page_view(
    store: &dyn PageViewStore,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    store.record(company_id, now).await
}

/// Views inside the window. A store failure reads as zero views.
pub async fn weekly_page_views(
    store: &dyn PageViewStore,
    company_id: Uuid,
    now: DateTime<Utc>,
    window_days: i64,
) -> i64 {
    match store
        .count_since(company_id, window_start(now, window_days))
        .await
    {
        Ok(count) => count,
        Err(e) => {
            warn!("Page views for company {company_id} unavailable: {e}");
            0
        }
    }
}
