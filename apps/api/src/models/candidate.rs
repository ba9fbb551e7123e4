use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Marks an application the company has not reviewed yet.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewCandidateRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
}
