use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub category_icon: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub location: String,
    pub level: String,
    /// Free text such as `$70,000 - $85,000`.
    pub salary: String,
    pub company: String,
    pub company_logo: String,
    pub capacity: i32,
    pub applied: i32,
    pub created_at: DateTime<Utc>,
}

impl JobRow {
    /// Company that owns applications to this job. Jobs posted without a
    /// company fall back to their own id.
    pub fn owning_company(&self) -> Uuid {
        self.company_id.unwrap_or(self.id)
    }
}
