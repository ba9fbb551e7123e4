use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One candidate's submission to one job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
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
    pub stage: String,
    pub created_at: DateTime<Utc>,
}

/// Review stage of an application. Stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "in review")]
    InReview,
    #[serde(rename = "shortlisted")]
    Shortlisted,
    #[serde(rename = "interview")]
    Interview,
    #[serde(rename = "hired")]
    Hired,
    #[serde(rename = "declined")]
    Declined,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::InReview => "in review",
            Stage::Shortlisted => "shortlisted",
            Stage::Interview => "interview",
            Stage::Hired => "hired",
            Stage::Declined => "declined",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in review" => Ok(Stage::InReview),
            "shortlisted" => Ok(Stage::Shortlisted),
            "interview" => Ok(Stage::Interview),
            "hired" => Ok(Stage::Hired),
            "declined" => Ok(Stage::Declined),
            other => Err(format!("unknown stage '{other}'")),
        }
    }
}
