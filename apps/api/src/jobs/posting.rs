use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::jobs::store::{JobStore, NewJob};
use crate::models::job::JobRow;

/// A job as submitted from the company's post-job form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobDraft {
    pub company_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub category_icon: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub location: String,
    pub level: String,
    pub salary: String,
    pub company: String,
    pub company_logo: String,
    pub capacity: i32,
}

impl JobDraft {
    pub fn validate(&self) -> Result<NewJob, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut required = |field: &'static str, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                errors.push(field, format!("{field} is required"));
            }
            trimmed.to_string()
        };

        let title = required("title", &self.title);
        let description = required("description", &self.description);
        let category = required("category", &self.category);
        let job_type = required("type", &self.job_type);
        let location = required("location", &self.location);
        let level = required("level", &self.level);
        let salary = required("salary", &self.salary);
        let company = required("company", &self.company);

        if self.capacity < 1 {
            errors.push("capacity", "capacity must be at least 1");
        }

        errors.into_result(NewJob {
            company_id: self.company_id,
            title,
            description,
            category,
            category_icon: self.category_icon.trim().to_string(),
            job_type,
            location,
            level,
            salary,
            company,
            company_logo: self.company_logo.trim().to_string(),
            capacity: self.capacity,
        })
    }
}

pub async fn post_job(store: &dyn JobStore, draft: &JobDraft) -> Result<JobRow, AppError> {
    let job = draft.validate()?;
    store.insert(job).await
}
