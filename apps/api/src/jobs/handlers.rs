use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::repository::{PageQuery, Pagination};
use crate::errors::{AppError, FieldErrors};
use crate::jobs::filters::{
    job_facets, page_window, sort_salary_ranges, JobFacets, PageWindow, SalaryOrder,
};
use crate::jobs::posting::{post_job, JobDraft};
use crate::jobs::store::JobStore;
use crate::models::job::JobRow;
use crate::state::AppState;

const PAGER_WIDTH: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub sort: Option<SalaryOrder>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRow>,
    pub total_pages: i64,
    pub pager: PageWindow,
    pub facets: JobFacets,
}

#[derive(Debug, Deserialize)]
pub struct SetAppliedRequest {
    pub applied: i32,
}

/// POST /api/v1/jobs
pub async fn handle_post_job(
    State(state): State<AppState>,
    Json(draft): Json<JobDraft>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let job = post_job(state.jobs.as_ref(), &draft).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs?page=&limit=&sort=
///
/// Facets cover every posted job. With `sort`, the whole listing is ordered
/// by salary before the page is cut out of it.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(sort): Query<SortQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let pagination = Pagination::from(page);
    let all = state.jobs.list_all().await?;
    let facets = job_facets(&all);
    let total_pages = pagination.total_pages(all.len() as i64);

    let jobs = match sort.sort {
        Some(order) => {
            let mut sorted = all;
            sort_salary_ranges(&mut sorted, order);
            sorted
                .into_iter()
                .skip(usize::try_from(pagination.skip()).unwrap_or(usize::MAX))
                .take(usize::try_from(pagination.effective_limit()).unwrap_or(usize::MAX))
                .collect()
        }
        None => {
            state
                .jobs
                .list(pagination.skip(), pagination.effective_limit())
                .await?
        }
    };

    Ok(Json(JobListResponse {
        jobs,
        total_pages,
        pager: page_window(pagination.page, total_pages, PAGER_WIDTH),
        facets,
    }))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    let job = state
        .jobs
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(job))
}

/// PUT /api/v1/jobs/:job_id/applied
///
/// Manual correction of the applicant count. Submissions never use this.
pub async fn handle_set_applied(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<SetAppliedRequest>,
) -> Result<StatusCode, AppError> {
    if req.applied < 0 {
        let mut errors = FieldErrors::new();
        errors.push("applied", "applied must not be negative");
        return Err(errors.into());
    }
    state.jobs.set_applied(job_id, req.applied).await?;
    Ok(StatusCode::NO_CONTENT)
}
