use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::candidates::CandidateStore;
use crate::applications::repository::{
    self, ApplicationPage, ApplicationUpdate, DeleteReport, PageQuery, Pagination,
};
use crate::applications::submission::{SubmissionOutcome, SubmissionPipeline, SubmissionRequest};
use crate::applications::validation::ApplicationForm;
use crate::errors::AppError;
use crate::jobs::filters::{page_window, PageWindow};
use crate::models::application::ApplicationRow;
use crate::state::AppState;
use crate::uploads::UploadFile;

/// Multipart part name for resume files.
pub const RESUME_FILE_FIELD: &str = "resume_file";

const PAGER_WIDTH: i64 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationRow>,
    pub total_pages: i64,
    pub pager: PageWindow,
}

impl ApplicationListResponse {
    fn new(page: ApplicationPage, pagination: Pagination) -> Self {
        let pager = page_window(pagination.page, page.total_pages, PAGER_WIDTH);
        Self {
            applications: page.applications,
            total_pages: page.total_pages,
            pager,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub fields: ApplicationUpdate,
}

#[derive(Debug, Serialize)]
pub struct UpdateApplicationResponse {
    pub matched: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationRef {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DeleteApplicationsRequest {
    pub applications: Vec<ApplicationRef>,
    /// Dashboard path whose cached list should be refreshed.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteApplicationsResponse {
    #[serde(flatten)]
    pub report: DeleteReport,
    pub revalidate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnseenCountResponse {
    pub company_id: Uuid,
    pub unseen: i64,
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart
// ────────────────────────────────────────────────────────────────────────────

struct SubmissionParts {
    user_id: Uuid,
    form: ApplicationForm,
    attachments: Vec<UploadFile>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart body: {e}"))
}

async fn read_submission(multipart: &mut Multipart) -> Result<SubmissionParts, AppError> {
    let mut user_id = None;
    let mut form = ApplicationForm::default();
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == RESUME_FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(String::from);
            let data = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            attachments.push(UploadFile {
                file_name,
                content_type,
                data,
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "user_id" => {
                let parsed = value
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::BadRequest("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            "firstname" => form.firstname = value,
            "lastname" => form.lastname = value,
            "email" => form.email = value,
            "phone" => form.phone = value,
            "nationality" => form.nationality = value,
            "coverletter" => form.coverletter = value,
            "resume" => form.resume = value,
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;
    Ok(SubmissionParts {
        user_id,
        form,
        attachments,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:job_id/applications
///
/// Multipart form: the application fields, `user_id`, and zero or more
/// `resume_file` parts.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionOutcome>), AppError> {
    let parts = read_submission(&mut multipart).await?;

    let outcome = SubmissionPipeline::from_state(&state)
        .submit(SubmissionRequest {
            job_id,
            user_id: parts.user_id,
            form: parts.form,
            attachments: parts.attachments,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/v1/applications?user_id=&page=&limit=
pub async fn handle_list_for_user(
    State(state): State<AppState>,
    Query(user): Query<UserIdQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let pagination = Pagination::from(page);
    let result =
        repository::list_by_user(state.applications.as_ref(), user.user_id, pagination).await?;
    Ok(Json(ApplicationListResponse::new(result, pagination)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRow>, AppError> {
    Ok(Json(
        repository::get_by_id(state.applications.as_ref(), id).await?,
    ))
}

/// PATCH /api/v1/applications
pub async fn handle_update_application(
    State(state): State<AppState>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<UpdateApplicationResponse>, AppError> {
    let matched = repository::update_by_user_and_job(
        state.applications.as_ref(),
        &req.fields,
        req.user_id,
        req.job_id,
    )
    .await?;
    Ok(Json(UpdateApplicationResponse { matched }))
}

/// DELETE /api/v1/applications
pub async fn handle_delete_applications(
    State(state): State<AppState>,
    Json(req): Json<DeleteApplicationsRequest>,
) -> Result<Json<DeleteApplicationsResponse>, AppError> {
    let ids: Vec<Uuid> = req.applications.iter().map(|a| a.id).collect();
    let report =
        repository::delete_many(state.applications.as_ref(), state.candidates.as_ref(), &ids)
            .await?;
    Ok(Json(DeleteApplicationsResponse {
        report,
        revalidate: req.path,
    }))
}

/// GET /api/v1/companies/:company_id/applicants?page=&limit=
pub async fn handle_list_applicants(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let pagination = Pagination::from(page);
    let result =
        repository::list_by_company(state.applications.as_ref(), company_id, pagination).await?;
    Ok(Json(ApplicationListResponse::new(result, pagination)))
}

/// GET /api/v1/companies/:company_id/candidates/unseen
pub async fn handle_unseen_count(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<UnseenCountResponse>, AppError> {
    let unseen = state.candidates.count_unseen(company_id).await?;
    Ok(Json(UnseenCountResponse { company_id, unseen }))
}

/// DELETE /api/v1/candidates/:application_id
///
/// The company has looked at the application; drop its "new" marker.
pub async fn handle_dismiss_candidate(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.candidates.delete(application_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
