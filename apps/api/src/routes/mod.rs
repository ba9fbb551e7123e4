pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::analytics::handlers as analytics;
use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Room for the text fields and multipart framing around the resume files.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_resume_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_post_job),
        )
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        .route(
            "/api/v1/jobs/:job_id/applied",
            put(jobs::handle_set_applied),
        )
        .route(
            "/api/v1/jobs/:job_id/applications",
            post(applications::handle_submit),
        )
        // Applications
        .route(
            "/api/v1/applications",
            get(applications::handle_list_for_user)
                .patch(applications::handle_update_application)
                .delete(applications::handle_delete_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application),
        )
        // Company dashboard
        .route(
            "/api/v1/companies/:company_id/applicants",
            get(applications::handle_list_applicants),
        )
        .route(
            "/api/v1/companies/:company_id/candidates/unseen",
            get(applications::handle_unseen_count),
        )
        .route(
            "/api/v1/candidates/:application_id",
            delete(applications::handle_dismiss_candidate),
        )
        .route(
            "/api/v1/companies/:company_id/views",
            get(analytics::handle_page_views).post(analytics::handle_record_view),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
