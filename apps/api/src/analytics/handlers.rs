use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::analytics::pageviews::{increment_page_view, weekly_page_views};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PageViewsResponse {
    pub company_id: Uuid,
    pub views: i64,
    pub window_days: i64,
}

/// POST /api/v1/companies/:company_id/views
pub async fn handle_record_view(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    increment_page_view(state.page_views.as_ref(), company_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/companies/:company_id/views
pub async fn handle_page_views(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Json<PageViewsResponse> {
    let window_days = state.config.page_view_window_days;
    let views =
        weekly_page_views(state.page_views.as_ref(), company_id, Utc::now(), window_days).await;
    Json(PageViewsResponse {
        company_id,
        views,
        window_days,
    })
}
