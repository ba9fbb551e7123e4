use std::sync::Arc;

use crate::analytics::pageviews::PageViewStore;
use crate::applications::candidates::CandidateStore;
use crate::applications::outbox::Outbox;
use crate::applications::repository::ApplicationStore;
use crate::config::Config;
use crate::jobs::store::JobStore;
use crate::uploads::AssetUploader;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every backend is a trait object so tests can swap in in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub applications: Arc<dyn ApplicationStore>,
    pub candidates: Arc<dyn CandidateStore>,
    pub jobs: Arc<dyn JobStore>,
    pub page_views: Arc<dyn PageViewStore>,
    pub uploader: Arc<dyn AssetUploader>,
    /// Retry queue for writes that follow an application insert.
    pub outbox: Arc<dyn Outbox>,
    pub config: Config,
}
