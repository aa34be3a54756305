//! Page endpoints.

mod about;
mod feeds;
mod posts;
mod profiles;

use axum::Router;
use serde::Deserialize;

use crate::middleware::AppState;

/// `?page=` on paged views. Kept raw; the paginator decides what it means.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Raw page number.
    pub page: Option<String>,
}

/// Create the page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(feeds::router())
        .merge(about::router())
        .merge(posts::router())
        .merge(profiles::router())
        .fallback(about::not_found)
}
