//! Static pages and the not-found page.

use axum::{Router, http::Uri, routing::get};
use serde_json::json;
use yatube_common::AppError;

use crate::{middleware::AppState, response::Template};

async fn author() -> Template<serde_json::Value> {
    Template::new("about/author.html", json!({}))
}

async fn tech() -> Template<serde_json::Value> {
    Template::new("about/tech.html", json!({}))
}

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(path = %uri.path(), "No route");
    AppError::NotFound(uri.path().to_string())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/about/author/", get(author))
        .route("/about/tech/", get(tech))
}
