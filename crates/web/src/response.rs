//! Page responses.
//!
//! A page is a JSON document `{ "template": ..., "context": ... }` for the
//! rendering collaborator.

use std::sync::Arc;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use yatube_common::{AppError, AppResult};

#[derive(Serialize)]
struct TemplateDoc<'a, C: Serialize> {
    template: &'a str,
    context: &'a C,
}

/// Serialize a template document.
pub fn render_json<C: Serialize>(template: &str, context: &C) -> AppResult<String> {
    serde_json::to_string(&TemplateDoc { template, context })
        .map_err(|e| AppError::Internal(format!("Failed to render {template}: {e}")))
}

/// A template plus the context to render it with.
#[derive(Debug)]
pub struct Template<C: Serialize> {
    name: &'static str,
    context: C,
    status: StatusCode,
}

impl<C: Serialize> Template<C> {
    /// Render `name` with `context`.
    pub const fn new(name: &'static str, context: C) -> Self {
        Self {
            name,
            context,
            status: StatusCode::OK,
        }
    }

    /// Answer with a status other than 200.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<C: Serialize> IntoResponse for Template<C> {
    fn into_response(self) -> Response {
        match render_json(self.name, &self.context) {
            Ok(body) => (self.status, json_header(), body).into_response(),
            Err(err) => err.into_response(),
        }
    }
}

const fn json_header() -> [(header::HeaderName, &'static str); 1] {
    [(header::CONTENT_TYPE, "application/json")]
}

/// An already rendered template document.
pub fn rendered(body: Arc<str>) -> Response {
    (StatusCode::OK, json_header(), body.to_string()).into_response()
}

/// 303 redirect.
pub fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

/// URL of a profile page.
#[must_use]
pub fn profile_url(username: &str) -> String {
    format!("/{}/", urlencoding::encode(username))
}

/// URL of a post detail page.
#[must_use]
pub fn post_url(username: &str, post_id: &str) -> String {
    format!(
        "/{}/{}/",
        urlencoding::encode(username),
        urlencoding::encode(post_id)
    )
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_redirect_url(login_url: &str, next: &str) -> String {
    // Slashes stay readable in the query.
    let next = urlencoding::encode(next).replace("%2F", "/");
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}next={next}")
}
