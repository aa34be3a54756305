//! Application state and authentication middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use yatube_common::ErrorDetails;
use yatube_core::{
    CommentService, FeedService, FollowService, GroupService, PostService, ProfileService,
    UserService,
};

use crate::response::Template;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub group_service: GroupService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub feed_service: FeedService,
    pub profile_service: ProfileService,
    /// Where guests are sent to log in.
    pub login_url: String,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Unknown tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unusable bearer token");
            }
        }
    }

    next.run(req).await
}

#[derive(Serialize)]
struct NotFoundContext {
    path: String,
    error: ErrorDetails,
}

/// Render every not-found error as `misc/404.html` with the requested path.
///
/// Unknown routes and unknown users, posts or groups end up with the same
/// page context.
pub async fn not_found_page(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if response.status() != StatusCode::NOT_FOUND {
        return response;
    }
    let Some(error) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    Template::new("misc/404.html", NotFoundContext { path, error })
        .with_status(StatusCode::NOT_FOUND)
        .into_response()
}
