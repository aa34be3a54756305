//! Profile pages and follow actions.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::get,
};
use yatube_common::AppResult;
use yatube_core::ProfileView;

use super::PageQuery;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Template, profile_url, redirect},
};

/// A user's posts and follow counts.
async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Template<ProfileView>> {
    let view = state
        .profile_service
        .profile(viewer.as_ref(), &username, query.page.as_deref())
        .await?;
    Ok(Template::new("profile.html", view))
}

/// Follow an author, then go to their profile.
async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let outcome = state.follow_service.follow(&user, &username).await?;
    tracing::debug!(?outcome, author = %username, "Follow request handled");
    Ok(redirect(&profile_url(&username)))
}

/// Unfollow an author, then go to their profile.
async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    state.follow_service.unfollow(&user, &username).await?;
    Ok(redirect(&profile_url(&username)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{username}/", get(profile))
        .route(
            "/{username}/follow/",
            get(profile_follow).post(profile_follow),
        )
        .route(
            "/{username}/unfollow/",
            get(profile_unfollow).post(profile_unfollow),
        )
}
