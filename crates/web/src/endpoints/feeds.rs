//! Feed pages: global, group and follow.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::get,
};
use serde::Serialize;
use yatube_common::AppResult;
use yatube_core::{GroupFeed, Page, PostCard};

use super::PageQuery;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Template, render_json, rendered},
};

#[derive(Serialize)]
struct IndexContext {
    page: Page<PostCard>,
    index: bool,
}

#[derive(Serialize)]
struct FollowContext {
    page: Page<PostCard>,
    follow: bool,
}

/// Global feed. Served from the feed cache.
async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Response> {
    let body = state
        .feed_service
        .cached_index(query.page.as_deref(), |page| {
            render_json("index.html", &IndexContext { page, index: true })
        })
        .await?;
    Ok(rendered(body))
}

/// Posts filed under a group.
async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Template<GroupFeed>> {
    let feed = state
        .feed_service
        .group_feed(&slug, query.page.as_deref())
        .await?;
    Ok(Template::new("group.html", feed))
}

/// Posts by the authors the viewer follows.
async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Template<FollowContext>> {
    let page = state
        .follow_service
        .following_feed(&user, query.page.as_deref())
        .await?;
    Ok(Template::new("follow.html", FollowContext { page, follow: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/follow/", get(follow_index))
}
