//! Post pages: create, view, edit, delete and comment.

use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use yatube_common::{AppError, AppResult, FormErrors};
use yatube_core::{CommentForm, GroupRef, PostDetailView, PostForm};
use yatube_db::entities::post;

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PostFormInput},
    middleware::AppState,
    response::{Template, post_url, redirect},
};

/// Values echoed back into the post form.
#[derive(Debug, Default, Serialize)]
struct FormValues {
    text: String,
    group: Option<String>,
}

impl From<&PostForm> for FormValues {
    fn from(form: &PostForm) -> Self {
        Self {
            text: form.text.clone(),
            group: form.group.clone(),
        }
    }
}

impl From<&post::Model> for FormValues {
    fn from(post: &post::Model) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.clone(),
        }
    }
}

#[derive(Serialize)]
struct PostFormContext {
    form: FormValues,
    errors: FormErrors,
    groups: Vec<GroupRef>,
    /// The post being edited; absent on the new post page.
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<post::Model>,
    is_edit: bool,
}

async fn form_page(
    state: &AppState,
    form: FormValues,
    errors: FormErrors,
    post: Option<post::Model>,
) -> AppResult<Response> {
    let groups = state
        .group_service
        .list()
        .await?
        .iter()
        .map(GroupRef::from)
        .collect();

    Ok(Template::new(
        "new.html",
        PostFormContext {
            form,
            errors,
            groups,
            is_edit: post.is_some(),
            post,
        },
    )
    .into_response())
}

/// Empty new post form.
async fn new_post_form(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    form_page(&state, FormValues::default(), FormErrors::new(), None).await
}

/// Publish a post, then go to the global feed.
async fn new_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    PostFormInput(form): PostFormInput,
) -> AppResult<Response> {
    match state.post_service.create_post(&user, &form).await {
        Ok(_) => Ok(redirect("/")),
        Err(AppError::Validation(errors)) => {
            form_page(&state, FormValues::from(&form), errors, None).await
        }
        Err(e) => Err(e),
    }
}

/// A post with its comments.
async fn post_view(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Template<PostDetailView>> {
    let view = state
        .profile_service
        .post_detail(viewer.as_ref(), &username, &post_id)
        .await?;
    Ok(Template::new("post.html", view))
}

/// Edit form, prefilled. Anyone but the author is sent back to the post.
async fn post_edit_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Response> {
    match state
        .post_service
        .get_for_edit(&user, &username, &post_id)
        .await
    {
        Ok(post) => form_page(&state, FormValues::from(&post), FormErrors::new(), Some(post)).await,
        Err(AppError::Forbidden(_)) => Ok(redirect(&post_url(&username, &post_id))),
        Err(e) => Err(e),
    }
}

/// Save an edited post, then go to it.
async fn post_edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    PostFormInput(form): PostFormInput,
) -> AppResult<Response> {
    match state
        .post_service
        .edit_post(&user, &username, &post_id, &form)
        .await
    {
        Ok(_) => Ok(redirect(&post_url(&username, &post_id))),
        Err(AppError::Forbidden(_)) => Ok(redirect(&post_url(&username, &post_id))),
        Err(AppError::Validation(errors)) => {
            let post = state.post_service.get_by_author(&username, &post_id).await?;
            form_page(&state, FormValues::from(&form), errors, Some(post)).await
        }
        Err(e) => Err(e),
    }
}

/// Delete a post, then go to the global feed.
async fn post_delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Response> {
    match state
        .post_service
        .delete_post(&user, &username, &post_id)
        .await
    {
        Ok(()) => Ok(redirect("/")),
        Err(AppError::Forbidden(_)) => Ok(redirect(&post_url(&username, &post_id))),
        Err(e) => Err(e),
    }
}

/// Comment on a post. Valid or not, the actor lands back on the post.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> AppResult<Response> {
    let form = form.map(|Form(form)| form).unwrap_or_default();

    match state
        .comment_service
        .add_comment(&user, &username, &post_id, &form)
        .await
    {
        Ok(_) => {}
        Err(AppError::Validation(errors)) => {
            tracing::debug!(%errors, post_id = %post_id, "Rejected comment");
        }
        Err(e) => return Err(e),
    }
    Ok(redirect(&post_url(&username, &post_id)))
}

/// There is no comment page; a GET just goes back to the post.
async fn comment_page(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> AppResult<Response> {
    state.post_service.get_by_author(&username, &post_id).await?;
    Ok(redirect(&post_url(&username, &post_id)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new/", get(new_post_form).post(new_post))
        .route("/{username}/{post_id}/", get(post_view))
        .route(
            "/{username}/{post_id}/edit/",
            get(post_edit_form).post(post_edit),
        )
        .route(
            "/{username}/{post_id}/delete/",
            get(post_delete).post(post_delete),
        )
        .route(
            "/{username}/{post_id}/comment/",
            get(comment_page).post(add_comment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_values_from_post_form() {
        let form = PostForm::with_text("draft").in_group("g1");
        let values = FormValues::from(&form);

        assert_eq!(values.text, "draft");
        assert_eq!(values.group.as_deref(), Some("g1"));
    }

    #[test]
    fn test_form_context_hides_missing_post() {
        let context = PostFormContext {
            form: FormValues::default(),
            errors: FormErrors::new(),
            groups: Vec::new(),
            post: None,
            is_edit: false,
        };
        let value = serde_json::to_value(&context).unwrap();

        assert!(value.get("post").is_none());
        assert_eq!(value["is_edit"], false);
        assert_eq!(value["errors"], serde_json::json!({}));
    }
}
