//! Request extractors.

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use yatube_common::AppError;
use yatube_core::{ImageChange, ImageUpload, PostForm};
use yatube_db::entities::user;

use crate::middleware::AppState;
use crate::response::{login_redirect_url, redirect};

/// Authenticated user extractor.
///
/// Guests are redirected to the login page, which sends them back here.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Rejection for [`AuthUser`]: a redirect to the login page.
#[derive(Debug)]
pub struct LoginRequired {
    location: String,
}

impl IntoResponse for LoginRequired {
    fn into_response(self) -> Response {
        redirect(&self.location)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = LoginRequired;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware.
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        tracing::debug!(next, "Guest sent to login");
        Err(LoginRequired {
            location: login_redirect_url(&state.login_url, next),
        })
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// Post form fields as sent by a plain url-encoded form.
#[derive(Debug, Default, Deserialize)]
struct PostFields {
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default, rename = "image-clear")]
    image_clear: Option<String>,
}

fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1"))
}

/// A submitted post form, from `multipart/form-data` (with an optional
/// `image` file) or `application/x-www-form-urlencoded`.
#[derive(Debug)]
pub struct PostFormInput(pub PostForm);

impl<S> FromRequest<S> for PostFormInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await.map(Self);
        }

        let Form(fields) = Form::<PostFields>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Ok(Self(PostForm {
            text: fields.text,
            group: fields.group,
            image: if checkbox(fields.image_clear.as_deref()) {
                ImageChange::Clear
            } else {
                ImageChange::Keep
            },
        }))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();
    let mut upload = None;
    let mut clear = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => {
                form.text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            "group" => {
                form.group = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?,
                );
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !(filename.is_empty() && data.is_empty()) {
                    upload = Some(ImageUpload {
                        filename,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            "image-clear" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                clear = checkbox(Some(value.as_str()));
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    // A new upload wins over the clear checkbox.
    form.image = match upload {
        Some(upload) => ImageChange::Replace(upload),
        None if clear => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    Ok(form)
}
