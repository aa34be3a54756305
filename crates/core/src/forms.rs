//! Post and comment forms.
//!
//! Forms carry raw user input. `clean` turns one into either validated data
//! or a [`FormErrors`] set keyed by field name; nothing is persisted from a
//! form that failed to clean.

use std::borrow::Cow;
use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::Deserialize;
use validator::{Validate, ValidationError};
use yatube_common::{AppError, FormErrors};

const REQUIRED: &str = "This field is required.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::Borrowed(REQUIRED));
        return Err(err);
    }
    Ok(())
}

fn collect(result: Result<(), validator::ValidationErrors>) -> FormErrors {
    match result {
        Ok(()) => FormErrors::new(),
        Err(errors) => match AppError::from(errors) {
            AppError::Validation(fields) => fields,
            _ => FormErrors::new(),
        },
    }
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name.
    pub filename: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// An upload whose bytes were recognised as a supported raster image.
#[derive(Debug, Clone)]
pub struct ValidImage {
    /// Raw bytes.
    pub data: Vec<u8>,
    /// Canonical file extension for the detected format.
    pub extension: &'static str,
    /// MIME type for the detected format.
    pub content_type: &'static str,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageUpload {
    /// Sniff the bytes and read the image header.
    ///
    /// The declared content type and file name are ignored.
    pub fn verify(&self) -> Result<ValidImage, &'static str> {
        if self.data.is_empty() {
            return Err("The submitted file is empty.");
        }

        let format = image::guess_format(&self.data).map_err(|_| INVALID_IMAGE)?;
        if !matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
        ) {
            return Err(INVALID_IMAGE);
        }

        let (width, height) = ImageReader::with_format(Cursor::new(&self.data), format)
            .into_dimensions()
            .map_err(|_| INVALID_IMAGE)?;

        Ok(ValidImage {
            data: self.data.clone(),
            extension: format.extensions_str().first().copied().unwrap_or("bin"),
            content_type: format.to_mime_type(),
            width,
            height,
        })
    }
}

/// What to do with a post's image on submit.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    /// Leave the current image as it is.
    #[default]
    Keep,
    /// Remove the current image.
    Clear,
    /// Store a new image in place of the current one.
    Replace(ImageUpload),
}

/// Input for creating or editing a post.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostForm {
    /// Post body.
    #[validate(custom(function = "validate_not_blank"))]
    #[serde(default)]
    pub text: String,

    /// Group ID. Empty or absent means no group.
    #[serde(default)]
    pub group: Option<String>,

    /// Image action. Filled in from the multipart body.
    #[serde(skip)]
    pub image: ImageChange,
}

/// A post form that passed field-level validation.
#[derive(Debug, Clone)]
pub struct CleanedPost {
    /// Post body.
    pub text: String,
    /// Selected group ID, not yet checked against the database.
    pub group: Option<String>,
    /// Image action.
    pub image: CleanedImage,
}

/// Image action after the upload, if any, was verified.
#[derive(Debug, Clone)]
pub enum CleanedImage {
    /// Leave the current image as it is.
    Keep,
    /// Remove the current image.
    Clear,
    /// Store this image in place of the current one.
    Replace(ValidImage),
}

impl PostForm {
    /// Create a form with just a body.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// File the post under a group.
    #[must_use]
    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group = Some(group_id.into());
        self
    }

    /// Attach an image.
    #[must_use]
    pub fn with_image(mut self, upload: ImageUpload) -> Self {
        self.image = ImageChange::Replace(upload);
        self
    }

    /// Validate every field that can be checked without the database.
    pub fn clean(&self) -> Result<CleanedPost, FormErrors> {
        let mut errors = collect(self.validate());

        let image = match &self.image {
            ImageChange::Keep => CleanedImage::Keep,
            ImageChange::Clear => CleanedImage::Clear,
            ImageChange::Replace(upload) => match upload.verify() {
                Ok(image) => CleanedImage::Replace(image),
                Err(message) => {
                    errors.add("image", message);
                    CleanedImage::Keep
                }
            },
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedPost {
            text: self.text.clone(),
            group: self
                .group
                .as_deref()
                .map(str::trim)
                .filter(|group| !group.is_empty())
                .map(ToString::to_string),
            image,
        })
    }
}

/// Input for commenting on a post.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentForm {
    /// Comment body.
    #[validate(custom(function = "validate_not_blank"))]
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// Create a comment form.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Validate the comment body.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let errors = collect(self.validate());
        if errors.is_empty() {
            Ok(self.text.clone())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 2x1 GIF.
    pub(crate) const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    pub(crate) fn small_gif(name: &str) -> ImageUpload {
        ImageUpload {
            filename: name.to_string(),
            content_type: Some("image/gif".to_string()),
            data: SMALL_GIF.to_vec(),
        }
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let errors = PostForm::with_text("   \n").clean().unwrap_err();
        assert_eq!(errors.field("text"), &[REQUIRED.to_string()]);
    }

    #[test]
    fn test_empty_group_means_no_group() {
        let cleaned = PostForm::with_text("hello").in_group("").clean().unwrap();
        assert_eq!(cleaned.group, None);

        let cleaned = PostForm::with_text("hello").in_group("g1").clean().unwrap();
        assert_eq!(cleaned.group.as_deref(), Some("g1"));
    }

    #[test]
    fn test_gif_upload_is_verified() {
        let cleaned = PostForm::with_text("pic")
            .with_image(small_gif("small.gif"))
            .clean()
            .unwrap();

        match cleaned.image {
            CleanedImage::Replace(image) => {
                assert_eq!(image.extension, "gif");
                assert_eq!(image.content_type, "image/gif");
                assert_eq!((image.width, image.height), (2, 1));
            }
            other => panic!("expected a replacement image, got {other:?}"),
        }
    }

    #[test]
    fn test_non_image_upload_is_rejected() {
        let upload = ImageUpload {
            filename: "notes.gif".to_string(),
            content_type: Some("image/gif".to_string()),
            data: b"definitely not a picture".to_vec(),
        };
        let errors = PostForm::with_text("pic")
            .with_image(upload)
            .clean()
            .unwrap_err();

        assert!(errors.has("image"));
        assert!(!errors.has("text"));
    }

    #[test]
    fn test_errors_are_reported_together() {
        let upload = ImageUpload {
            filename: "empty.png".to_string(),
            content_type: None,
            data: Vec::new(),
        };
        let errors = PostForm::with_text("")
            .with_image(upload)
            .clean()
            .unwrap_err();

        assert!(errors.has("text"));
        assert!(errors.has("image"));
    }

    #[test]
    fn test_comment_form() {
        assert_eq!(CommentForm::new("nice").clean().unwrap(), "nice");
        assert!(CommentForm::new(" ").clean().unwrap_err().has("text"));
    }
}
