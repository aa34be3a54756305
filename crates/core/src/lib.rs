//! Core business logic for yatube-rs.
//!
//! - [`forms`]: input validation for posts and comments
//! - [`pagination`]: page arithmetic shared by every feed
//! - [`cache`]: the global feed page cache
//! - [`services`]: the operations the web layer calls

pub mod cache;
pub mod forms;
pub mod pagination;
pub mod services;

pub use cache::{CacheKey, FeedCache};
pub use forms::{CleanedImage, CleanedPost, CommentForm, ImageChange, ImageUpload, PostForm, ValidImage};
pub use pagination::{PAGE_SIZE, Page, PageMeta, Paginator};
pub use services::*;
