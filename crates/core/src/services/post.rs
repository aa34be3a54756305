//! Post service: creating, editing and deleting posts.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Set;
use yatube_common::{AppError, AppResult, FormErrors, IdGenerator, StorageBackend, generate_storage_key};
use yatube_db::{
    entities::{post, user},
    repositories::{GroupRepository, PostRepository, UserRepository},
};

use crate::cache::FeedCache;
use crate::forms::{CleanedImage, CleanedPost, PostForm, ValidImage};

const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Look up a post through its author's username.
///
/// Both halves must match: a real post under someone else's name is not found.
pub(crate) async fn find_post_by_author(
    user_repo: &UserRepository,
    post_repo: &PostRepository,
    username: &str,
    post_id: &str,
) -> AppResult<(user::Model, post::Model)> {
    let author = user_repo.get_by_username(username).await?;
    let post = post_repo
        .find_by_author_and_id(&author.id, post_id)
        .await?
        .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;
    Ok((author, post))
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    storage: Arc<dyn StorageBackend>,
    cache: FeedCache,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        storage: Arc<dyn StorageBackend>,
        cache: FeedCache,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            storage,
            cache,
            id_gen: IdGenerator::new(),
        }
    }

    /// Validate a form, checking the selected group exists.
    async fn clean(&self, form: &PostForm) -> AppResult<CleanedPost> {
        let mut errors = FormErrors::new();

        let group_id = form
            .group
            .as_deref()
            .map(str::trim)
            .filter(|group| !group.is_empty());
        if let Some(group_id) = group_id {
            if self.group_repo.find_by_id(group_id).await?.is_none() {
                errors.add("group", INVALID_GROUP);
            }
        }

        match form.clean() {
            Ok(cleaned) => {
                errors.into_result()?;
                Ok(cleaned)
            }
            Err(field_errors) => {
                errors.extend(field_errors);
                Err(AppError::Validation(errors))
            }
        }
    }

    async fn store_image(&self, image: &ValidImage) -> AppResult<String> {
        let key = generate_storage_key("posts", &format!("upload.{}", image.extension));
        let stored = self
            .storage
            .upload(&key, &image.data, image.content_type)
            .await?;
        tracing::debug!(key = %stored.key, width = image.width, height = image.height, "Stored post image");
        Ok(stored.key)
    }

    fn ensure_author(actor: &user::Model, post: &post::Model, action: &str) -> AppResult<()> {
        if actor.id == post.author_id {
            return Ok(());
        }
        tracing::warn!(
            actor = %actor.username,
            post_id = %post.id,
            action,
            "Rejected write to someone else's post"
        );
        Err(AppError::Forbidden(format!(
            "Only the author can {action} this post"
        )))
    }

    /// Publish a post written by `actor`.
    pub async fn create_post(&self, actor: &user::Model, form: &PostForm) -> AppResult<post::Model> {
        let cleaned = self.clean(form).await?;

        let image = match &cleaned.image {
            CleanedImage::Replace(image) => Some(self.store_image(image).await?),
            CleanedImage::Keep | CleanedImage::Clear => None,
        };

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            text: Set(cleaned.text),
            author_id: Set(actor.id.clone()),
            group_id: Set(cleaned.group),
            image: Set(image),
            created_at: Set(Utc::now().into()),
        };

        let post = self.post_repo.create(model).await?;
        self.cache.invalidate().await;

        tracing::info!(post_id = %post.id, author = %actor.username, "Post created");
        Ok(post)
    }

    /// Load a post for its edit form. Only the author may open it.
    pub async fn get_for_edit(
        &self,
        actor: &user::Model,
        username: &str,
        post_id: &str,
    ) -> AppResult<post::Model> {
        let (_, post) =
            find_post_by_author(&self.user_repo, &self.post_repo, username, post_id).await?;
        Self::ensure_author(actor, &post, "edit")?;
        Ok(post)
    }

    /// Replace a post's text, group and image.
    ///
    /// A form without a group clears the post's group. The author is checked
    /// before the form is validated.
    pub async fn edit_post(
        &self,
        actor: &user::Model,
        username: &str,
        post_id: &str,
        form: &PostForm,
    ) -> AppResult<post::Model> {
        let post = self.get_for_edit(actor, username, post_id).await?;
        let cleaned = self.clean(form).await?;

        let image = match &cleaned.image {
            CleanedImage::Keep => post.image.clone(),
            CleanedImage::Clear => None,
            CleanedImage::Replace(image) => Some(self.store_image(image).await?),
        };

        let mut active: post::ActiveModel = post.into();
        active.text = Set(cleaned.text);
        active.group_id = Set(cleaned.group);
        active.image = Set(image);

        let post = self.post_repo.update(active).await?;
        self.cache.invalidate().await;

        tracing::info!(post_id = %post.id, author = %actor.username, "Post edited");
        Ok(post)
    }

    /// Delete a post and its comments.
    pub async fn delete_post(
        &self,
        actor: &user::Model,
        username: &str,
        post_id: &str,
    ) -> AppResult<()> {
        let (_, post) =
            find_post_by_author(&self.user_repo, &self.post_repo, username, post_id).await?;
        Self::ensure_author(actor, &post, "delete")?;

        let comments = self.post_repo.delete(&post.id).await?;
        self.cache.invalidate().await;

        tracing::info!(post_id = %post.id, author = %actor.username, comments, "Post deleted");
        Ok(())
    }

    /// Resolve a post by its author's username and its ID.
    pub async fn get_by_author(&self, username: &str, post_id: &str) -> AppResult<post::Model> {
        find_post_by_author(&self.user_repo, &self.post_repo, username, post_id)
            .await
            .map(|(_, post)| post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::forms::{ImageChange, tests::small_gif};
    use crate::services::testing::Fixture;
    use yatube_db::repositories::PostFilter;

    async fn total(fx: &Fixture) -> u64 {
        fx.post_repo.count(&PostFilter::All).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_post_adds_exactly_one() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let cats = fx.group("cats").await;
        let before = total(&fx).await;

        let post = fx
            .posts
            .create_post(&leo, &PostForm::with_text("hello").in_group(cats.id.clone()))
            .await
            .unwrap();

        assert_eq!(total(&fx).await, before + 1);
        assert_eq!(post.author_id, leo.id);
        assert_eq!(post.group_id, Some(cats.id));
        assert_eq!(post.image, None);
    }

    #[tokio::test]
    async fn test_create_post_with_image() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;

        let post = fx
            .posts
            .create_post(&leo, &PostForm::with_text("pic").with_image(small_gif("small.gif")))
            .await
            .unwrap();

        let key = post.image.unwrap();
        assert!(key.starts_with("posts/"));
        assert!(key.ends_with(".gif"));
    }

    #[tokio::test]
    async fn test_create_post_rejects_empty_text() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;

        let result = fx.posts.create_post(&leo, &PostForm::with_text("")).await;

        assert!(matches!(result, Err(AppError::Validation(ref errors)) if errors.has("text")));
        assert_eq!(total(&fx).await, 0);
    }

    #[tokio::test]
    async fn test_create_post_rejects_unknown_group() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;

        let result = fx
            .posts
            .create_post(&leo, &PostForm::with_text("").in_group("nope"))
            .await;

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.has("group"));
                assert!(errors.has("text"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(total(&fx).await, 0);
    }

    #[tokio::test]
    async fn test_edit_post_by_author() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let cats = fx.group("cats").await;
        let post = fx.post_in_group(&leo, "first draft", &cats).await;

        let edited = fx
            .posts
            .edit_post(&leo, "leo", &post.id, &PostForm::with_text("final"))
            .await
            .unwrap();

        assert_eq!(edited.id, post.id);
        assert_eq!(edited.text, "final");
        // Omitting the group clears it.
        assert_eq!(edited.group_id, None);
        assert_eq!(edited.created_at, post.created_at);
        assert_eq!(edited.author_id, leo.id);
    }

    #[tokio::test]
    async fn test_edit_post_image_actions() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let post = fx
            .posts
            .create_post(&leo, &PostForm::with_text("pic").with_image(small_gif("a.gif")))
            .await
            .unwrap();
        let original = post.image.clone();

        let kept = fx
            .posts
            .edit_post(&leo, "leo", &post.id, &PostForm::with_text("still pic"))
            .await
            .unwrap();
        assert_eq!(kept.image, original);

        let replaced = fx
            .posts
            .edit_post(
                &leo,
                "leo",
                &post.id,
                &PostForm::with_text("new pic").with_image(small_gif("b.gif")),
            )
            .await
            .unwrap();
        assert!(replaced.image.is_some());
        assert_ne!(replaced.image, original);

        let mut clear = PostForm::with_text("no pic");
        clear.image = ImageChange::Clear;
        let cleared = fx
            .posts
            .edit_post(&leo, "leo", &post.id, &clear)
            .await
            .unwrap();
        assert_eq!(cleared.image, None);
    }

    #[tokio::test]
    async fn test_edit_post_by_stranger_is_forbidden() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let post = fx.post(&leo, "mine").await;

        let result = fx
            .posts
            .edit_post(&mia, "leo", &post.id, &PostForm::with_text("hijacked"))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // Authorization comes before validation.
        let result = fx
            .posts
            .edit_post(&mia, "leo", &post.id, &PostForm::with_text(""))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        assert_eq!(fx.post_repo.get_by_id(&post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_edit_post_invalid_form_changes_nothing() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let post = fx.post(&leo, "keep me").await;

        let result = fx
            .posts
            .edit_post(&leo, "leo", &post.id, &PostForm::with_text("  "))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(fx.post_repo.get_by_id(&post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_post_is_scoped_by_author_username() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        fx.user("mia").await;
        let post = fx.post(&leo, "leo's").await;

        assert!(matches!(
            fx.posts.get_by_author("mia", &post.id).await,
            Err(AppError::PostNotFound(_))
        ));
        assert!(matches!(
            fx.posts.get_by_author("ghost", &post.id).await,
            Err(AppError::UserNotFound(_))
        ));
        assert!(matches!(
            fx.posts.delete_post(&leo, "mia", &post.id).await,
            Err(AppError::PostNotFound(_))
        ));
        assert_eq!(fx.posts.get_by_author("leo", &post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let post = fx.post(&leo, "short-lived").await;
        fx.comment(&mia, &post, "nice").await;

        fx.posts.delete_post(&leo, "leo", &post.id).await.unwrap();

        assert_eq!(total(&fx).await, 0);
        assert_eq!(fx.comment_repo.count_by_post(&post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_post_by_stranger_is_forbidden() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let post = fx.post(&leo, "mine").await;

        let result = fx.posts.delete_post(&mia, "leo", &post.id).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(total(&fx).await, 1);
    }

    #[tokio::test]
    async fn test_writes_invalidate_feed_cache() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let key = CacheKey::new("index", None);

        let seed = |fx: &Fixture| {
            let cache = fx.cache.clone();
            let key = key.clone();
            async move {
                let generation = cache.generation().await;
                cache.put(key, Arc::from("cached"), generation).await;
            }
        };

        seed(&fx).await;
        let post = fx
            .posts
            .create_post(&leo, &PostForm::with_text("one"))
            .await
            .unwrap();
        assert!(fx.cache.get(&key).await.is_none());

        seed(&fx).await;
        fx.posts
            .edit_post(&leo, "leo", &post.id, &PostForm::with_text("two"))
            .await
            .unwrap();
        assert!(fx.cache.get(&key).await.is_none());

        seed(&fx).await;
        fx.posts.delete_post(&leo, "leo", &post.id).await.unwrap();
        assert!(fx.cache.get(&key).await.is_none());
    }
}
