//! Comment service.

use chrono::Utc;
use sea_orm::Set;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};

use crate::forms::CommentForm;
use crate::services::post::find_post_by_author;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on the post `post_id` written by `username`.
    pub async fn add_comment(
        &self,
        actor: &user::Model,
        username: &str,
        post_id: &str,
        form: &CommentForm,
    ) -> AppResult<comment::Model> {
        let (_, post) =
            find_post_by_author(&self.user_repo, &self.post_repo, username, post_id).await?;
        let text = form.clean().map_err(AppError::Validation)?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(actor.id.clone()),
            text: Set(text),
            created_at: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %post.id, author = %actor.username, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<comment::Model>> {
        self.comment_repo.find_by_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn test_add_comment() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let post = fx.post(&leo, "discuss").await;

        let comment = fx
            .comments
            .add_comment(&mia, "leo", &post.id, &CommentForm::new("first!"))
            .await
            .unwrap();

        assert_eq!(comment.post_id, post.id);
        assert_eq!(comment.author_id, mia.id);
        assert_eq!(fx.comment_repo.count_by_post(&post.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let post = fx.post(&leo, "discuss").await;

        let result = fx
            .comments
            .add_comment(&leo, "leo", &post.id, &CommentForm::new("   "))
            .await;

        assert!(matches!(result, Err(AppError::Validation(ref errors)) if errors.has("text")));
        assert_eq!(fx.comment_repo.count_by_post(&post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_needs_matching_author_and_post() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let post = fx.post(&leo, "discuss").await;

        let wrong_author = fx
            .comments
            .add_comment(&mia, "mia", &post.id, &CommentForm::new("hi"))
            .await;
        assert!(matches!(wrong_author, Err(AppError::PostNotFound(_))));

        let missing_post = fx
            .comments
            .add_comment(&mia, "leo", "no-such-post", &CommentForm::new("hi"))
            .await;
        assert!(matches!(missing_post, Err(AppError::PostNotFound(_))));

        assert_eq!(fx.comment_repo.count_by_post(&post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_for_post_is_oldest_first() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let post = fx.post(&leo, "discuss").await;
        fx.comment(&leo, &post, "one").await;
        fx.comment(&leo, &post, "two").await;
        fx.comments
            .add_comment(&leo, "leo", &post.id, &CommentForm::new("three"))
            .await
            .unwrap();

        let texts: Vec<_> = fx
            .comments
            .list_for_post(&post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }
}
