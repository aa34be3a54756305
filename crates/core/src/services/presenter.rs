//! Read models handed to the presentation layer.
//!
//! Rows reference their author and group by ID; the presenter resolves those
//! in batches so a page of posts costs a fixed number of queries.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use yatube_common::{AppError, AppResult, StorageBackend};
use yatube_db::{
    entities::{comment, group, post, user},
    repositories::{GroupRepository, UserRepository},
};

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
}

impl From<&user::Model> for AuthorRef {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

/// Public view of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: String,
    pub slug: String,
    pub title: String,
}

impl From<&group::Model> for GroupRef {
    fn from(group: &group::Model) -> Self {
        Self {
            id: group.id.clone(),
            slug: group.slug.clone(),
            title: group.title.clone(),
        }
    }
}

/// A post as shown in feeds and on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: String,
    pub text: String,
    /// Short label (the post's display form).
    pub label: String,
    pub created_at: DateTime<FixedOffset>,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
    pub image_url: Option<String>,
}

/// A comment as shown under a post.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<FixedOffset>,
    pub author: AuthorRef,
}

fn unknown_author(id: &str) -> AuthorRef {
    AuthorRef {
        id: id.to_string(),
        username: String::new(),
        name: None,
    }
}

/// Builds [`PostCard`]s and [`CommentView`]s from rows.
#[derive(Clone)]
pub struct PostPresenter {
    user_repo: UserRepository,
    group_repo: GroupRepository,
    storage: Arc<dyn StorageBackend>,
}

impl PostPresenter {
    /// Create a new presenter.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        group_repo: GroupRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            user_repo,
            group_repo,
            storage,
        }
    }

    async fn authors(&self, mut ids: Vec<String>) -> AppResult<HashMap<String, AuthorRef>> {
        ids.sort_unstable();
        ids.dedup();
        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .iter()
            .map(|user| (user.id.clone(), AuthorRef::from(user)))
            .collect())
    }

    /// Cards for a slice of posts, in the same order.
    pub async fn cards(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostCard>> {
        let authors = self
            .authors(posts.iter().map(|p| p.author_id.clone()).collect())
            .await?;

        let mut group_ids: Vec<String> = posts.iter().filter_map(|p| p.group_id.clone()).collect();
        group_ids.sort_unstable();
        group_ids.dedup();
        let groups: HashMap<String, GroupRef> = self
            .group_repo
            .find_by_ids(&group_ids)
            .await?
            .iter()
            .map(|group| (group.id.clone(), GroupRef::from(group)))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| PostCard {
                label: post.to_string(),
                author: authors
                    .get(&post.author_id)
                    .cloned()
                    .unwrap_or_else(|| unknown_author(&post.author_id)),
                group: post
                    .group_id
                    .as_ref()
                    .and_then(|id| groups.get(id))
                    .cloned(),
                image_url: post.image.as_deref().map(|key| self.storage.public_url(key)),
                id: post.id,
                text: post.text,
                created_at: post.created_at,
            })
            .collect())
    }

    /// Card for a single post.
    pub async fn card(&self, post: post::Model) -> AppResult<PostCard> {
        let id = post.id.clone();
        self.cards(vec![post])
            .await?
            .pop()
            .ok_or(AppError::PostNotFound(id))
    }

    /// Views for a post's comments, in the same order.
    pub async fn comments(&self, comments: Vec<comment::Model>) -> AppResult<Vec<CommentView>> {
        let authors = self
            .authors(comments.iter().map(|c| c.author_id.clone()).collect())
            .await?;

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors
                    .get(&comment.author_id)
                    .cloned()
                    .unwrap_or_else(|| unknown_author(&comment.author_id)),
                id: comment.id,
                text: comment.text,
                created_at: comment.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn test_cards_resolve_author_and_group() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let cats = fx.group("cats").await;

        let first = fx.post(&leo, "A rather long first post body").await;
        let second = fx.post_in_group(&mia, "second", &cats).await;

        let cards = fx.presenter.cards(vec![second, first]).await.unwrap();

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].author.username, "mia");
        assert_eq!(cards[0].group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
        assert_eq!(cards[1].author.username, "leo");
        assert_eq!(cards[1].group, None);
        assert_eq!(cards[1].label, "A rather long f");
        assert_eq!(cards[1].image_url, None);
    }

    #[tokio::test]
    async fn test_comment_views_keep_order() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let post = fx.post(&leo, "post").await;
        fx.comment(&leo, &post, "first").await;
        fx.comment(&leo, &post, "second").await;

        let comments = fx.comment_repo.find_by_post(&post.id).await.unwrap();
        let views = fx.presenter.comments(comments).await.unwrap();

        let texts: Vec<_> = views.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(views[0].author.username, "leo");
    }
}
