//! Following service.

use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use yatube_common::{AppResult, IdGenerator};
use yatube_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};

use crate::pagination::Page;
use crate::services::feed::FeedService;
use crate::services::presenter::PostCard;

/// What a follow request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new edge was created.
    Followed,
    /// The edge already existed.
    AlreadyFollowing,
    /// The actor tried to follow themselves.
    SelfFollow,
}

/// Follow counts for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    /// Authors this user follows.
    pub following: u64,
    /// Users following this author.
    pub followers: u64,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    feed: FeedService,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        feed: FeedService,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            feed,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow the author named `username`.
    ///
    /// Following yourself, or someone you already follow, changes nothing.
    pub async fn follow(&self, actor: &user::Model, username: &str) -> AppResult<FollowOutcome> {
        let author = self.user_repo.get_by_username(username).await?;

        if actor.id == author.id {
            tracing::debug!(user = %actor.username, "Ignored self-follow");
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.follow_repo.is_following(&actor.id, &author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(actor.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(Utc::now().into()),
        };

        if let Err(err) = self.follow_repo.create(model).await {
            // A concurrent request may have inserted the same pair; the
            // unique index rejects ours.
            if self.follow_repo.is_following(&actor.id, &author.id).await? {
                return Ok(FollowOutcome::AlreadyFollowing);
            }
            return Err(err);
        }

        tracing::info!(follower = %actor.username, author = %author.username, "Followed");
        Ok(FollowOutcome::Followed)
    }

    /// Stop following the author named `username`.
    ///
    /// Returns whether an edge was removed.
    pub async fn unfollow(&self, actor: &user::Model, username: &str) -> AppResult<bool> {
        let author = self.user_repo.get_by_username(username).await?;

        if actor.id == author.id {
            return Ok(false);
        }

        let removed = self
            .follow_repo
            .delete_by_pair(&actor.id, &author.id)
            .await?;
        if removed {
            tracing::info!(follower = %actor.username, author = %author.username, "Unfollowed");
        }
        Ok(removed)
    }

    /// Whether `follower_id` follows `author_id`.
    pub async fn is_following(&self, follower_id: &str, author_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, author_id).await
    }

    /// Number of users following `user_id`.
    pub async fn follower_count(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(user_id).await
    }

    /// Number of authors `user_id` follows.
    pub async fn following_count(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }

    /// Both counts for `user_id`.
    pub async fn counts(&self, user_id: &str) -> AppResult<FollowCounts> {
        Ok(FollowCounts {
            following: self.following_count(user_id).await?,
            followers: self.follower_count(user_id).await?,
        })
    }

    /// Posts by every author `actor` follows, newest first.
    pub async fn following_feed(
        &self,
        actor: &user::Model,
        page: Option<&str>,
    ) -> AppResult<Page<PostCard>> {
        self.feed.followed_feed(actor, page).await
    }
}
