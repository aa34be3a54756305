//! Shared fixture for service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use sea_orm::Set;
use yatube_common::{IdGenerator, LocalStorage, StorageBackend};
use yatube_db::{
    entities::{comment, group, post, user},
    repositories::{
        CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
    },
    test_utils::TestDatabase,
};

use super::*;
use crate::cache::FeedCache;

pub(crate) struct Fixture {
    _db: TestDatabase,
    pub post_repo: PostRepository,
    pub comment_repo: CommentRepository,
    pub follow_repo: FollowRepository,
    pub cache: FeedCache,
    pub users: UserService,
    pub groups: GroupService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub feed: FeedService,
    pub profiles: ProfileService,
    pub presenter: PostPresenter,
    clock: AtomicI64,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = TestDatabase::new().await.unwrap();
        let conn = db.connection();

        let user_repo = UserRepository::new(Arc::clone(&conn));
        let group_repo = GroupRepository::new(Arc::clone(&conn));
        let post_repo = PostRepository::new(Arc::clone(&conn));
        let comment_repo = CommentRepository::new(Arc::clone(&conn));
        let follow_repo = FollowRepository::new(conn);

        let root = std::env::temp_dir().join(format!("yatube-core-{}", IdGenerator::new().generate()));
        let storage: Arc<dyn StorageBackend> =
            Arc::new(LocalStorage::new(root, "/media".to_string()));
        let cache = FeedCache::new(Duration::from_secs(20));

        let presenter = PostPresenter::new(
            user_repo.clone(),
            group_repo.clone(),
            Arc::clone(&storage),
        );
        let feed = FeedService::new(
            post_repo.clone(),
            group_repo.clone(),
            presenter.clone(),
            cache.clone(),
        );
        let follows = FollowService::new(follow_repo.clone(), user_repo.clone(), feed.clone());

        Self {
            users: UserService::new(user_repo.clone()),
            groups: GroupService::new(group_repo.clone(), cache.clone()),
            posts: PostService::new(
                post_repo.clone(),
                user_repo.clone(),
                group_repo,
                storage,
                cache.clone(),
            ),
            comments: CommentService::new(
                comment_repo.clone(),
                post_repo.clone(),
                user_repo.clone(),
            ),
            profiles: ProfileService::new(
                user_repo,
                post_repo.clone(),
                comment_repo.clone(),
                follows.clone(),
                feed.clone(),
                presenter.clone(),
            ),
            follows,
            feed,
            presenter,
            post_repo,
            comment_repo,
            follow_repo,
            cache,
            _db: db,
            clock: AtomicI64::new(0),
        }
    }

    /// Strictly increasing timestamps in the past, so feed order is
    /// predictable and anything the services write now sorts first.
    fn tick(&self) -> chrono::DateTime<chrono::FixedOffset> {
        let step = self.clock.fetch_add(1, Ordering::SeqCst);
        (Utc::now() - TimeDelta::days(1) + TimeDelta::seconds(step)).into()
    }

    pub async fn user(&self, username: &str) -> user::Model {
        self.users
            .register(RegisterInput::new(username))
            .await
            .unwrap()
    }

    pub async fn group(&self, slug: &str) -> group::Model {
        self.groups
            .create(CreateGroupInput {
                title: format!("Group {slug}"),
                slug: slug.to_string(),
                description: format!("All about {slug}"),
            })
            .await
            .unwrap()
    }

    async fn insert_post(
        &self,
        author: &user::Model,
        text: &str,
        group: Option<&group::Model>,
    ) -> post::Model {
        self.post_repo
            .create(post::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                text: Set(text.to_string()),
                author_id: Set(author.id.clone()),
                group_id: Set(group.map(|g| g.id.clone())),
                image: Set(None),
                created_at: Set(self.tick()),
            })
            .await
            .unwrap()
    }

    pub async fn post(&self, author: &user::Model, text: &str) -> post::Model {
        self.insert_post(author, text, None).await
    }

    pub async fn post_in_group(
        &self,
        author: &user::Model,
        text: &str,
        group: &group::Model,
    ) -> post::Model {
        self.insert_post(author, text, Some(group)).await
    }

    pub async fn posts(&self, author: &user::Model, n: usize) -> Vec<post::Model> {
        let mut posts = Vec::with_capacity(n);
        for i in 0..n {
            posts.push(self.post(author, &format!("post number {i}")).await);
        }
        posts
    }

    pub async fn comment(
        &self,
        author: &user::Model,
        post: &post::Model,
        text: &str,
    ) -> comment::Model {
        self.comment_repo
            .create(comment::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                post_id: Set(post.id.clone()),
                author_id: Set(author.id.clone()),
                text: Set(text.to_string()),
                created_at: Set(self.tick()),
            })
            .await
            .unwrap()
    }
}
