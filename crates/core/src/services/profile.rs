//! Profile and post detail pages.

use serde::Serialize;
use yatube_common::AppResult;
use yatube_db::{
    entities::user,
    repositories::{CommentRepository, PostFilter, PostRepository, UserRepository},
};

use crate::pagination::Page;
use crate::services::{
    feed::FeedService,
    following::FollowService,
    post::find_post_by_author,
    presenter::{AuthorRef, CommentView, PostCard, PostPresenter},
};

/// Everything a profile page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub author: AuthorRef,
    pub page: Page<PostCard>,
    pub count_posts: u64,
    pub count_following: u64,
    pub count_followers: u64,
    /// Whether the viewer follows this author. Absent for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
}

/// Everything a post detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetailView {
    pub author: AuthorRef,
    pub post: PostCard,
    pub comments: Vec<CommentView>,
    pub count_posts: u64,
    pub count_following: u64,
    pub count_followers: u64,
    /// Whether the viewer follows this author. Absent for guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
}

struct AuthorStats {
    count_posts: u64,
    count_following: u64,
    count_followers: u64,
    following: Option<bool>,
}

/// Read-only composition for profile and post pages.
#[derive(Clone)]
pub struct ProfileService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    follows: FollowService,
    feed: FeedService,
    presenter: PostPresenter,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        follows: FollowService,
        feed: FeedService,
        presenter: PostPresenter,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            comment_repo,
            follows,
            feed,
            presenter,
        }
    }

    async fn stats(
        &self,
        viewer: Option<&user::Model>,
        author: &user::Model,
    ) -> AppResult<AuthorStats> {
        let count_posts = self
            .post_repo
            .count(&PostFilter::Author(author.id.clone()))
            .await?;
        let counts = self.follows.counts(&author.id).await?;
        let following = match viewer {
            Some(viewer) => Some(self.follows.is_following(&viewer.id, &author.id).await?),
            None => None,
        };

        Ok(AuthorStats {
            count_posts,
            count_following: counts.following,
            count_followers: counts.followers,
            following,
        })
    }

    /// Profile of `username`, showing one page of their posts.
    pub async fn profile(
        &self,
        viewer: Option<&user::Model>,
        username: &str,
        page: Option<&str>,
    ) -> AppResult<ProfileView> {
        let author = self.user_repo.get_by_username(username).await?;
        let page = self.feed.author_feed(&author, page).await?;
        let stats = self.stats(viewer, &author).await?;

        Ok(ProfileView {
            author: AuthorRef::from(&author),
            page,
            count_posts: stats.count_posts,
            count_following: stats.count_following,
            count_followers: stats.count_followers,
            following: stats.following,
        })
    }

    /// A single post with its comments.
    pub async fn post_detail(
        &self,
        viewer: Option<&user::Model>,
        username: &str,
        post_id: &str,
    ) -> AppResult<PostDetailView> {
        let (author, post) =
            find_post_by_author(&self.user_repo, &self.post_repo, username, post_id).await?;
        let comments = self.comment_repo.find_by_post(&post.id).await?;
        let stats = self.stats(viewer, &author).await?;

        Ok(PostDetailView {
            author: AuthorRef::from(&author),
            post: self.presenter.card(post).await?,
            comments: self.presenter.comments(comments).await?,
            count_posts: stats.count_posts,
            count_following: stats.count_following,
            count_followers: stats.count_followers,
            following: stats.following,
        })
    }
}
