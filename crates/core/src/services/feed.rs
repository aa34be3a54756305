//! Paged post feeds.

use std::sync::Arc;

use serde::Serialize;
use yatube_common::AppResult;
use yatube_db::{
    entities::{group, user},
    repositories::{GroupRepository, PostFilter, PostRepository},
};

use crate::cache::{CacheKey, FeedCache};
use crate::pagination::{PAGE_SIZE, Page, Paginator};
use crate::services::presenter::{PostCard, PostPresenter};

/// Route name the global feed is cached under.
pub const INDEX_ROUTE: &str = "index";

/// A group plus one page of its posts.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFeed {
    pub group: group::Model,
    pub page: Page<PostCard>,
}

/// Feed service: every paged list of posts goes through here.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    group_repo: GroupRepository,
    presenter: PostPresenter,
    cache: FeedCache,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        group_repo: GroupRepository,
        presenter: PostPresenter,
        cache: FeedCache,
    ) -> Self {
        Self {
            post_repo,
            group_repo,
            presenter,
            cache,
        }
    }

    /// One page of the posts matching `filter`, newest first.
    ///
    /// `page` is the raw query value; see [`Paginator::resolve`].
    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Option<&str>,
    ) -> AppResult<Page<PostCard>> {
        let count = self.post_repo.count(filter).await?;
        let paginator = Paginator::new(count, PAGE_SIZE);
        let number = paginator.resolve(page);

        let posts = self
            .post_repo
            .find_slice(filter, paginator.per_page(), paginator.offset(number))
            .await?;

        tracing::debug!(?filter, count, page = number, "Listed posts");

        Ok(Page {
            items: self.presenter.cards(posts).await?,
            meta: paginator.meta(number),
        })
    }

    /// Global feed.
    pub async fn index(&self, page: Option<&str>) -> AppResult<Page<PostCard>> {
        self.list_posts(&PostFilter::All, page).await
    }

    /// Global feed, rendered by `render` and served from the feed cache
    /// while fresh.
    pub async fn cached_index<F>(&self, page: Option<&str>, render: F) -> AppResult<Arc<str>>
    where
        F: FnOnce(Page<PostCard>) -> AppResult<String>,
    {
        let key = CacheKey::new(INDEX_ROUTE, page);
        if let Some(body) = self.cache.get(&key).await {
            tracing::debug!(page = ?page, "Feed cache hit");
            return Ok(body);
        }

        let generation = self.cache.generation().await;
        let body: Arc<str> = Arc::from(render(self.index(page).await?)?);
        self.cache.put(key, Arc::clone(&body), generation).await;
        Ok(body)
    }

    /// Posts filed under the group with `slug`.
    pub async fn group_feed(&self, slug: &str, page: Option<&str>) -> AppResult<GroupFeed> {
        let group = self.group_repo.get_by_slug(slug).await?;
        let page = self
            .list_posts(&PostFilter::Group(group.id.clone()), page)
            .await?;
        Ok(GroupFeed { group, page })
    }

    /// Posts written by `author`.
    pub async fn author_feed(
        &self,
        author: &user::Model,
        page: Option<&str>,
    ) -> AppResult<Page<PostCard>> {
        self.list_posts(&PostFilter::Author(author.id.clone()), page)
            .await
    }

    /// Posts by every author `follower` follows.
    pub async fn followed_feed(
        &self,
        follower: &user::Model,
        page: Option<&str>,
    ) -> AppResult<Page<PostCard>> {
        self.list_posts(&PostFilter::FollowedBy(follower.id.clone()), page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::PostForm;
    use crate::services::testing::Fixture;
    use yatube_common::AppError;

    fn texts(page: &Page<PostCard>) -> Vec<&str> {
        page.items.iter().map(|card| card.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_thirteen_posts_paginate_ten_and_three() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        fx.posts(&leo, 13).await;

        let first = fx.feed.index(None).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.meta.num_pages, 2);
        assert_eq!(first.items[0].text, "post number 12");

        let second = fx.feed.index(Some("2")).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second.items[2].text, "post number 0");

        let beyond = fx.feed.index(Some("7")).await.unwrap();
        assert_eq!(beyond.meta.number, 2);
        assert_eq!(beyond.len(), 3);

        let garbage = fx.feed.index(Some("last")).await.unwrap();
        assert_eq!(garbage.meta.number, 1);
    }

    #[tokio::test]
    async fn test_empty_feed_has_one_page() {
        let fx = Fixture::new().await;

        let page = fx.feed.index(Some("3")).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.meta.number, 1);
        assert_eq!(page.meta.num_pages, 1);
    }

    #[tokio::test]
    async fn test_group_feed() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let cats = fx.group("cats").await;
        let dogs = fx.group("dogs").await;
        fx.post_in_group(&leo, "meow", &cats).await;
        fx.post_in_group(&leo, "woof", &dogs).await;
        fx.post(&leo, "no group").await;

        let feed = fx.feed.group_feed("cats", None).await.unwrap();
        assert_eq!(feed.group.slug, "cats");
        assert_eq!(texts(&feed.page), ["meow"]);

        assert!(matches!(
            fx.feed.group_feed("birds", None).await,
            Err(AppError::GroupNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_author_and_followed_feeds() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        let mia = fx.user("mia").await;
        let reader = fx.user("reader").await;
        fx.post(&leo, "by leo").await;
        fx.post(&mia, "by mia").await;

        assert_eq!(texts(&fx.feed.author_feed(&leo, None).await.unwrap()), ["by leo"]);

        assert!(fx.feed.followed_feed(&reader, None).await.unwrap().is_empty());
        fx.follows.follow(&reader, "mia").await.unwrap();
        assert_eq!(
            texts(&fx.feed.followed_feed(&reader, None).await.unwrap()),
            ["by mia"]
        );
    }

    #[tokio::test]
    async fn test_cached_index_serves_until_post_write() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        fx.post(&leo, "old news").await;

        let render = |page: Page<PostCard>| Ok(texts(&page).join("|"));

        let body = fx.feed.cached_index(None, render).await.unwrap();
        assert_eq!(&*body, "old news");

        // Bypasses the services, so the cache can't know about it.
        fx.post(&leo, "sneaky").await;
        let body = fx.feed.cached_index(None, render).await.unwrap();
        assert_eq!(&*body, "old news");

        fx.posts
            .create_post(&leo, &PostForm::with_text("fresh"))
            .await
            .unwrap();
        let body = fx.feed.cached_index(None, render).await.unwrap();
        assert_eq!(&*body, "fresh|sneaky|old news");
    }

    #[tokio::test]
    async fn test_cached_index_keys_by_page() {
        let fx = Fixture::new().await;
        let leo = fx.user("leo").await;
        fx.posts(&leo, 11).await;

        let render = |page: Page<PostCard>| Ok(page.meta.number.to_string());

        assert_eq!(&*fx.feed.cached_index(None, render).await.unwrap(), "1");
        assert_eq!(&*fx.feed.cached_index(Some("2"), render).await.unwrap(), "2");
        assert_eq!(fx.cache.len().await, 2);
    }
}
