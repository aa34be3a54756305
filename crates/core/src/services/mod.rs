//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod feed;
pub mod following;
pub mod group;
pub mod post;
pub mod presenter;
pub mod profile;
pub mod user;

pub use comment::CommentService;
pub use feed::{FeedService, GroupFeed};
pub use following::{FollowCounts, FollowOutcome, FollowService};
pub use group::{CreateGroupInput, GroupService};
pub use post::PostService;
pub use presenter::{AuthorRef, CommentView, GroupRef, PostCard, PostPresenter};
pub use profile::{PostDetailView, ProfileService, ProfileView};
pub use user::{RegisterInput, UserService};

#[cfg(test)]
pub(crate) mod testing;
