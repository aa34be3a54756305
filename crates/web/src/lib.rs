//! HTTP layer for yatube-rs.
//!
//! - **Endpoints**: feeds, posts, comments, profiles, follows, static pages
//! - **Extractors**: the login guard and post form parsing
//! - **Middleware**: bearer-token authentication, shared state
//! - **Response**: template documents and redirects
//!
//! Every page is answered with a JSON document naming the template to render
//! and its context; rendering itself happens elsewhere.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};

pub use endpoints::router;
pub use middleware::AppState;

/// The full application: routes, authentication, the not-found page and state.
pub fn app(state: AppState) -> Router {
    router()
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(from_fn(middleware::not_found_page))
        .with_state(state)
}
