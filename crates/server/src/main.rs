//! yatube-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use yatube_common::{Config, LocalStorage, StorageBackend, config::LogFormat};
use yatube_core::{
    CommentService, FeedCache, FeedService, FollowService, GroupService, PostPresenter,
    PostService, ProfileService, UserService,
};
use yatube_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use yatube_web::AppState;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "yatube=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(config.logging.format);

    info!("Starting yatube-rs server...");

    // Connect to database
    let db = yatube_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    yatube_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));

    // Media storage and the global feed cache
    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("failed to create media root {}", config.media.root.display()))?;
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        config.media.root.clone(),
        config.media.url.clone(),
    ));
    let cache = FeedCache::new(Duration::from_secs(config.cache.feed_ttl_secs));
    info!(ttl_secs = config.cache.feed_ttl_secs, "Feed cache ready");

    // Services
    let presenter = PostPresenter::new(
        user_repo.clone(),
        group_repo.clone(),
        Arc::clone(&storage),
    );
    let feed_service = FeedService::new(
        post_repo.clone(),
        group_repo.clone(),
        presenter.clone(),
        cache.clone(),
    );
    let follow_service = FollowService::new(follow_repo, user_repo.clone(), feed_service.clone());
    let profile_service = ProfileService::new(
        user_repo.clone(),
        post_repo.clone(),
        comment_repo.clone(),
        follow_service.clone(),
        feed_service.clone(),
        presenter,
    );

    let state = AppState {
        user_service: UserService::new(user_repo.clone()),
        group_service: GroupService::new(group_repo.clone(), cache.clone()),
        post_service: PostService::new(
            post_repo.clone(),
            user_repo.clone(),
            group_repo,
            storage,
            cache,
        ),
        comment_service: CommentService::new(comment_repo, post_repo, user_repo),
        follow_service,
        feed_service,
        profile_service,
        login_url: config.auth.login_url.clone(),
    };

    let app = yatube_web::app(state)
        .nest_service(&config.media.url, ServeDir::new(&config.media.root))
        .layer(DefaultBodyLimit::max(config.server.body_limit))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit))
        .layer(TraceLayer::new_for_http());

    // Start server with graceful shutdown
    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid server host {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
