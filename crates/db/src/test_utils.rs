//! Test utilities for database operations.
//!
//! Provides a throwaway, fully migrated `SQLite` database living in memory,
//! so service and HTTP tests exercise real SQL without an external server.

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::migrations::Migrator;

/// In-memory database URL.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// A migrated in-memory test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Create a fresh database and run every migration on it.
    pub async fn new() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(MEMORY_URL);
        // Every pooled connection to `:memory:` would be its own database.
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        debug!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Get a shared handle to the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{post, user};
    use crate::repositories::{PostFilter, PostRepository, UserRepository};
    use chrono::Utc;
    use sea_orm::Set;

    #[tokio::test]
    async fn test_migrations_apply_and_tables_work() {
        let db = TestDatabase::new().await.unwrap();
        let users = UserRepository::new(db.connection());
        let posts = PostRepository::new(db.connection());

        let author = users
            .create(user::ActiveModel {
                id: Set("u1".to_string()),
                username: Set("tester".to_string()),
                name: Set(None),
                token: Set(Some("tok".to_string())),
                created_at: Set(Utc::now().into()),
            })
            .await
            .unwrap();

        posts
            .create(post::ActiveModel {
                id: Set("p1".to_string()),
                text: Set("hello".to_string()),
                author_id: Set(author.id.clone()),
                group_id: Set(None),
                image: Set(None),
                created_at: Set(Utc::now().into()),
            })
            .await
            .unwrap();

        assert_eq!(posts.count(&PostFilter::All).await.unwrap(), 1);
        assert_eq!(
            posts
                .count(&PostFilter::Author("u1".to_string()))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            users.find_by_token("tok").await.unwrap().map(|u| u.username),
            Some("tester".to_string())
        );
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let first = TestDatabase::new().await.unwrap();
        let second = TestDatabase::new().await.unwrap();

        UserRepository::new(first.connection())
            .create(user::ActiveModel {
                id: Set("u1".to_string()),
                username: Set("only-here".to_string()),
                name: Set(None),
                token: Set(None),
                created_at: Set(Utc::now().into()),
            })
            .await
            .unwrap();

        let other = UserRepository::new(second.connection())
            .find_by_username("only-here")
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
