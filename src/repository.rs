use crate::error::Error;
use crate::models::{Comment, ConnectedUser, Post, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing handlers and the security layer
/// to interact with the data layer without knowing the specific implementation
/// (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable and usable across Axum's asynchronous
/// task boundaries.
///
/// Every method returns `Result`: store failures are surfaced to the caller, never
/// swallowed into an empty default — the access-control layer in particular must
/// never turn a failed lookup into a grant or a deny.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_seq(&self, seq: i64) -> Result<Option<User>, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    // Inserts a new account; `password` is the argon2 PHC hash, never plaintext.
    async fn insert_user(&self, name: &str, email: &str, password: &str) -> Result<User, Error>;
    // Single-statement increment so concurrent logins of the same user never under-count.
    async fn update_login(&self, seq: i64) -> Result<User, Error>;

    // --- Connections (friendship) ---
    async fn find_connected_users(&self, user_seq: i64) -> Result<Vec<ConnectedUser>, Error>;
    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error>;

    // --- Posts ---
    async fn insert_post(&self, user_seq: i64, contents: &str) -> Result<Post, Error>;
    // Lists the writer's wall, newest first; `likes_of_me` is computed against `viewer_seq`.
    async fn find_posts(
        &self,
        writer_seq: i64,
        viewer_seq: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>, Error>;
    async fn find_post(
        &self,
        post_seq: i64,
        writer_seq: i64,
        viewer_seq: i64,
    ) -> Result<Option<Post>, Error>;
    // Idempotent: returns the post with at most one like recorded per viewer.
    async fn like_post(
        &self,
        post_seq: i64,
        writer_seq: i64,
        viewer_seq: i64,
    ) -> Result<Option<Post>, Error>;

    // --- Comments ---
    async fn insert_comment(
        &self,
        post_seq: i64,
        user_seq: i64,
        contents: &str,
    ) -> Result<Comment, Error>;
    async fn find_comments(&self, post_seq: i64) -> Result<Vec<Comment>, Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "seq, name, email, password, login_count, last_login_at, create_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_seq(&self, seq: i64) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE seq = $1"
        ))
        .bind(seq)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, name: &str, email: &str, password: &str) -> Result<User, Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password, login_count, create_at) \
             VALUES ($1, $2, $3, 0, now()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// update_login
    ///
    /// Records a successful login. The increment happens inside the database in a
    /// single statement, so two concurrent logins for the same user both count.
    async fn update_login(&self, seq: i64) -> Result<User, Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET login_count = login_count + 1, last_login_at = now() \
             WHERE seq = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(seq)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)
    }

    async fn find_connected_users(&self, user_seq: i64) -> Result<Vec<ConnectedUser>, Error> {
        let connected = sqlx::query_as::<_, ConnectedUser>(
            "SELECT u.seq, u.name, u.email, c.granted_at \
             FROM connections c JOIN users u ON c.target_seq = u.seq \
             WHERE c.user_seq = $1 \
             ORDER BY u.seq",
        )
        .bind(user_seq)
        .fetch_all(&self.pool)
        .await?;
        Ok(connected)
    }

    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT target_seq FROM connections WHERE user_seq = $1 ORDER BY target_seq",
        )
        .bind(user_seq)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_post(&self, user_seq: i64, contents: &str) -> Result<Post, Error> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (user_seq, contents, like_count, comment_count, create_at) \
             VALUES ($1, $2, 0, 0, now()) \
             RETURNING seq, user_seq, contents, like_count, false AS likes_of_me, \
                       comment_count, create_at",
        )
        .bind(user_seq)
        .bind(contents)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn find_posts(
        &self,
        writer_seq: i64,
        viewer_seq: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>, Error> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT p.seq, p.user_seq, p.contents, p.like_count, \
                    l.user_seq IS NOT NULL AS likes_of_me, p.comment_count, p.create_at \
             FROM posts p \
             LEFT JOIN post_likes l ON l.post_seq = p.seq AND l.user_seq = $2 \
             WHERE p.user_seq = $1 \
             ORDER BY p.seq DESC \
             OFFSET $3 LIMIT $4",
        )
        .bind(writer_seq)
        .bind(viewer_seq)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn find_post(
        &self,
        post_seq: i64,
        writer_seq: i64,
        viewer_seq: i64,
    ) -> Result<Option<Post>, Error> {
        let post = sqlx::query_as::<_, Post>(
            "SELECT p.seq, p.user_seq, p.contents, p.like_count, \
                    l.user_seq IS NOT NULL AS likes_of_me, p.comment_count, p.create_at \
             FROM posts p \
             LEFT JOIN post_likes l ON l.post_seq = p.seq AND l.user_seq = $3 \
             WHERE p.seq = $1 AND p.user_seq = $2",
        )
        .bind(post_seq)
        .bind(writer_seq)
        .bind(viewer_seq)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    /// like_post
    ///
    /// Records at most one like per (viewer, post) pair, guarded by the composite
    /// primary key on `post_likes`. The counter update only fires when a row was
    /// actually inserted, keeping `like_count` consistent under concurrent likes.
    async fn like_post(
        &self,
        post_seq: i64,
        writer_seq: i64,
        viewer_seq: i64,
    ) -> Result<Option<Post>, Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO post_likes (user_seq, post_seq, create_at) \
             SELECT $1, seq, now() FROM posts WHERE seq = $2 AND user_seq = $3 \
             ON CONFLICT DO NOTHING",
        )
        .bind(viewer_seq)
        .bind(post_seq)
        .bind(writer_seq)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() > 0 {
            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE seq = $1")
                .bind(post_seq)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_post(post_seq, writer_seq, viewer_seq).await
    }

    async fn insert_comment(
        &self,
        post_seq: i64,
        user_seq: i64,
        contents: &str,
    ) -> Result<Comment, Error> {
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_seq, user_seq, contents, create_at) \
             VALUES ($1, $2, $3, now()) \
             RETURNING seq, post_seq, user_seq, contents, create_at",
        )
        .bind(post_seq)
        .bind(user_seq)
        .bind(contents)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE seq = $1")
            .bind(post_seq)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn find_comments(&self, post_seq: i64) -> Result<Vec<Comment>, Error> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT seq, post_seq, user_seq, contents, create_at \
             FROM comments WHERE post_seq = $1 \
             ORDER BY seq ASC",
        )
        .bind(post_seq)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}

// The grant strategies only need the connection ids; the narrow trait keeps the
// rest of the repository surface out of the security layer's reach.
#[async_trait]
impl crate::security::FriendshipLookup for PostgresRepository {
    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error> {
        Repository::find_connected_ids(self, user_seq).await
    }
}
