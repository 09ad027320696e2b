use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every route here requires an established identity, enforced by the
/// access-decision layer attached in the application assembly (not here).
/// Routes under `/api/user/{user_seq}/post/` are additionally guarded by the
/// connection-based voter: only the owner and their connections get through.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/user/me
        // The caller's own profile, fetched fresh from storage.
        .route("/api/user/me", get(handlers::me))
        // GET /api/user/connections
        // The caller's connection list.
        .route("/api/user/connections", get(handlers::connections))
        // POST /api/post
        // Publishes a post on the caller's own wall.
        .route("/api/post", post(handlers::write_post))
        // GET /api/user/{user_seq}/post/list?offset=...&limit=...
        // A user's wall, newest first; limit is clamped to at most 5.
        .route("/api/user/{user_seq}/post/list", get(handlers::list_posts))
        // PATCH /api/user/{user_seq}/post/{post_seq}/like
        // Idempotently records the caller's like on a post.
        .route(
            "/api/user/{user_seq}/post/{post_seq}/like",
            patch(handlers::like_post),
        )
        // POST /api/user/{user_seq}/post/{post_seq}/comment
        // Comments on a post; bumps the post's comment counter.
        .route(
            "/api/user/{user_seq}/post/{post_seq}/comment",
            post(handlers::write_comment),
        )
        // GET /api/user/{user_seq}/post/{post_seq}/comment/list
        // All comments on a post; an unreachable post yields an empty list.
        .route(
            "/api/user/{user_seq}/post/{post_seq}/comment/list",
            get(handlers::list_comments),
        )
}
