use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines the endpoints reachable without a session token. These are exactly
/// the paths the role voter lists as permitted — the route table and the voter
/// configuration must stay in lockstep, or a path ends up reachable but
/// vetoed (or worse, the reverse).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/_hcheck
        // Liveness probe for monitoring; returns the current epoch milliseconds.
        .route("/api/_hcheck", get(handlers::health))
        // POST /api/auth
        // Login: exchanges email/password for a session token plus profile.
        .route("/api/auth", post(handlers::authenticate))
        // POST /api/user/join
        // Registration; a successful join is immediately authenticated.
        .route("/api/user/join", post(handlers::join))
        // POST /api/user/exists
        // Signup-form helper: is this email already taken?
        .route("/api/user/exists", post(handlers::check_email))
}
