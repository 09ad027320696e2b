use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user's canonical identity record stored in the `users` table.
/// The `password` column holds the argon2 PHC hash, never the plaintext; the
/// row type is internal to the repository/service layer and is converted to
/// `UserDto` before anything leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    // Primary key. Also the value carried as the token subject.
    pub seq: i64,
    pub name: String,
    // The user's principal, unique across the table.
    pub email: String,
    // Argon2 PHC string. Compared only inside the authentication service.
    #[serde(skip_serializing, default)]
    pub password: String,
    // Incremented atomically on every successful login.
    pub login_count: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
}

/// Post
///
/// A post on a user's wall. `likes_of_me` is not a column: the repository
/// computes it per query against the viewing user so the client can render
/// the like button state without a second round trip.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, ToSchema)]
pub struct Post {
    pub seq: i64,
    // FK to users.seq (the writer / wall owner).
    pub user_seq: i64,
    pub contents: String,
    pub like_count: i32,
    pub likes_of_me: bool,
    pub comment_count: i32,
    pub create_at: DateTime<Utc>,
}

/// Comment
///
/// A comment under a post. Writing one also bumps the parent post's
/// `comment_count` (kept denormalized, as the post list renders it).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, ToSchema)]
pub struct Comment {
    pub seq: i64,
    pub post_seq: i64,
    // FK to users.seq (the comment author).
    pub user_seq: i64,
    pub contents: String,
    pub create_at: DateTime<Utc>,
}

/// ConnectedUser
///
/// A row of the authenticated user's friend list, joined from `connections`
/// and `users`: who the friend is and when the connection was granted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, ToSchema)]
pub struct ConnectedUser {
    pub seq: i64,
    pub name: String,
    pub email: String,
    pub granted_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// AuthenticationRequest
///
/// Input payload for the login endpoint (POST /api/auth). This is the only
/// request in the system carrying a plaintext secret; it exists transiently on
/// the login path and is neither persisted nor echoed back.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticationRequest {
    /// The user's email address.
    pub principal: String,
    /// The plaintext password, compared against the stored hash.
    pub credentials: String,
}

// Hand-written so the secret can never leak through debug logging.
impl fmt::Debug for AuthenticationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRequest")
            .field("principal", &self.principal)
            .field("credentials", &"[PROTECTED]")
            .finish()
    }
}

/// JoinRequest
///
/// Input payload for the public join endpoint (POST /api/user/join).
/// Field names intentionally mirror `AuthenticationRequest` so clients reuse
/// their login form serialization.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinRequest {
    pub name: String,
    pub principal: String,
    pub credentials: String,
}

impl fmt::Debug for JoinRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinRequest")
            .field("name", &self.name)
            .field("principal", &self.principal)
            .field("credentials", &"[PROTECTED]")
            .finish()
    }
}

/// ExistenceRequest
///
/// Input payload for the email duplication pre-check (POST /api/user/exists).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExistenceRequest {
    pub address: String,
}

/// PostingRequest
///
/// Input payload for writing a new post (POST /api/post).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostingRequest {
    pub contents: String,
}

/// CommentRequest
///
/// Input payload for writing a comment under a post.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub contents: String,
}

// --- Response Schemas (Output) ---

/// UserDto
///
/// The outward-facing projection of a `User` row: everything except the
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct UserDto {
    pub seq: i64,
    pub name: String,
    pub email: String,
    pub login_count: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub create_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            seq: user.seq,
            name: user.name,
            email: user.email,
            login_count: user.login_count,
            last_login_at: user.last_login_at,
            create_at: user.create_at,
        }
    }
}

/// AuthenticationResult
///
/// Output of both the login and join endpoints: a freshly issued API token
/// plus the user it identifies. The client is expected to send the token as
/// `Bearer <apiToken>` on subsequent requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub api_token: String,
    pub user: UserDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_request_debug_masks_credentials() {
        let request = AuthenticationRequest {
            principal: "harry@gmail.com".to_string(),
            credentials: "hunter2".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("harry@gmail.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn user_serialization_never_carries_the_hash() {
        let user = User {
            seq: 1,
            name: "harry".to_string(),
            email: "harry@gmail.com".to_string(),
            password: "$argon2id$v=19$...".to_string(),
            ..User::default()
        };
        let rendered = serde_json::to_string(&user).unwrap();
        assert!(!rendered.contains("argon2id"));
        assert!(!rendered.contains("password"));
    }
}
