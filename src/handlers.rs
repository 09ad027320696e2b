use crate::{
    AppState,
    error::{ApiResult, Error},
    models::{
        AuthenticationRequest, AuthenticationResult, Comment, CommentRequest, ConnectedUser,
        ExistenceRequest, JoinRequest, Post, PostingRequest, UserDto,
    },
    security::Identity,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;

// --- Filter Structs ---

/// PostFilter
///
/// Defines the accepted query parameters for the wall listing endpoint.
/// Both parameters are optional and are normalized rather than rejected:
/// a negative offset becomes 0, and the limit is clamped to 1..=5.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PostFilter {
    /// Number of posts to skip, newest first.
    pub offset: Option<i64>,
    /// Page size; at most 5 posts per page.
    pub limit: Option<i64>,
}

impl PostFilter {
    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(5).clamp(1, 5)
    }
}

// --- Handlers ---

/// health
///
/// [Public Route] Liveness probe; returns the current epoch milliseconds.
#[utoipa::path(
    get,
    path = "/api/_hcheck",
    responses((status = 200, description = "Service is up", body = i64))
)]
pub async fn health() -> Json<ApiResult<i64>> {
    Json(ApiResult::ok(Utc::now().timestamp_millis()))
}

/// authenticate
///
/// [Public Route] Exchanges an email/password pair for a session token plus
/// the caller's profile.
///
/// *Note*: an unknown email and a wrong password produce byte-identical 401
/// responses, so this endpoint cannot be used to probe which emails exist.
#[utoipa::path(
    post,
    path = "/api/auth",
    request_body = AuthenticationRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthenticationResult),
        (status = 401, description = "Unknown email or wrong password")
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<AuthenticationRequest>,
) -> Result<Json<ApiResult<AuthenticationResult>>, Error> {
    let result = state
        .authenticator
        .authenticate(&payload.principal, &payload.credentials)
        .await
        .map_err(|e| match e {
            Error::NotFound | Error::BadCredentials => Error::Unauthorized,
            other => other,
        })?;
    Ok(Json(ApiResult::ok(result)))
}

/// join
///
/// [Public Route] Registers a new user and logs them straight in, returning
/// the same token-plus-profile shape as the login endpoint.
#[utoipa::path(
    post,
    path = "/api/user/join",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Registered", body = AuthenticationResult),
        (status = 400, description = "Invalid input or duplicated email")
    )
)]
pub async fn join(
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<ApiResult<AuthenticationResult>>, Error> {
    let result = state
        .authenticator
        .join(&payload.name, &payload.principal, &payload.credentials)
        .await?;
    Ok(Json(ApiResult::ok(result)))
}

/// check_email
///
/// [Public Route] Pre-registration check: does a user with this email already
/// exist? Used by signup forms before submitting a join request.
#[utoipa::path(
    post,
    path = "/api/user/exists",
    request_body = ExistenceRequest,
    responses((status = 200, description = "Whether the email is taken", body = bool))
)]
pub async fn check_email(
    State(state): State<AppState>,
    Json(payload): Json<ExistenceRequest>,
) -> Result<Json<ApiResult<bool>>, Error> {
    let exists = state
        .repo
        .find_user_by_email(&payload.address)
        .await?
        .is_some();
    Ok(Json(ApiResult::ok(exists)))
}

/// me
///
/// [Authenticated Route] The caller's own profile, fetched fresh from storage
/// (the token carries identity, not the profile's mutable fields).
#[utoipa::path(
    get,
    path = "/api/user/me",
    responses((status = 200, description = "My profile", body = UserDto))
)]
pub async fn me(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResult<UserDto>>, Error> {
    let user = state
        .repo
        .find_user_by_seq(identity.user_seq)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(ApiResult::ok(user.into())))
}

/// connections
///
/// [Authenticated Route] The caller's connection list, most recent first.
#[utoipa::path(
    get,
    path = "/api/user/connections",
    responses((status = 200, description = "My connections", body = [ConnectedUser]))
)]
pub async fn connections(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResult<Vec<ConnectedUser>>>, Error> {
    let connected = state.repo.find_connected_users(identity.user_seq).await?;
    Ok(Json(ApiResult::ok(connected)))
}

/// write_post
///
/// [Authenticated Route] Publishes a post on the caller's own wall.
#[utoipa::path(
    post,
    path = "/api/post",
    request_body = PostingRequest,
    responses((status = 200, description = "Created post", body = Post))
)]
pub async fn write_post(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<PostingRequest>,
) -> Result<Json<ApiResult<Post>>, Error> {
    if payload.contents.trim().is_empty() {
        return Err(Error::BadRequest("contents must not be empty.".to_string()));
    }
    let post = state
        .repo
        .insert_post(identity.user_seq, &payload.contents)
        .await?;
    Ok(Json(ApiResult::ok(post)))
}

/// list_posts
///
/// [Authenticated Route] A user's wall, newest first. Reaching another user's
/// wall requires a connection — the access layer has already vetoed strangers
/// before this handler runs, so no ownership check is repeated here.
#[utoipa::path(
    get,
    path = "/api/user/{user_seq}/post/list",
    params(PostFilter),
    responses(
        (status = 200, description = "The user's posts", body = [Post]),
        (status = 403, description = "Not connected to this user")
    )
)]
pub async fn list_posts(
    identity: Identity,
    State(state): State<AppState>,
    Path(user_seq): Path<i64>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<ApiResult<Vec<Post>>>, Error> {
    let posts = state
        .repo
        .find_posts(user_seq, identity.user_seq, filter.offset(), filter.limit())
        .await?;
    Ok(Json(ApiResult::ok(posts)))
}

/// like_post
///
/// [Authenticated Route] Records the caller's like on a post. Idempotent: a
/// second like from the same caller changes nothing, and the returned post
/// always reflects `likes_of_me = true`.
#[utoipa::path(
    patch,
    path = "/api/user/{user_seq}/post/{post_seq}/like",
    responses(
        (status = 200, description = "The liked post", body = Post),
        (status = 404, description = "No such post on this user's wall")
    )
)]
pub async fn like_post(
    identity: Identity,
    State(state): State<AppState>,
    Path((user_seq, post_seq)): Path<(i64, i64)>,
) -> Result<Json<ApiResult<Post>>, Error> {
    let post = state
        .repo
        .like_post(post_seq, user_seq, identity.user_seq)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(ApiResult::ok(post)))
}

/// write_comment
///
/// [Authenticated Route] Comments on a post. The post must exist on the
/// addressed user's wall; commenting on a missing post is a 404, not a silent
/// insert.
#[utoipa::path(
    post,
    path = "/api/user/{user_seq}/post/{post_seq}/comment",
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Created comment", body = Comment),
        (status = 404, description = "No such post on this user's wall")
    )
)]
pub async fn write_comment(
    identity: Identity,
    State(state): State<AppState>,
    Path((user_seq, post_seq)): Path<(i64, i64)>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<ApiResult<Comment>>, Error> {
    if payload.contents.trim().is_empty() {
        return Err(Error::BadRequest("contents must not be empty.".to_string()));
    }
    state
        .repo
        .find_post(post_seq, user_seq, identity.user_seq)
        .await?
        .ok_or(Error::NotFound)?;
    let comment = state
        .repo
        .insert_comment(post_seq, identity.user_seq, &payload.contents)
        .await?;
    Ok(Json(ApiResult::ok(comment)))
}

/// list_comments
///
/// [Authenticated Route] All comments on a post, oldest first. A post that is
/// not on the addressed user's wall yields an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/api/user/{user_seq}/post/{post_seq}/comment/list",
    responses((status = 200, description = "The post's comments", body = [Comment]))
)]
pub async fn list_comments(
    identity: Identity,
    State(state): State<AppState>,
    Path((user_seq, post_seq)): Path<(i64, i64)>,
) -> Result<Json<ApiResult<Vec<Comment>>>, Error> {
    let Some(_) = state
        .repo
        .find_post(post_seq, user_seq, identity.user_seq)
        .await?
    else {
        return Ok(Json(ApiResult::ok(Vec::new())));
    };
    let comments = state.repo.find_comments(post_seq).await?;
    Ok(Json(ApiResult::ok(comments)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_filter_normalizes_paging() {
        let filter = PostFilter {
            offset: Some(-3),
            limit: Some(50),
        };
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.limit(), 5);

        let defaults = PostFilter {
            offset: None,
            limit: None,
        };
        assert_eq!(defaults.offset(), 0);
        assert_eq!(defaults.limit(), 5);

        let zero_limit = PostFilter {
            offset: Some(2),
            limit: Some(0),
        };
        assert_eq!(zero_limit.offset(), 2);
        assert_eq!(zero_limit.limit(), 1);
    }
}
