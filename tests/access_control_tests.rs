use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use sns_api::{
    AppState, ApiResult, Argon2PasswordHasher, Error, FriendshipLookup, Jwt, PasswordHasher,
    RepositoryState, create_router,
    models::{Comment, ConnectedUser, Post, User},
    repository::Repository,
    security::{Claims, Role},
};
use std::{sync::Arc, time::Duration};
use tower::util::ServiceExt;

// --- Mock Repository with a Fixed Connection Graph ---

/// User 1 is connected to user 2 and nobody else.
struct MockGraphRepo {
    fail_lookup: bool,
}

#[async_trait]
impl Repository for MockGraphRepo {
    async fn find_user_by_seq(&self, seq: i64) -> Result<Option<User>, Error> {
        Ok(Some(User {
            seq,
            name: "harry".to_string(),
            email: "harry@gmail.com".to_string(),
            password: "unused".to_string(),
            login_count: 1,
            last_login_at: None,
            create_at: Utc::now(),
        }))
    }
    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, Error> {
        Ok(None)
    }
    async fn insert_user(&self, _name: &str, _email: &str, _password: &str) -> Result<User, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn update_login(&self, _seq: i64) -> Result<User, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn find_connected_users(&self, _user_seq: i64) -> Result<Vec<ConnectedUser>, Error> {
        Ok(vec![])
    }
    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error> {
        FriendshipLookup::find_connected_ids(self, user_seq).await
    }
    async fn insert_post(&self, _user_seq: i64, _contents: &str) -> Result<Post, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn find_posts(
        &self,
        _writer_seq: i64,
        _viewer_seq: i64,
        _offset: i64,
        _limit: i64,
    ) -> Result<Vec<Post>, Error> {
        Ok(vec![])
    }
    async fn find_post(
        &self,
        _post_seq: i64,
        _writer_seq: i64,
        _viewer_seq: i64,
    ) -> Result<Option<Post>, Error> {
        Ok(None)
    }
    async fn like_post(
        &self,
        _post_seq: i64,
        _writer_seq: i64,
        _viewer_seq: i64,
    ) -> Result<Option<Post>, Error> {
        Ok(None)
    }
    async fn insert_comment(
        &self,
        _post_seq: i64,
        _user_seq: i64,
        _contents: &str,
    ) -> Result<Comment, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn find_comments(&self, _post_seq: i64) -> Result<Vec<Comment>, Error> {
        Ok(vec![])
    }
}

#[async_trait]
impl FriendshipLookup for MockGraphRepo {
    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error> {
        if self.fail_lookup {
            return Err(Error::Internal("connection store unreachable".to_string()));
        }
        Ok(if user_seq == 1 { vec![2] } else { vec![] })
    }
}

// --- Helper Functions ---

const TEST_SECRET: &str = "super-secure-test-secret-value-local";
const TEST_ISSUER: &str = "sns-api";

fn token_for(user_seq: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: TEST_ISSUER.to_string(),
        user_key: user_seq,
        name: "harry".to_string(),
        email: "harry@gmail.com".to_string(),
        roles: vec![Role::User.value().to_string()],
        iat: now,
        exp: now + 2 * 60 * 60,
    };
    Jwt::new(TEST_ISSUER, TEST_SECRET, Duration::from_secs(2 * 60 * 60))
        .issue(&claims)
        .unwrap()
}

fn app(repo: MockGraphRepo) -> axum::Router {
    let repo = Arc::new(repo);
    let connections = repo.clone() as Arc<dyn FriendshipLookup>;
    let state = AppState::new(
        repo as RepositoryState,
        connections,
        Arc::new(Argon2PasswordHasher) as Arc<dyn PasswordHasher>,
        sns_api::AppConfig::default(),
    );
    create_router(state)
}

async fn get_as(app: axum::Router, user_seq: i64, uri: &str) -> axum::response::Response {
    let token = token_for(user_seq);
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

// --- Tests ---

#[tokio::test]
async fn own_wall_is_always_reachable() {
    let response = get_as(
        app(MockGraphRepo { fail_lookup: false }),
        1,
        "/api/user/1/post/list",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn connected_users_wall_is_reachable() {
    let response = get_as(
        app(MockGraphRepo { fail_lookup: false }),
        1,
        "/api/user/2/post/list",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn strangers_wall_is_forbidden() {
    let response = get_as(
        app(MockGraphRepo { fail_lookup: false }),
        1,
        "/api/user/3/post/list",
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiResult<Vec<Post>> = serde_json::from_slice(&bytes).unwrap();
    assert!(!body.success);
    let errors = body.errors.unwrap();
    assert_eq!(errors.code, "A002");
    assert_eq!(errors.message, "Authentication error (cause: forbidden)");
}

#[tokio::test]
async fn friendship_is_directional_from_the_caller() {
    // User 2 has no connections of their own; user 1's edge does not help them.
    let response = get_as(
        app(MockGraphRepo { fail_lookup: false }),
        2,
        "/api/user/1/post/list",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn connection_guard_only_covers_post_resources() {
    // /api/user/me is outside the guarded pattern; any authenticated user passes.
    let response = get_as(app(MockGraphRepo { fail_lookup: false }), 3, "/api/user/me").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn guarded_route_without_identity_is_401_not_403() {
    let response = app(MockGraphRepo { fail_lookup: false })
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/user/2/post/list")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lookup_failure_is_a_500_not_a_deny() {
    let response = get_as(
        app(MockGraphRepo { fail_lookup: true }),
        1,
        "/api/user/2/post/list",
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: ApiResult<Vec<Post>> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.errors.unwrap().code, "E001");
}
