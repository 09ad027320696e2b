use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use sns_api::{
    AppState, ApiError, ApiResult, Argon2PasswordHasher, Error, FriendshipLookup, Jwt,
    PasswordHasher, RepositoryState, create_router,
    models::{Comment, ConnectedUser, Post, User, UserDto},
    repository::Repository,
    security::{Claims, Role},
};
use std::{sync::Arc, time::Duration};
use tower::util::ServiceExt;

// --- Mock Repository for Filter Logic ---

struct MockFilterRepo {
    user_to_return: Option<User>,
}

#[async_trait]
impl Repository for MockFilterRepo {
    async fn find_user_by_seq(&self, _seq: i64) -> Result<Option<User>, Error> {
        Ok(self.user_to_return.clone())
    }
    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, Error> {
        Ok(self.user_to_return.clone())
    }
    // Implement all other unused trait methods with placeholders (ensuring they compile)
    async fn insert_user(&self, _name: &str, _email: &str, _password: &str) -> Result<User, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn update_login(&self, _seq: i64) -> Result<User, Error> {
        Err(Error::Internal("not used in this suite".to_string()))
    }
    async fn find_connected_users(&self, _user_seq: i64) -> Result<Vec<ConnectedUser>, Error> {
        Ok(vec![])
    }
    async fn find_connected_ids(&self, _user_seq: i64) -> Result<Vec<i64>, Error> {
        Ok(vec![])
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
impl FriendshipLookup for MockFilterRepo {
    async fn find_connected_ids(&self, _user_seq: i64) -> Result<Vec<i64>, Error> {
        Ok(vec![])
    }
}

// --- Helper Functions ---

// Must match AppConfig::default() so the app's codec verifies our test tokens.
const TEST_SECRET: &str = "super-secure-test-secret-value-local";
const TEST_ISSUER: &str = "sns-api";

fn test_user() -> User {
    User {
        seq: 7,
        name: "harry".to_string(),
        email: "harry@gmail.com".to_string(),
        password: "unused".to_string(),
        login_count: 1,
        last_login_at: None,
        create_at: Utc::now(),
    }
}

fn codec() -> Jwt {
    Jwt::new(TEST_ISSUER, TEST_SECRET, Duration::from_secs(2 * 60 * 60))
}

/// A signed token for the test user whose expiry is `lifetime` from now.
fn token_with_lifetime(lifetime: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: TEST_ISSUER.to_string(),
        user_key: 7,
        name: "harry".to_string(),
        email: "harry@gmail.com".to_string(),
        roles: vec![Role::User.value().to_string()],
        iat: now,
        exp: now + lifetime,
    };
    codec().issue(&claims).unwrap()
}

fn app(repo: MockFilterRepo) -> axum::Router {
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

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = auth {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", None))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ApiResult<UserDto> = body_json(response).await;
    assert!(!body.success);
    let errors: ApiError = body.errors.unwrap();
    assert_eq!(errors.code, "A001");
    assert_eq!(errors.status, 401);
}

#[tokio::test]
async fn garbled_token_on_protected_route_is_401() {
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some("Bearer not.a.token")))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbled_token_on_public_route_is_harmless() {
    // The filter recovers; a public endpoint must not break on a stale token.
    let response = app(MockFilterRepo {
        user_to_return: None,
    })
    .oneshot(get("/api/_hcheck", Some("Bearer not.a.token")))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    let token = token_with_lifetime(2 * 60 * 60);
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Bearer {token}"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResult<UserDto> = body_json(response).await;
    assert!(body.success);
    assert_eq!(body.response.unwrap().email, "harry@gmail.com");
}

#[tokio::test]
async fn near_expiry_token_is_refreshed_on_the_response() {
    // 5 minutes left, threshold is 10: the response must echo a replacement.
    let token = token_with_lifetime(5 * 60);
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Bearer {token}"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = response
        .headers()
        .get("Authorization")
        .expect("refreshed token should be echoed")
        .to_str()
        .unwrap()
        .to_string();
    assert_ne!(refreshed, token);

    let claims = codec().verify(&refreshed).unwrap();
    assert_eq!(claims.user_key, 7);
    assert!(claims.exp - Utc::now().timestamp() > 60 * 60);
}

#[tokio::test]
async fn fresh_token_is_not_refreshed() {
    // 20 minutes left, threshold is 10: no replacement.
    let token = token_with_lifetime(20 * 60);
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Bearer {token}"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let token = token_with_lifetime(-1);
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Bearer {token}"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_header_shapes_are_unauthenticated() {
    let token = token_with_lifetime(2 * 60 * 60);

    // Wrong scheme.
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Basic {token}"))))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Three parts.
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("Bearer {token} extra"))))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn multiple_token_headers_are_unauthenticated() {
    let token = token_with_lifetime(2 * 60 * 60);
    let request = Request::builder()
        .method("GET")
        .uri("/api/user/me")
        .header("Authorization", format!("Bearer {token}"))
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(request)
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let token = token_with_lifetime(2 * 60 * 60);
    let response = app(MockFilterRepo {
        user_to_return: Some(test_user()),
    })
    .oneshot(get("/api/user/me", Some(&format!("bEaReR {token}"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
