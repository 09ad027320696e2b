use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod security;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::{ApiError, ApiResult, Error};
pub use repository::{PostgresRepository, RepositoryState};
pub use security::{
    AccessDecisionManager, Argon2PasswordHasher, AuthenticationProvider, FriendshipLookup,
    Identity, Jwt, PasswordHasher,
};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas that have been decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::health, handlers::authenticate, handlers::join, handlers::check_email,
        handlers::me, handlers::connections, handlers::write_post, handlers::list_posts,
        handlers::like_post, handlers::write_comment, handlers::list_comments,
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::AuthenticationRequest, models::AuthenticationResult, models::JoinRequest,
            models::ExistenceRequest, models::UserDto, models::ConnectedUser,
            models::PostingRequest, models::Post, models::CommentRequest, models::Comment,
            error::ApiError,
        )
    ),
    tags(
        (name = "sns-api", description = "Social posting API with connection-based access control")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and immutable
/// container holding all essential application services and configuration.
/// The application state is shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Session token codec: issues, verifies and refreshes tokens.
    pub jwt: Arc<Jwt>,
    /// Credential verification and registration.
    pub authenticator: Arc<AuthenticationProvider>,
    /// The voter pipeline consulted by the access-control layer.
    pub decisions: Arc<AccessDecisionManager>,
}

impl AppState {
    /// new
    ///
    /// Wires the service graph from its leaf dependencies. The repository is
    /// passed twice on purpose: once as the full data layer, and once narrowed
    /// to the [`FriendshipLookup`] the friend-grant strategy needs — the voter
    /// pipeline never sees the rest of the repository surface.
    pub fn new(
        repo: RepositoryState,
        connections: Arc<dyn FriendshipLookup>,
        hasher: Arc<dyn PasswordHasher>,
        config: AppConfig,
    ) -> Self {
        let jwt = Arc::new(Jwt::new(
            &config.token_issuer,
            &config.token_secret,
            config.token_expiry,
        ));
        let authenticator = Arc::new(AuthenticationProvider::new(
            jwt.clone(),
            hasher,
            repo.clone(),
        ));
        let decisions = Arc::new(security::access_decision_manager(connections));

        Self {
            repo,
            config,
            jwt,
            authenticator,
            decisions,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers to selectively pull components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Jwt> {
    fn from_ref(app_state: &AppState) -> Arc<Jwt> {
        app_state.jwt.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: behind the authentication filter only — a stale token
        // on a public path must not break the request.
        .merge(public::public_routes())
        // Authenticated Routes: additionally guarded by the voter round. The
        // route layer runs after the authentication filter below, so the
        // identity (if any) is already attached when the voters see the request.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                security::access_control,
            )),
        )
        // The authentication filter: one pass over every request, turning a
        // verified bearer token into a request-scoped identity.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::authenticate_request,
        ))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: Generates a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: Wraps the entire request/response lifecycle in a tracing span.
                // Uses the `trace_span_logger` to include the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: Ensures the generated x-request-id header is
                // returned to the client and injected into subsequent service calls.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (Applied last, allowing all traffic in/out after processing)
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize the tracing span creation.
/// It extracts the `x-request-id` header (if present) and includes it in the
/// structured logging metadata alongside the HTTP method and URI.
///
/// *Goal*: Ensure every log line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // The structured log format used by the tracing macros.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
