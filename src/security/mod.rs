//! The authentication & access-control subsystem.
//!
//! Request flow: `filter::authenticate_request` runs once per inbound request,
//! turning a verified bearer token into a request-scoped [`Identity`] (or
//! leaving the request unauthenticated). On the protected subtree,
//! `voter::access_control` then asks every [`AccessVoter`] whether the caller
//! may proceed; the decision is unanimous. The login/join path goes through
//! [`AuthenticationProvider`] instead, which is the only place credentials are
//! ever compared.

pub mod filter;
pub mod grant;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod provider;
pub mod voter;

pub use filter::authenticate_request;
pub use grant::{FriendGrant, FriendshipLookup, GrantStrategies, GrantStrategy, SelfGrant};
pub use identity::Identity;
pub use jwt::{Claims, Jwt};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use provider::AuthenticationProvider;
pub use voter::{
    AccessDecisionManager, AccessVoter, ConnectionBasedVoter, Decision, RoleVoter, access_control,
    decide,
};

use std::sync::Arc;

/// Role
///
/// The closed set of authorities a token can carry. Roles travel inside the
/// signed token and are never looked up from storage on a per-request basis —
/// the stateless-session design means authorization-by-role costs no database
/// round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
}

impl Role {
    /// The wire representation carried in the token's `roles` claim.
    pub fn value(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
        }
    }
}

/// Paths reachable without a token: login, join, email pre-check, health.
pub const PUBLIC_API_PATHS: [&str; 4] = [
    "/api/auth",
    "/api/user/join",
    "/api/user/exists",
    "/api/_hcheck",
];

/// access_decision_manager
///
/// Assembles the production voter pipeline: the role voter (public paths are
/// permitted, everything else under `/api` requires an authenticated USER) and
/// the connection-based voter guarding `/api/user/{id}/post/...` resources
/// with the self-or-friend grant strategies.
pub fn access_decision_manager(connections: Arc<dyn FriendshipLookup>) -> AccessDecisionManager {
    AccessDecisionManager::new(vec![
        Box::new(RoleVoter::new(
            PUBLIC_API_PATHS.iter().map(|p| p.to_string()).collect(),
        )),
        Box::new(ConnectionBasedVoter::for_user_post_resources(
            GrantStrategies::self_or_friend(connections),
        )),
    ])
}
