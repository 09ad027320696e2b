use crate::error::Error;
use axum::{extract::FromRequestParts, http::request::Parts};

use super::jwt::Claims;

/// Identity
///
/// The resolved identity of an authenticated request: reconstructed fresh from
/// verified token claims on every request, attached to the request scope by the
/// authentication filter, and discarded when the request ends. It is immutable,
/// never shared across requests, and never persisted server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// The user's primary key (the token subject).
    pub user_seq: i64,
    pub email: String,
    pub name: String,
}

impl Identity {
    /// from_claims
    ///
    /// Builds an identity from verified claims. An identity is not valid
    /// without all three fields and at least one carried authority; claims
    /// missing any of these yield `None` and the request stays unauthenticated.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        if claims.email.is_empty() || claims.name.is_empty() || claims.roles.is_empty() {
            return None;
        }
        Some(Self {
            user_seq: claims.user_key,
            email: claims.email.clone(),
            name: claims.name.clone(),
        })
    }
}

/// Identity Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making `Identity` usable as a
/// function argument in any authenticated handler. The filter computes the
/// identity once and threads it through the request extensions — handlers pull
/// it from there as an explicit parameter, never from ambient global state.
///
/// Rejection: the fixed 401 envelope when no identity was established.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::Role;

    fn claims() -> Claims {
        Claims {
            iss: "sns-api".to_string(),
            user_key: 3,
            name: "harry".to_string(),
            email: "harry@gmail.com".to_string(),
            roles: vec![Role::User.value().to_string()],
            iat: 0,
            exp: 1,
        }
    }

    #[test]
    fn builds_from_complete_claims() {
        let identity = Identity::from_claims(&claims()).unwrap();
        assert_eq!(identity.user_seq, 3);
        assert_eq!(identity.email, "harry@gmail.com");
        assert_eq!(identity.name, "harry");
    }

    #[test]
    fn incomplete_claims_yield_no_identity() {
        let mut missing_name = claims();
        missing_name.name.clear();
        assert!(Identity::from_claims(&missing_name).is_none());

        let mut missing_email = claims();
        missing_email.email.clear();
        assert!(Identity::from_claims(&missing_email).is_none());

        let mut no_roles = claims();
        no_roles.roles.clear();
        assert!(Identity::from_claims(&no_roles).is_none());
    }
}
