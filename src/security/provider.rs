use std::sync::Arc;

use crate::{
    error::Error,
    models::AuthenticationResult,
    repository::RepositoryState,
};

use super::{Role, jwt::Jwt, password::PasswordHasher};

/// AuthenticationProvider
///
/// The only component that ever compares credentials. Login and join both end
/// the same way: a signed session token plus the user's public profile, so a
/// fresh signup is immediately authenticated without a second round trip.
pub struct AuthenticationProvider {
    jwt: Arc<Jwt>,
    hasher: Arc<dyn PasswordHasher>,
    repo: RepositoryState,
}

impl AuthenticationProvider {
    pub fn new(jwt: Arc<Jwt>, hasher: Arc<dyn PasswordHasher>, repo: RepositoryState) -> Self {
        Self { jwt, hasher, repo }
    }

    /// authenticate
    ///
    /// Verifies a principal/credential pair and, on success, bumps the user's
    /// login bookkeeping and issues a session token. The distinct failure
    /// variants (unknown principal vs. wrong credential) are for callers with
    /// a need to know — the login endpoint deliberately flattens them.
    pub async fn authenticate(
        &self,
        principal: &str,
        credentials: &str,
    ) -> Result<AuthenticationResult, Error> {
        let user = self
            .repo
            .find_user_by_email(principal)
            .await?
            .ok_or(Error::NotFound)?;

        if !self.hasher.verify(credentials, &user.password)? {
            return Err(Error::BadCredentials);
        }

        let user = self.repo.update_login(user.seq).await?;

        let claims = self
            .jwt
            .claims(user.seq, &user.name, &user.email, &[Role::User]);
        let api_token = self.jwt.issue(&claims)?;

        Ok(AuthenticationResult {
            api_token,
            user: user.into(),
        })
    }

    /// join
    ///
    /// Registers a new user: validates the inputs, rejects duplicate emails,
    /// stores the salted hash (never the raw password), and logs the new user
    /// straight in.
    pub async fn join(
        &self,
        name: &str,
        principal: &str,
        credentials: &str,
    ) -> Result<AuthenticationResult, Error> {
        if name.trim().is_empty() {
            return Err(Error::BadRequest("name must not be empty.".to_string()));
        }
        if principal.trim().is_empty() {
            return Err(Error::BadRequest("email must not be empty.".to_string()));
        }
        if !(4..=15).contains(&credentials.len()) {
            return Err(Error::BadRequest(
                "password length must be between 4 and 15 characters.".to_string(),
            ));
        }

        if self.repo.find_user_by_email(principal).await?.is_some() {
            return Err(Error::EmailDuplicated);
        }

        let hash = self.hasher.hash(credentials)?;
        let user = self.repo.insert_user(name, principal, &hash).await?;

        let claims = self
            .jwt
            .claims(user.seq, &user.name, &user.email, &[Role::User]);
        let api_token = self.jwt.issue(&claims)?;

        Ok(AuthenticationResult {
            api_token,
            user: user.into(),
        })
    }
}
