use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use async_trait::async_trait;
use regex::Regex;

use crate::{AppState, error::Error};

use super::{grant::GrantStrategies, identity::Identity};

/// Decision
///
/// A single voter's verdict on one request. `Abstain` means "not my concern" —
/// a voter whose path pattern does not match, or that cannot evaluate, steps
/// aside rather than guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    Denied,
    Abstain,
}

/// decide
///
/// The unanimous combining rule: any single `Denied` vetoes the request, and
/// at least one `Granted` is required — a round where every voter abstains
/// denies. Pure function over the collected votes.
pub fn decide(votes: &[Decision]) -> bool {
    let mut granted = false;
    for vote in votes {
        match vote {
            Decision::Denied => return false,
            Decision::Granted => granted = true,
            Decision::Abstain => {}
        }
    }
    granted
}

/// AccessVoter
///
/// One access-control concern. Voters see the resolved identity (if any) and
/// the request path, and nothing else; they must not mutate anything. An error
/// is a failure to *evaluate*, distinct from a `Denied` vote, and aborts the
/// round.
#[async_trait]
pub trait AccessVoter: Send + Sync {
    async fn vote(&self, identity: Option<&Identity>, path: &str) -> Result<Decision, Error>;
}

/// RoleVoter
///
/// The coarse authentication gate: a fixed list of permitted paths is open to
/// everyone, paths outside the API surface are not its concern to block, and
/// everything else requires an established identity. Roles are validated at
/// identity construction time, so "identity present" implies the USER
/// authority here.
pub struct RoleVoter {
    permitted: Vec<String>,
}

impl RoleVoter {
    pub fn new(permitted: Vec<String>) -> Self {
        Self { permitted }
    }
}

#[async_trait]
impl AccessVoter for RoleVoter {
    async fn vote(&self, identity: Option<&Identity>, path: &str) -> Result<Decision, Error> {
        if self.permitted.iter().any(|p| p == path) {
            return Ok(Decision::Granted);
        }
        if !path.starts_with("/api") {
            return Ok(Decision::Granted);
        }
        Ok(if identity.is_some() {
            Decision::Granted
        } else {
            Decision::Denied
        })
    }
}

/// ConnectionBasedVoter
///
/// The relationship-aware voter: on paths addressing another user's post
/// resources, it extracts the resource owner's id from the path and delegates
/// to the grant strategies. Outside its pattern it grants (it has no opinion
/// but must not veto); with no identity, or an owner id it cannot parse, it
/// abstains and leaves the verdict to the rest of the round.
pub struct ConnectionBasedVoter {
    pattern: Regex,
    strategies: GrantStrategies,
}

impl ConnectionBasedVoter {
    pub fn new(pattern: Regex, strategies: GrantStrategies) -> Self {
        Self { pattern, strategies }
    }

    /// The production scope: everything under `/api/user/{id}/post/`.
    pub fn for_user_post_resources(strategies: GrantStrategies) -> Self {
        let pattern = Regex::new(r"^/api/user/(\d+)/post/.*$")
            .expect("user-post resource pattern is a valid regex");
        Self::new(pattern, strategies)
    }

    /// The resource owner's id, when the path is in scope and the captured
    /// digits fit an i64.
    fn extract_target_seq(&self, path: &str) -> Option<Option<i64>> {
        let captures = self.pattern.captures(path)?;
        Some(captures.get(1).and_then(|m| m.as_str().parse::<i64>().ok()))
    }
}

#[async_trait]
impl AccessVoter for ConnectionBasedVoter {
    async fn vote(&self, identity: Option<&Identity>, path: &str) -> Result<Decision, Error> {
        let Some(target) = self.extract_target_seq(path) else {
            // Out of scope; never a veto.
            return Ok(Decision::Granted);
        };
        let Some(identity) = identity else {
            return Ok(Decision::Abstain);
        };
        let Some(target_seq) = target else {
            // Matched the pattern but the id does not fit: undecidable here.
            return Ok(Decision::Abstain);
        };

        Ok(if self.strategies.grant(identity.user_seq, target_seq).await? {
            Decision::Granted
        } else {
            Decision::Denied
        })
    }
}

/// AccessDecisionManager
///
/// Runs the full voter round for a request and combines the votes with
/// [`decide`]. A voter that fails to evaluate aborts the round with its error;
/// access is never concluded from incomplete votes.
pub struct AccessDecisionManager {
    voters: Vec<Box<dyn AccessVoter>>,
}

impl AccessDecisionManager {
    pub fn new(voters: Vec<Box<dyn AccessVoter>>) -> Self {
        Self { voters }
    }

    pub async fn check(&self, identity: Option<&Identity>, path: &str) -> Result<bool, Error> {
        let mut votes = Vec::with_capacity(self.voters.len());
        for voter in &self.voters {
            votes.push(voter.vote(identity, path).await?);
        }
        Ok(decide(&votes))
    }
}

/// access_control
///
/// The route-layer middleware guarding the protected subtree. Runs after the
/// authentication filter (the identity, if any, is already in the request
/// scope) and before the handler — a denied request never reaches handler
/// code. Denial without an identity is a 401; with one, a 403.
pub async fn access_control(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let identity = request.extensions().get::<Identity>().cloned();
    let path = request.uri().path().to_string();

    if !state.decisions.check(identity.as_ref(), &path).await? {
        return Err(match identity {
            Some(identity) => {
                tracing::debug!(user_seq = identity.user_seq, path, "access denied");
                Error::Forbidden
            }
            None => Error::Unauthorized,
        });
    }

    Ok(next.run(request).await)
}
