use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;

/// FriendshipLookup
///
/// The external collaborator the friend strategy queries: given a user, which
/// user ids are they connected to. The production implementation is the
/// Postgres repository; tests substitute canned data. A lookup failure is
/// surfaced, never swallowed — a grant decision is not made on failed data.
#[async_trait]
pub trait FriendshipLookup: Send + Sync {
    async fn find_connected_ids(&self, user_seq: i64) -> Result<Vec<i64>, Error>;
}

/// GrantStrategy
///
/// One authorization concern with exactly one question: may `user_seq` act on
/// a resource owned by `target_seq`? Strategies are independent and unaware of
/// each other; composition happens in [`GrantStrategies`].
#[async_trait]
pub trait GrantStrategy: Send + Sync {
    async fn grant(&self, user_seq: i64, target_seq: i64) -> Result<bool, Error>;
}

/// SelfGrant
///
/// Grants when the caller *is* the resource owner.
pub struct SelfGrant;

#[async_trait]
impl GrantStrategy for SelfGrant {
    async fn grant(&self, user_seq: i64, target_seq: i64) -> Result<bool, Error> {
        Ok(user_seq == target_seq)
    }
}

/// FriendGrant
///
/// Grants when the resource owner is in the caller's connection set. This is
/// the one strategy that costs a store lookup per evaluation.
pub struct FriendGrant {
    connections: Arc<dyn FriendshipLookup>,
}

impl FriendGrant {
    pub fn new(connections: Arc<dyn FriendshipLookup>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl GrantStrategy for FriendGrant {
    async fn grant(&self, user_seq: i64, target_seq: i64) -> Result<bool, Error> {
        let connected = self.connections.find_connected_ids(user_seq).await?;
        Ok(connected.contains(&target_seq))
    }
}

/// GrantStrategies
///
/// The ordered strategy list combined with logical OR: access is granted as
/// soon as any strategy grants. This is the designed extension point — a
/// "friend of friend" rule is one more entry in the list, not a change to the
/// voter.
pub struct GrantStrategies {
    strategies: Vec<Box<dyn GrantStrategy>>,
}

impl GrantStrategies {
    pub fn new(strategies: Vec<Box<dyn GrantStrategy>>) -> Self {
        Self { strategies }
    }

    /// The production set: self-access first (free), then friendship (one lookup).
    pub fn self_or_friend(connections: Arc<dyn FriendshipLookup>) -> Self {
        Self::new(vec![
            Box::new(SelfGrant),
            Box::new(FriendGrant::new(connections)),
        ])
    }

    /// grant
    ///
    /// Any-match over the strategies, short-circuiting on the first grant.
    /// Strategy errors propagate: an undecidable strategy must not be read as
    /// either outcome.
    pub async fn grant(&self, user_seq: i64, target_seq: i64) -> Result<bool, Error> {
        for strategy in &self.strategies {
            if strategy.grant(user_seq, target_seq).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
