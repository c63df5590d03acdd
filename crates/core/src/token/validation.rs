//! Validation routing: which operational pool may consume which token type.

use crate::token::actor::{ActorContext, permissions};
use crate::token::error::TokenError;
use crate::token::policy::PolicyTable;
use crate::token::types::{TokenStatus, TokenType, ValidationPool};

/// Routes token types to validation pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRouter {
    pools: [Option<ValidationPool>; 8],
}

impl ValidationRouter {
    /// Builds the router from the pool column of the policy table.
    #[must_use]
    pub fn from_policy(policy: &PolicyTable) -> Self {
        Self {
            pools: TokenType::ALL.map(|t| policy.pool(t)),
        }
    }

    /// The pool that validates `token_type`.
    #[must_use]
    pub fn pool_for(&self, token_type: TokenType) -> Option<ValidationPool> {
        self.pools[token_type.index()]
    }

    /// Pools the actor belongs to. Elevated actors belong to every pool.
    #[must_use]
    pub fn actor_pools(actor: &ActorContext) -> Vec<ValidationPool> {
        if actor.elevated {
            return vec![ValidationPool::Security, ValidationPool::Payroll];
        }
        let mut pools = Vec::with_capacity(2);
        if actor.has_permission(permissions::VALIDATE_SECURITY) {
            pools.push(ValidationPool::Security);
        }
        if actor.has_permission(permissions::VALIDATE_PAYROLL) {
            pools.push(ValidationPool::Payroll);
        }
        pools
    }

    /// Returns true if the actor's pools intersect the pool owning `token_type`.
    #[must_use]
    pub fn can_validate(&self, actor: &ActorContext, token_type: TokenType) -> bool {
        self.pool_for(token_type)
            .is_some_and(|pool| Self::actor_pools(actor).contains(&pool))
    }

    /// Token types the actor may validate.
    #[must_use]
    pub fn validatable_types(&self, actor: &ActorContext) -> Vec<TokenType> {
        TokenType::ALL
            .into_iter()
            .filter(|t| self.can_validate(actor, *t))
            .collect()
    }

    /// Checks validation rights, distinguishing unvalidatable types from
    /// missing pool membership.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` if the type is never validated
    /// * `Forbidden` if the actor is outside the owning pool
    pub fn authorize(
        &self,
        actor: &ActorContext,
        token_type: TokenType,
        status: TokenStatus,
    ) -> Result<ValidationPool, TokenError> {
        let pool = self
            .pool_for(token_type)
            .ok_or_else(|| TokenError::invalid(status, "validate"))?;
        if !Self::actor_pools(actor).contains(&pool) {
            return Err(TokenError::Forbidden(format!(
                "{token_type} tokens are validated by the {pool} pool"
            )));
        }
        Ok(pool)
    }
}
