//! Approval level resolution.
//!
//! Decides whether a level is currently awaitable on a token, whether the
//! actor may grant it, and which status follows.

use crate::token::actor::ActorContext;
use crate::token::error::TokenError;
use crate::token::types::{ApprovalLevel, ApprovalRequirements, Token, TokenStatus};

/// Outcome of a successful level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDecision {
    /// The level being granted.
    pub level: ApprovalLevel,
    /// Status after the grant.
    pub next_status: TokenStatus,
}

/// Stateless resolver for approval levels.
pub struct ApprovalLevelResolver;

impl ApprovalLevelResolver {
    /// The level the token is waiting for, if any.
    #[must_use]
    pub const fn outstanding_level(token: &Token) -> Option<ApprovalLevel> {
        token.status.outstanding_level()
    }

    /// Status a submitted token starts in.
    #[must_use]
    pub fn initial_status(requirements: &ApprovalRequirements) -> TokenStatus {
        requirements
            .first()
            .map_or(TokenStatus::Approved, TokenStatus::pending)
    }

    /// Status after `level` has been granted.
    #[must_use]
    pub fn next_status(requirements: &ApprovalRequirements, level: ApprovalLevel) -> TokenStatus {
        requirements
            .after(level)
            .map_or(TokenStatus::Approved, TokenStatus::pending)
    }

    /// Returns true if the actor may grant `level` on this token.
    #[must_use]
    pub fn has_authority(actor: &ActorContext, token: &Token, level: ApprovalLevel) -> bool {
        actor.has_level_authority(level, token.area.as_deref())
    }

    /// Checks that `actor` may grant `level` on `token` right now.
    ///
    /// State is checked before authority: a wrong level is an
    /// `InvalidTransition` whoever asks.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` if the token is not waiting for `level`, or a
    ///   lower required level is missing
    /// * `Forbidden` if the actor lacks authority at `level`
    pub fn resolve(
        token: &Token,
        level: ApprovalLevel,
        actor: &ActorContext,
    ) -> Result<LevelDecision, TokenError> {
        let awaiting = Self::outstanding_level(token) == Some(level)
            && token.requirements.requires(level)
            && !token.approvals.is_granted(level);
        if !awaiting {
            return Err(TokenError::invalid(token.status, approve_action(level)));
        }

        let missing_lower = level
            .lower()
            .any(|l| token.requirements.requires(l) && !token.approvals.is_granted(l));
        if missing_lower {
            return Err(TokenError::invalid(token.status, approve_action(level)));
        }

        if !Self::has_authority(actor, token, level) {
            return Err(TokenError::Forbidden(format!(
                "no level {} authority for this token",
                level.number()
            )));
        }

        Ok(LevelDecision {
            level,
            next_status: Self::next_status(&token.requirements, level),
        })
    }
}

const fn approve_action(level: ApprovalLevel) -> &'static str {
    match level {
        ApprovalLevel::L1 => "approve level 1 of",
        ApprovalLevel::L2 => "approve level 2 of",
        ApprovalLevel::L3 => "approve level 3 of",
    }
}
