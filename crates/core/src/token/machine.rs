//! Token state machine.
//!
//! The authoritative transition function. Given a token, an action, the
//! actor and the current time it either returns the change to commit or
//! the business error explaining why not. It never touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::actor::{ActorContext, permissions};
use crate::token::approval::ApprovalLevelResolver;
use crate::token::delivery::{DeliveryCompletionHandler, DeliveryInput};
use crate::token::error::TokenError;
use crate::token::evidence::check_optional;
use crate::token::policy::PolicyTable;
use crate::token::types::{
    ApprovalLevel, Cancellation, EvidenceRef, LevelApproval, Rejection, Token, TokenChange,
    TokenStatus, ValidationRecord,
};
use crate::token::validation::ValidationRouter;

/// Optional notes and evidence captured with an approval or validation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvidenceInput {
    /// Free-text notes.
    pub notes: Option<String>,
    /// Captured signature.
    pub signature: Option<EvidenceRef>,
    /// Captured photo.
    pub photo: Option<EvidenceRef>,
}

impl EvidenceInput {
    fn check(&self) -> Result<(), TokenError> {
        check_optional("signature", self.signature.as_ref())?;
        check_optional("photo", self.photo.as_ref())
    }
}

/// An action requested on a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAction {
    /// Send a draft into approval.
    Submit,
    /// Grant one approval level.
    Approve {
        /// The level being granted.
        level: ApprovalLevel,
        /// Notes and evidence.
        evidence: EvidenceInput,
    },
    /// Turn down at the outstanding level.
    Reject {
        /// Mandatory reason.
        reason: String,
    },
    /// Withdraw a draft or pending token.
    Cancel,
    /// Consume an approved token.
    Validate {
        /// Notes and evidence.
        evidence: EvidenceInput,
    },
    /// Hand over a uniform delivery.
    CompleteDelivery(DeliveryInput),
}

impl TokenAction {
    /// Short name of the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::Cancel => "cancel",
            Self::Validate { .. } => "validate",
            Self::CompleteDelivery(_) => "complete delivery of",
        }
    }
}

/// A checked transition, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransition {
    /// Status the write must still find in storage.
    pub expected_status: TokenStatus,
    /// The change with its audit data.
    pub change: TokenChange,
    /// The token after the change.
    pub token: Token,
}

/// Which actions an actor may currently perform on a token.
///
/// Visibility hints only; every mutation re-runs the full guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllowedActions {
    /// May submit the draft.
    pub submit: bool,
    /// Level the actor may approve now, if any.
    pub approve: Option<ApprovalLevel>,
    /// May reject at the outstanding level.
    pub reject: bool,
    /// May cancel.
    pub cancel: bool,
    /// May validate.
    pub validate: bool,
    /// May complete the delivery.
    pub complete_delivery: bool,
}

/// The token state machine.
#[derive(Debug, Clone)]
pub struct TokenStateMachine {
    router: ValidationRouter,
}

impl TokenStateMachine {
    /// Creates a state machine routing validations by `policy`.
    #[must_use]
    pub fn new(policy: &PolicyTable) -> Self {
        Self {
            router: ValidationRouter::from_policy(policy),
        }
    }

    /// The validation router in use.
    #[must_use]
    pub const fn router(&self) -> &ValidationRouter {
        &self.router
    }

    /// Evaluates `action` against `token`.
    ///
    /// # Arguments
    /// * `token` - The token as last read from storage
    /// * `action` - The requested action
    /// * `actor` - The authenticated actor
    /// * `now` - Server time
    ///
    /// # Returns
    /// * `Ok(TokenTransition)` with the change to commit
    /// * `Err(TokenError)` if a guard fails; nothing is mutated
    pub fn apply(
        &self,
        token: &Token,
        action: TokenAction,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenTransition, TokenError> {
        if token.status.is_terminal() {
            return Err(TokenError::invalid(token.status, action.name()));
        }

        let change = match action {
            TokenAction::Submit => Self::submit(token, actor, now)?,
            TokenAction::Approve { level, evidence } => {
                Self::approve(token, level, evidence, actor, now)?
            }
            TokenAction::Reject { reason } => Self::reject(token, reason, actor, now)?,
            TokenAction::Cancel => Self::cancel(token, actor, now)?,
            TokenAction::Validate { evidence } => self.validate(token, evidence, actor, now)?,
            TokenAction::CompleteDelivery(input) => {
                DeliveryCompletionHandler::complete(token, input, actor, now)?
            }
        };

        Ok(Self::transition(token, change))
    }

    /// Expires a token whose validity window has passed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the token is terminal or still valid.
    pub fn expire(token: &Token, now: DateTime<Utc>) -> Result<TokenTransition, TokenError> {
        if token.status.is_terminal() || token.valid_until >= now {
            return Err(TokenError::invalid(token.status, "expire"));
        }
        let change = TokenChange::Expire {
            new_status: TokenStatus::Expired,
            expired_at: now,
        };
        Ok(Self::transition(token, change))
    }

    /// Dry-runs the guards of every action.
    #[must_use]
    pub fn allowed_actions(
        &self,
        token: &Token,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> AllowedActions {
        if token.status.is_terminal() {
            return AllowedActions::default();
        }
        let approve = ApprovalLevelResolver::outstanding_level(token)
            .filter(|level| ApprovalLevelResolver::resolve(token, *level, actor).is_ok());

        AllowedActions {
            submit: Self::check_submit(token, actor).is_ok(),
            approve,
            reject: Self::check_reject(token, actor).is_ok(),
            cancel: Self::check_cancel(token, actor).is_ok(),
            validate: self.check_validate(token, actor, now).is_ok(),
            complete_delivery: DeliveryCompletionHandler::check_ready(token).is_ok(),
        }
    }

    fn transition(token: &Token, change: TokenChange) -> TokenTransition {
        let mut next = token.clone();
        next.apply(&change);
        TokenTransition {
            expected_status: token.status,
            change,
            token: next,
        }
    }

    fn check_submit(token: &Token, actor: &ActorContext) -> Result<TokenStatus, TokenError> {
        if token.status != TokenStatus::Draft {
            return Err(TokenError::invalid(token.status, "submit"));
        }
        if token.requester_id != actor.user_id && !actor.elevated {
            return Err(TokenError::Forbidden(
                "only the requester may submit this token".to_string(),
            ));
        }
        Ok(ApprovalLevelResolver::initial_status(&token.requirements))
    }

    fn submit(
        token: &Token,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        let new_status = Self::check_submit(token, actor)?;
        Ok(TokenChange::Submit {
            new_status,
            submitted_at: now,
        })
    }

    fn approve(
        token: &Token,
        level: ApprovalLevel,
        evidence: EvidenceInput,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        let decision = ApprovalLevelResolver::resolve(token, level, actor)?;
        evidence.check()?;

        Ok(TokenChange::Approve {
            level: decision.level,
            new_status: decision.next_status,
            approval: LevelApproval {
                approved_at: now,
                approved_by: actor.user_id,
                notes: evidence.notes,
                signature: evidence.signature,
                photo: evidence.photo,
            },
        })
    }

    fn check_reject(token: &Token, actor: &ActorContext) -> Result<ApprovalLevel, TokenError> {
        let level = ApprovalLevelResolver::outstanding_level(token)
            .ok_or_else(|| TokenError::invalid(token.status, "reject"))?;
        if !ApprovalLevelResolver::has_authority(actor, token, level) {
            return Err(TokenError::Forbidden(format!(
                "no level {} authority to reject this token",
                level.number()
            )));
        }
        Ok(level)
    }

    fn reject(
        token: &Token,
        reason: String,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        let level = Self::check_reject(token, actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TokenError::ValidationFailed(
                "rejection reason is required".to_string(),
            ));
        }

        Ok(TokenChange::Reject {
            new_status: TokenStatus::Rejected,
            rejection: Rejection {
                rejected_by: actor.user_id,
                rejected_at: now,
                level,
                reason: reason.to_string(),
            },
        })
    }

    fn check_cancel(token: &Token, actor: &ActorContext) -> Result<(), TokenError> {
        if token.status != TokenStatus::Draft && !token.status.is_pending() {
            return Err(TokenError::invalid(token.status, "cancel"));
        }
        let allowed = token.requester_id == actor.user_id
            || actor.elevated
            || actor.has_permission(permissions::CANCEL_ANY);
        if !allowed {
            return Err(TokenError::Forbidden(
                "only the requester may cancel this token".to_string(),
            ));
        }
        Ok(())
    }

    fn cancel(
        token: &Token,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        Self::check_cancel(token, actor)?;
        Ok(TokenChange::Cancel {
            new_status: TokenStatus::Cancelled,
            cancellation: Cancellation {
                cancelled_by: actor.user_id,
                cancelled_at: now,
            },
        })
    }

    fn check_validate(
        &self,
        token: &Token,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        if token.status != TokenStatus::Approved {
            return Err(TokenError::invalid(token.status, "validate"));
        }
        self.router
            .authorize(actor, token.token_type(), token.status)?;
        if !token.is_within_validity(now) {
            return Err(TokenError::OutOfValidityWindow {
                valid_from: token.valid_from,
                valid_until: token.valid_until,
                at: now,
            });
        }
        Ok(())
    }

    fn validate(
        &self,
        token: &Token,
        evidence: EvidenceInput,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        self.check_validate(token, actor, now)?;
        evidence.check()?;

        Ok(TokenChange::Validate {
            new_status: TokenStatus::Used,
            validation: ValidationRecord {
                validated_by: actor.user_id,
                validated_at: now,
                notes: evidence.notes,
                signature: evidence.signature,
                photo: evidence.photo,
            },
        })
    }
}
