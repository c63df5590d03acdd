//! Token service: loads a token, runs the state machine and commits the
//! change with a compare-and-swap on its status.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::token::actor::ActorContext;
use crate::token::approval::ApprovalLevelResolver;
use crate::token::clock::Clock;
use crate::token::delivery::DeliveryInput;
use crate::token::error::TokenError;
use crate::token::machine::{AllowedActions, EvidenceInput, TokenAction, TokenStateMachine};
use crate::token::policy::PolicyTable;
use crate::token::store::TokenStore;
use crate::token::types::{
    ApprovalLevel, DeliveryRecord, LevelApprovals, Token, TokenDetail, TokenStatus,
};

/// Default number of times a lost compare-and-swap is re-evaluated.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 1;

/// Input for creating a token. The requester is the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewToken {
    /// Operational area, scopes approval authority.
    pub area: Option<String>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Type-specific data; fixes the token type.
    pub detail: TokenDetail,
    /// Submit straight into approval instead of staying in draft.
    #[serde(default = "default_submit")]
    pub submit: bool,
}

const fn default_submit() -> bool {
    true
}

/// Generates an opaque, URL-safe token code (22 characters).
#[must_use]
pub fn generate_token_code() -> String {
    let bytes: [u8; 16] = rand::random();
    base64_url::encode(&bytes)
}

/// Formats the human-readable number, e.g. `TK-2026-000042`.
#[must_use]
pub fn format_display_number(year: i32, sequence: u64) -> String {
    format!("TK-{year}-{sequence:06}")
}

/// Orchestrates token operations over a [`TokenStore`].
pub struct TokenService {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    policy: Arc<PolicyTable>,
    machine: TokenStateMachine,
    conflict_retries: u32,
}

impl TokenService {
    /// Creates a service.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, policy: Arc<PolicyTable>) -> Self {
        let machine = TokenStateMachine::new(&policy);
        Self {
            store,
            clock,
            policy,
            machine,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Sets how many times a lost race is re-evaluated before `Conflict`.
    #[must_use]
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// The policy table in use.
    #[must_use]
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Creates a token requested by `actor`.
    ///
    /// Approval requirements are resolved here and frozen on the token.
    ///
    /// # Errors
    ///
    /// * `ValidationFailed` for a malformed window or detail
    /// * `Storage` if persistence fails
    pub async fn create(&self, input: NewToken, actor: &ActorContext) -> Result<Token, TokenError> {
        check_new_token(&input)?;

        let now = self.clock.now();
        let resolved = self.policy.resolve_detail(&input.detail);
        let year = now.year();
        let sequence = self.store.next_display_sequence(year).await?;

        let mut token = Token {
            id: Uuid::new_v4(),
            display_number: format_display_number(year, sequence),
            token_code: generate_token_code(),
            status: TokenStatus::Draft,
            requester_id: actor.user_id,
            area: input.area.map(|a| a.trim().to_string()),
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            requirements: resolved.requirements,
            approvals: LevelApprovals::default(),
            rejection: None,
            cancellation: None,
            validation: None,
            expired_at: None,
            detail: input.detail,
            created_at: now,
            updated_at: now,
        };

        if input.submit {
            token = self
                .machine
                .apply(&token, TokenAction::Submit, actor, now)?
                .token;
        }

        self.store.insert(&token).await?;
        info!(
            token_id = %token.id,
            display_number = %token.display_number,
            token_type = %token.token_type(),
            status = %token.status,
            requester = %actor.user_id,
            "Token created"
        );
        Ok(token)
    }

    /// Loads a token by id.
    pub async fn get(&self, id: Uuid) -> Result<Token, TokenError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TokenError::NotFound(id.to_string()))
    }

    /// Loads a token by its opaque code.
    pub async fn get_by_code(&self, token_code: &str) -> Result<Token, TokenError> {
        self.store
            .find_by_code(token_code)
            .await?
            .ok_or_else(|| TokenError::NotFound(token_code.to_string()))
    }

    /// Submits a draft.
    pub async fn submit(&self, id: Uuid, actor: &ActorContext) -> Result<Token, TokenError> {
        let token = self.get(id).await?;
        self.commit(token, TokenAction::Submit, actor).await
    }

    /// Grants `level`.
    pub async fn approve(
        &self,
        id: Uuid,
        level: ApprovalLevel,
        evidence: EvidenceInput,
        actor: &ActorContext,
    ) -> Result<Token, TokenError> {
        let token = self.get(id).await?;
        self.commit(token, TokenAction::Approve { level, evidence }, actor)
            .await
    }

    /// Rejects at the outstanding level.
    pub async fn reject(
        &self,
        id: Uuid,
        reason: String,
        actor: &ActorContext,
    ) -> Result<Token, TokenError> {
        let token = self.get(id).await?;
        self.commit(token, TokenAction::Reject { reason }, actor).await
    }

    /// Cancels a draft or pending token.
    pub async fn cancel(&self, id: Uuid, actor: &ActorContext) -> Result<Token, TokenError> {
        let token = self.get(id).await?;
        self.commit(token, TokenAction::Cancel, actor).await
    }

    /// Validates (consumes) an approved token identified by its code.
    pub async fn validate(
        &self,
        token_code: &str,
        evidence: EvidenceInput,
        actor: &ActorContext,
    ) -> Result<Token, TokenError> {
        let token = self.get_by_code(token_code).await?;
        self.commit(token, TokenAction::Validate { evidence }, actor)
            .await
    }

    /// Completes a uniform delivery.
    pub async fn complete_delivery(
        &self,
        id: Uuid,
        input: DeliveryInput,
        actor: &ActorContext,
    ) -> Result<Token, TokenError> {
        let token = self.get(id).await?;
        self.commit(token, TokenAction::CompleteDelivery(input), actor)
            .await
    }

    /// Pending tokens whose outstanding level the actor may grant.
    pub async fn list_pending_approvals(
        &self,
        actor: &ActorContext,
    ) -> Result<Vec<Token>, TokenError> {
        let pending = [
            TokenStatus::PendingL1,
            TokenStatus::PendingL2,
            TokenStatus::PendingL3,
        ];
        let tokens = self.store.list_by_status(&pending, None).await?;
        Ok(tokens
            .into_iter()
            .filter(|t| {
                ApprovalLevelResolver::outstanding_level(t)
                    .is_some_and(|level| ApprovalLevelResolver::has_authority(actor, t, level))
            })
            .collect())
    }

    /// Approved tokens of the types the actor's pools validate.
    pub async fn list_pending_validation(
        &self,
        actor: &ActorContext,
    ) -> Result<Vec<Token>, TokenError> {
        let types = self.machine.router().validatable_types(actor);
        if types.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .list_by_status(&[TokenStatus::Approved], Some(&types))
            .await
    }

    /// Actions the actor may currently perform. Hints only.
    pub async fn allowed_actions(
        &self,
        id: Uuid,
        actor: &ActorContext,
    ) -> Result<AllowedActions, TokenError> {
        let token = self.get(id).await?;
        Ok(self
            .machine
            .allowed_actions(&token, actor, self.clock.now()))
    }

    /// Expires every non-terminal token whose window has passed.
    ///
    /// Idempotent; tokens that changed concurrently are left to the next run.
    /// Returns the number of tokens expired.
    pub async fn sweep_expired(&self) -> Result<usize, TokenError> {
        let now = self.clock.now();
        let candidates = self.store.list_expirable(now).await?;
        let mut expired = 0;

        for token in candidates {
            let Ok(transition) = TokenStateMachine::expire(&token, now) else {
                continue;
            };
            if self
                .store
                .compare_and_swap(transition.expected_status, &transition.token)
                .await?
            {
                expired += 1;
                info!(
                    token_id = %token.id,
                    from = %transition.expected_status,
                    "Token expired"
                );
            } else {
                debug!(token_id = %token.id, "Token changed during expiry sweep, skipped");
            }
        }

        Ok(expired)
    }

    async fn commit(
        &self,
        mut token: Token,
        action: TokenAction,
        actor: &ActorContext,
    ) -> Result<Token, TokenError> {
        let mut attempt = 0;
        loop {
            let transition = self
                .machine
                .apply(&token, action.clone(), actor, self.clock.now())?;

            if self
                .store
                .compare_and_swap(transition.expected_status, &transition.token)
                .await?
            {
                info!(
                    token_id = %token.id,
                    action = transition.change.name(),
                    from = %transition.expected_status,
                    to = %transition.token.status,
                    actor = %actor.user_id,
                    "Token transition committed"
                );
                return Ok(transition.token);
            }

            warn!(
                token_id = %token.id,
                action = transition.change.name(),
                expected = %transition.expected_status,
                attempt,
                "Lost concurrent write on token"
            );
            if attempt >= self.conflict_retries {
                return Err(TokenError::Conflict(token.id));
            }
            attempt += 1;
            token = self.get(token.id).await?;
        }
    }
}

fn check_new_token(input: &NewToken) -> Result<(), TokenError> {
    if input.valid_until <= input.valid_from {
        return Err(TokenError::ValidationFailed(
            "valid_until must be after valid_from".to_string(),
        ));
    }
    if input.area.as_deref().is_some_and(|a| a.trim().is_empty()) {
        return Err(TokenError::ValidationFailed(
            "area must not be blank".to_string(),
        ));
    }

    match &input.detail {
        TokenDetail::ExitPass(pass) => {
            if pass.items.is_empty() {
                return Err(TokenError::ValidationFailed(
                    "an exit pass needs at least one item".to_string(),
                ));
            }
            for item in &pass.items {
                if item.quantity <= Decimal::ZERO {
                    return Err(TokenError::ValidationFailed(format!(
                        "quantity of '{}' must be positive",
                        item.description
                    )));
                }
                if item.unit_value.is_sign_negative() {
                    return Err(TokenError::ValidationFailed(format!(
                        "unit value of '{}' must not be negative",
                        item.description
                    )));
                }
            }
            if pass.total_value().is_none() {
                return Err(TokenError::ValidationFailed(
                    "exit pass value out of range".to_string(),
                ));
            }
        }
        TokenDetail::UniformDelivery(delivery) => {
            if delivery.items.is_empty() {
                return Err(TokenError::ValidationFailed(
                    "a uniform delivery needs at least one item".to_string(),
                ));
            }
            if delivery.items.iter().any(|i| i.quantity == 0) {
                return Err(TokenError::ValidationFailed(
                    "uniform item quantities must be positive".to_string(),
                ));
            }
            if delivery.delivery != DeliveryRecord::default() {
                return Err(TokenError::ValidationFailed(
                    "delivery evidence is recorded on completion".to_string(),
                ));
            }
        }
        TokenDetail::Overtime(overtime) if overtime.hours <= Decimal::ZERO => {
            return Err(TokenError::ValidationFailed(
                "overtime hours must be positive".to_string(),
            ));
        }
        _ => {}
    }
    Ok(())
}
