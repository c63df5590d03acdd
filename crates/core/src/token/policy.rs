//! Token type policy: required approval levels and validation pool per type.
//!
//! The table is static except for one dynamic rule: an exit pass whose total
//! item value exceeds [`EXIT_PASS_LEVEL_3_THRESHOLD`] additionally requires
//! level 3. Requirements are resolved once, when the token is created, and
//! frozen on the token.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::token::error::PolicyConfigError;
use crate::token::types::{ApprovalRequirements, TokenDetail, TokenType, ValidationPool};

/// Exit passes worth more than this need a level 3 approval.
pub const EXIT_PASS_LEVEL_3_THRESHOLD: Decimal = Decimal::from_parts(20_000, 0, 0, false, 0);

/// Static policy of one token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypePolicy {
    /// Base approval levels.
    pub requirements: ApprovalRequirements,
    /// Pool allowed to validate; `None` for types that are never validated.
    pub pool: Option<ValidationPool>,
}

impl TypePolicy {
    /// Creates a type policy.
    #[must_use]
    pub const fn new(requirements: ApprovalRequirements, pool: Option<ValidationPool>) -> Self {
        Self { requirements, pool }
    }
}

/// Mutable inputs the dynamic rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyContext {
    /// Sum of `quantity × unit_value` over the exit pass lines.
    pub total_value: Decimal,
}

impl PolicyContext {
    /// Builds the context from a token detail.
    #[must_use]
    pub fn for_detail(detail: &TokenDetail) -> Self {
        let total_value = match detail {
            // An overflowing total is above any threshold.
            TokenDetail::ExitPass(pass) => pass.total_value().unwrap_or(Decimal::MAX),
            _ => Decimal::ZERO,
        };
        Self { total_value }
    }
}

/// Resolved policy of a concrete token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// Levels the token needs.
    pub requirements: ApprovalRequirements,
    /// Pool allowed to validate it.
    pub pool: Option<ValidationPool>,
}

/// Complete policy table, one entry per token type.
///
/// Only constructible through [`PolicyTable::from_entries`], which rejects
/// incomplete tables, so lookups are total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: [TypePolicy; 8],
    level_3_threshold: Decimal,
}

impl PolicyTable {
    /// The standard table.
    ///
    /// Every token type is mapped; the result is still checked like any other
    /// table so a future edit that drops a type fails at startup.
    pub fn standard() -> Result<Self, PolicyConfigError> {
        let l1 = ApprovalRequirements::new(true, false, false);
        let l1_l2 = ApprovalRequirements::new(true, true, false);
        let all = ApprovalRequirements::new(true, true, true);

        Self::from_entries([
            (
                TokenType::PermitHour,
                TypePolicy::new(l1, Some(ValidationPool::Payroll)),
            ),
            (
                TokenType::PermitDay,
                TypePolicy::new(l1_l2, Some(ValidationPool::Payroll)),
            ),
            (
                TokenType::ExitPass,
                TypePolicy::new(l1_l2, Some(ValidationPool::Security)),
            ),
            (TokenType::UniformDelivery, TypePolicy::new(l1_l2, None)),
            (
                TokenType::Substitution,
                TypePolicy::new(l1_l2, Some(ValidationPool::Payroll)),
            ),
            (
                TokenType::RateChange,
                TypePolicy::new(all, Some(ValidationPool::Payroll)),
            ),
            (
                TokenType::Overtime,
                TypePolicy::new(l1_l2, Some(ValidationPool::Payroll)),
            ),
            (
                TokenType::ShiftChange,
                TypePolicy::new(l1, Some(ValidationPool::Payroll)),
            ),
        ])
    }

    /// Builds a table from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns `PolicyConfigError` if a type is missing, registered twice,
    /// or requires no approval level.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (TokenType, TypePolicy)>,
    ) -> Result<Self, PolicyConfigError> {
        let mut map = BTreeMap::new();
        for (token_type, policy) in entries {
            if policy.requirements.is_empty() {
                return Err(PolicyConfigError::NoApprovalLevels(token_type));
            }
            if map.insert(token_type, policy).is_some() {
                return Err(PolicyConfigError::DuplicateMapping(token_type));
            }
        }

        let mut policies = [TypePolicy::new(ApprovalRequirements::default(), None); 8];
        for token_type in TokenType::ALL {
            let policy = map
                .remove(&token_type)
                .ok_or(PolicyConfigError::MissingMapping(token_type))?;
            if let Some(slot) = policies.get_mut(token_type.index()) {
                *slot = policy;
            }
        }

        Ok(Self {
            policies,
            level_3_threshold: EXIT_PASS_LEVEL_3_THRESHOLD,
        })
    }

    /// Static policy of a type.
    #[must_use]
    pub fn type_policy(&self, token_type: TokenType) -> TypePolicy {
        self.policies[token_type.index()]
    }

    /// Resolves the policy of a concrete token.
    #[must_use]
    pub fn resolve(&self, token_type: TokenType, context: &PolicyContext) -> ResolvedPolicy {
        let base = self.type_policy(token_type);
        let mut requirements = base.requirements;
        if token_type == TokenType::ExitPass && context.total_value > self.level_3_threshold {
            requirements.level_3 = true;
        }
        ResolvedPolicy {
            requirements,
            pool: base.pool,
        }
    }

    /// Resolves the policy for a detail, deriving type and context from it.
    #[must_use]
    pub fn resolve_detail(&self, detail: &TokenDetail) -> ResolvedPolicy {
        self.resolve(detail.token_type(), &PolicyContext::for_detail(detail))
    }

    /// Validation pool of a type.
    #[must_use]
    pub fn pool(&self, token_type: TokenType) -> Option<ValidationPool> {
        self.type_policy(token_type).pool
    }

    /// Exit pass value above which level 3 is required.
    #[must_use]
    pub const fn level_3_threshold(&self) -> Decimal {
        self.level_3_threshold
    }
}
