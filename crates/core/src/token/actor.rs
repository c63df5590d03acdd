//! Actor context for authoritative permission checks.

use std::collections::BTreeSet;
use uuid::Uuid;

use crate::token::types::ApprovalLevel;

/// Permission names understood by the workflow.
///
/// Level authority may be scoped to one area by appending `:<area>`,
/// e.g. `tokens.approve_level_2:warehouse`.
pub mod permissions {
    use crate::token::types::ApprovalLevel;

    /// Level 1 (supervisor) authority.
    pub const APPROVE_LEVEL_1: &str = "tokens.approve_level_1";
    /// Level 2 (area head) authority.
    pub const APPROVE_LEVEL_2: &str = "tokens.approve_level_2";
    /// Level 3 (center manager) authority.
    pub const APPROVE_LEVEL_3: &str = "tokens.approve_level_3";
    /// Membership in the security validation pool.
    pub const VALIDATE_SECURITY: &str = "tokens.validate_security";
    /// Membership in the payroll validation pool.
    pub const VALIDATE_PAYROLL: &str = "tokens.validate_payroll";
    /// Cancel tokens requested by someone else.
    pub const CANCEL_ANY: &str = "tokens.cancel_any";

    /// Permission granting `level` for every area.
    #[must_use]
    pub const fn approve_level(level: ApprovalLevel) -> &'static str {
        match level {
            ApprovalLevel::L1 => APPROVE_LEVEL_1,
            ApprovalLevel::L2 => APPROVE_LEVEL_2,
            ApprovalLevel::L3 => APPROVE_LEVEL_3,
        }
    }
}

/// Who is performing an action, built from verified server-side claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    /// The authenticated user.
    pub user_id: Uuid,
    permissions: BTreeSet<String>,
    /// Superuser/staff flag: bypasses level, pool and requester checks.
    pub elevated: bool,
}

impl ActorContext {
    /// Creates an actor context.
    pub fn new<I, S>(user_id: Uuid, permissions: I, elevated: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            permissions: permissions.into_iter().map(Into::into).collect(),
            elevated,
        }
    }

    /// Returns true if the actor holds `permission` verbatim.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Returns true if the actor may grant `level` on a token of `area`.
    ///
    /// Global level authority covers every area; scoped authority only
    /// covers tokens whose area matches exactly.
    #[must_use]
    pub fn has_level_authority(&self, level: ApprovalLevel, area: Option<&str>) -> bool {
        if self.elevated {
            return true;
        }
        let global = permissions::approve_level(level);
        if self.has_permission(global) {
            return true;
        }
        area.is_some_and(|area| self.has_permission(&format!("{global}:{area}")))
    }
}
