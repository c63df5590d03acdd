//! Token authorization workflow.
//!
//! This module implements the token lifecycle: policy resolution at
//! creation, sequential approval levels, pool-routed validation and the
//! uniform delivery sub-flow.
//!
//! # Modules
//!
//! - `types` - Token domain types (Token, TokenStatus, TokenDetail, TokenChange)
//! - `error` - Workflow error types
//! - `actor` - Actor context and permission names
//! - `policy` - Per-type approval levels and validation pools
//! - `approval` - Approval level resolution
//! - `validation` - Validation pool routing
//! - `delivery` - Uniform delivery completion
//! - `machine` - The authoritative transition function
//! - `clock` - Injected time source
//! - `store` - Persistence seam and in-memory store
//! - `service` - Orchestration with compare-and-swap commits

pub mod actor;
pub mod approval;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod evidence;
pub mod machine;
pub mod policy;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod machine_props;
#[cfg(test)]
mod policy_props;
#[cfg(test)]
pub(crate) mod testing;

pub use actor::{ActorContext, permissions};
pub use approval::{ApprovalLevelResolver, LevelDecision};
pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{DeliveryCompletionHandler, DeliveryInput, MAX_DELIVERY_PHOTOS};
pub use error::{PolicyConfigError, TokenError};
pub use machine::{AllowedActions, EvidenceInput, TokenAction, TokenStateMachine, TokenTransition};
pub use policy::{
    EXIT_PASS_LEVEL_3_THRESHOLD, PolicyContext, PolicyTable, ResolvedPolicy, TypePolicy,
};
pub use service::{NewToken, TokenService, format_display_number, generate_token_code};
pub use store::{InMemoryTokenStore, TokenStore};
pub use types::{
    ApprovalLevel, ApprovalRequirements, Cancellation, DeliveryRecord, EvidenceRef,
    ExitPassDetail, ExitPassItem, LevelApproval, LevelApprovals, OvertimeDetail,
    PermitDayDetail, PermitHourDetail, RateChangeDetail, Rejection, ShiftChangeDetail,
    SubstitutionDetail, Token, TokenChange, TokenDetail, TokenStatus, TokenType,
    UniformDeliveryDetail, UniformItem, ValidationPool, ValidationRecord,
};
pub use validation::ValidationRouter;
