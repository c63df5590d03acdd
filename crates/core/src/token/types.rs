//! Token domain types.
//!
//! A token is a short-lived authorization artifact. Its kind is fixed by the
//! [`TokenDetail`] variant it carries, its progress by [`TokenStatus`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The eight kinds of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Permission to be absent for some hours of a day.
    PermitHour,
    /// Permission to be absent for one or more whole days.
    PermitDay,
    /// Pass for taking goods out of the premises.
    ExitPass,
    /// Handover of uniform items to a worker.
    UniformDelivery,
    /// One worker covering for another.
    Substitution,
    /// Change of a worker's pay rate.
    RateChange,
    /// Extra hours worked.
    Overtime,
    /// Change of assigned shift.
    ShiftChange,
}

impl TokenType {
    /// Every token type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::PermitHour,
        Self::PermitDay,
        Self::ExitPass,
        Self::UniformDelivery,
        Self::Substitution,
        Self::RateChange,
        Self::Overtime,
        Self::ShiftChange,
    ];

    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermitHour => "permit_hour",
            Self::PermitDay => "permit_day",
            Self::ExitPass => "exit_pass",
            Self::UniformDelivery => "uniform_delivery",
            Self::Substitution => "substitution",
            Self::RateChange => "rate_change",
            Self::Overtime => "overtime",
            Self::ShiftChange => "shift_change",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Position of the type in [`TokenType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the three sequential sign-offs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ApprovalLevel {
    /// Supervisor.
    L1 = 1,
    /// Area head.
    L2 = 2,
    /// Center manager.
    L3 = 3,
}

impl ApprovalLevel {
    /// All levels in approval order.
    pub const ALL: [Self; 3] = [Self::L1, Self::L2, Self::L3];

    /// Builds a level from its number (1, 2 or 3).
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::L1),
            2 => Some(Self::L2),
            3 => Some(Self::L3),
            _ => None,
        }
    }

    /// Returns the level number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Levels strictly below this one.
    #[must_use]
    pub fn lower(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |l| *l < self)
    }

    /// Levels strictly above this one.
    #[must_use]
    pub fn higher(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |l| *l > self)
    }
}

impl TryFrom<u8> for ApprovalLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or_else(|| format!("invalid approval level {value}"))
    }
}

impl From<ApprovalLevel> for u8 {
    fn from(level: ApprovalLevel) -> Self {
        level.number()
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.number())
    }
}

/// Token status in the authorization workflow.
///
/// Valid transitions:
/// - Draft → PendingLk (submit, first required level)
/// - PendingLk → next required level or Approved (approve at level k)
/// - PendingLk → Rejected (reject)
/// - Draft / PendingLk → Cancelled (cancel)
/// - Approved → Used (validate, or delivery completion for uniform deliveries)
/// - any non-terminal → Expired (expiry sweep)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Created, not yet submitted.
    Draft,
    /// Waiting for the level 1 sign-off.
    PendingL1,
    /// Waiting for the level 2 sign-off.
    PendingL2,
    /// Waiting for the level 3 sign-off.
    PendingL3,
    /// Every required level granted.
    Approved,
    /// Consumed (validated or delivered).
    Used,
    /// Validity window passed before use.
    Expired,
    /// Withdrawn by the requester or an override.
    Cancelled,
    /// Turned down by an approver.
    Rejected,
}

impl TokenStatus {
    /// Every status.
    pub const ALL: [Self; 9] = [
        Self::Draft,
        Self::PendingL1,
        Self::PendingL2,
        Self::PendingL3,
        Self::Approved,
        Self::Used,
        Self::Expired,
        Self::Cancelled,
        Self::Rejected,
    ];

    /// Statuses the expiry sweep may act on.
    pub const EXPIRABLE: [Self; 5] = [
        Self::Draft,
        Self::PendingL1,
        Self::PendingL2,
        Self::PendingL3,
        Self::Approved,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingL1 => "pending_l1",
            Self::PendingL2 => "pending_l2",
            Self::PendingL3 => "pending_l3",
            Self::Approved => "approved",
            Self::Used => "used",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
    }

    /// The pending status awaiting the given level.
    #[must_use]
    pub const fn pending(level: ApprovalLevel) -> Self {
        match level {
            ApprovalLevel::L1 => Self::PendingL1,
            ApprovalLevel::L2 => Self::PendingL2,
            ApprovalLevel::L3 => Self::PendingL3,
        }
    }

    /// The level this status is waiting for, if it is a pending status.
    #[must_use]
    pub const fn outstanding_level(self) -> Option<ApprovalLevel> {
        match self {
            Self::PendingL1 => Some(ApprovalLevel::L1),
            Self::PendingL2 => Some(ApprovalLevel::L2),
            Self::PendingL3 => Some(ApprovalLevel::L3),
            _ => None,
        }
    }

    /// Returns true while an approval is outstanding.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        self.outstanding_level().is_some()
    }

    /// Returns true once no further mutation is accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Used | Self::Expired | Self::Cancelled | Self::Rejected
        )
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational role class allowed to validate a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPool {
    /// Gate security.
    Security,
    /// Payroll office.
    Payroll,
}

impl ValidationPool {
    /// Returns the string representation of the pool.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Payroll => "payroll",
        }
    }
}

impl fmt::Display for ValidationPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which approval levels a token needs. Frozen at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalRequirements {
    /// Level 1 required.
    pub level_1: bool,
    /// Level 2 required.
    pub level_2: bool,
    /// Level 3 required.
    pub level_3: bool,
}

impl ApprovalRequirements {
    /// Builds requirements from three flags.
    #[must_use]
    pub const fn new(level_1: bool, level_2: bool, level_3: bool) -> Self {
        Self {
            level_1,
            level_2,
            level_3,
        }
    }

    /// Returns true if `level` must be granted.
    #[must_use]
    pub const fn requires(&self, level: ApprovalLevel) -> bool {
        match level {
            ApprovalLevel::L1 => self.level_1,
            ApprovalLevel::L2 => self.level_2,
            ApprovalLevel::L3 => self.level_3,
        }
    }

    /// The required levels in approval order.
    pub fn levels(&self) -> impl Iterator<Item = ApprovalLevel> + '_ {
        ApprovalLevel::ALL.into_iter().filter(|l| self.requires(*l))
    }

    /// The first level to be granted.
    #[must_use]
    pub fn first(&self) -> Option<ApprovalLevel> {
        self.levels().next()
    }

    /// The next required level after `level`.
    #[must_use]
    pub fn after(&self, level: ApprovalLevel) -> Option<ApprovalLevel> {
        level.higher().find(|l| self.requires(*l))
    }

    /// Number of required levels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.levels().count()
    }

    /// Returns true if no level is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Reference to an evidence blob held by external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Opaque key of the stored blob.
    pub storage_key: String,
    /// MIME type of the blob.
    pub content_type: String,
}

impl EvidenceRef {
    /// Creates a new evidence reference.
    #[must_use]
    pub fn new(storage_key: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            content_type: content_type.into(),
        }
    }
}

/// Record of one granted approval level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelApproval {
    /// When the level was granted.
    pub approved_at: DateTime<Utc>,
    /// Who granted it.
    pub approved_by: Uuid,
    /// Optional approver notes.
    pub notes: Option<String>,
    /// Optional captured signature.
    pub signature: Option<EvidenceRef>,
    /// Optional captured photo.
    pub photo: Option<EvidenceRef>,
}

/// Granted approvals, one slot per level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelApprovals {
    /// Level 1 grant.
    pub level_1: Option<LevelApproval>,
    /// Level 2 grant.
    pub level_2: Option<LevelApproval>,
    /// Level 3 grant.
    pub level_3: Option<LevelApproval>,
}

impl LevelApprovals {
    /// Returns the grant recorded for `level`.
    #[must_use]
    pub const fn get(&self, level: ApprovalLevel) -> Option<&LevelApproval> {
        match level {
            ApprovalLevel::L1 => self.level_1.as_ref(),
            ApprovalLevel::L2 => self.level_2.as_ref(),
            ApprovalLevel::L3 => self.level_3.as_ref(),
        }
    }

    /// Returns true if `level` has been granted.
    #[must_use]
    pub const fn is_granted(&self, level: ApprovalLevel) -> bool {
        self.get(level).is_some()
    }

    fn slot_mut(&mut self, level: ApprovalLevel) -> &mut Option<LevelApproval> {
        match level {
            ApprovalLevel::L1 => &mut self.level_1,
            ApprovalLevel::L2 => &mut self.level_2,
            ApprovalLevel::L3 => &mut self.level_3,
        }
    }
}

/// Rejection audit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Who rejected.
    pub rejected_by: Uuid,
    /// When.
    pub rejected_at: DateTime<Utc>,
    /// The level that was outstanding.
    pub level: ApprovalLevel,
    /// Why.
    pub reason: String,
}

/// Cancellation audit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    /// Who cancelled.
    pub cancelled_by: Uuid,
    /// When.
    pub cancelled_at: DateTime<Utc>,
}

/// Validation audit data, recorded when an approved token is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Who validated.
    pub validated_by: Uuid,
    /// When.
    pub validated_at: DateTime<Utc>,
    /// Optional validator notes.
    pub notes: Option<String>,
    /// Optional captured signature.
    pub signature: Option<EvidenceRef>,
    /// Optional captured photo.
    pub photo: Option<EvidenceRef>,
}

/// One line of an exit pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPassItem {
    /// What leaves the premises.
    pub description: String,
    /// How many units.
    pub quantity: Decimal,
    /// Value of one unit.
    pub unit_value: Decimal,
    /// Whether the goods must come back.
    #[serde(default)]
    pub requires_return: bool,
}

impl ExitPassItem {
    /// Line value (`quantity × unit_value`), `None` on overflow.
    #[must_use]
    pub fn line_value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_value)
    }
}

/// One uniform piece handed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformItem {
    /// Garment description.
    pub description: String,
    /// Garment size.
    pub size: Option<String>,
    /// How many pieces.
    pub quantity: u32,
}

/// Delivery evidence of a uniform delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Whether the items were handed over.
    pub is_delivered: bool,
    /// Who completed the handover.
    pub delivered_by: Option<Uuid>,
    /// Server time of completion.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Receiver's signature.
    pub signature: Option<EvidenceRef>,
    /// Up to two photographs.
    #[serde(default)]
    pub photos: Vec<EvidenceRef>,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Hourly permit detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitHourDetail {
    /// Day of the absence.
    pub date: NaiveDate,
    /// Leaving time.
    pub start_time: NaiveTime,
    /// Return time.
    pub end_time: NaiveTime,
    /// Reason for the absence.
    pub reason: String,
    /// Whether the hours are paid.
    #[serde(default)]
    pub with_pay: bool,
}

/// Day permit detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDayDetail {
    /// First day of absence.
    pub start_date: NaiveDate,
    /// Last day of absence.
    pub end_date: NaiveDate,
    /// Reason for the absence.
    pub reason: String,
    /// Whether the days are paid.
    #[serde(default)]
    pub with_pay: bool,
}

/// Exit pass detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPassDetail {
    /// Goods leaving the premises.
    pub items: Vec<ExitPassItem>,
    /// Where the goods go.
    pub destination: String,
    /// Carrying vehicle, if any.
    pub vehicle_plate: Option<String>,
}

impl ExitPassDetail {
    /// Sum of `quantity × unit_value` over all lines, `None` on overflow.
    #[must_use]
    pub fn total_value(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_value()?))
    }
}

/// Uniform delivery detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformDeliveryDetail {
    /// Pieces to hand over.
    pub items: Vec<UniformItem>,
    /// Handover evidence.
    #[serde(default)]
    pub delivery: DeliveryRecord,
}

/// Substitution detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionDetail {
    /// Worker being covered for.
    pub substituted_personnel_id: Uuid,
    /// Position covered.
    pub position: String,
    /// Day of the substitution.
    pub date: NaiveDate,
    /// Shift covered.
    pub shift: Option<String>,
}

/// Rate change detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateChangeDetail {
    /// Position whose rate changes.
    pub position: String,
    /// Rate before the change.
    pub current_rate: Decimal,
    /// Rate after the change.
    pub new_rate: Decimal,
    /// First day of the new rate.
    pub effective_date: NaiveDate,
}

/// Overtime detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeDetail {
    /// Day worked.
    pub date: NaiveDate,
    /// Extra hours.
    pub hours: Decimal,
    /// Why the extra hours were needed.
    pub reason: String,
}

/// Shift change detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftChangeDetail {
    /// Day of the change.
    pub date: NaiveDate,
    /// Shift given up.
    pub from_shift: String,
    /// Shift taken.
    pub to_shift: String,
    /// Worker swapped with, if any.
    pub swap_with_personnel_id: Option<Uuid>,
}

/// Type-specific token data, one variant per [`TokenType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token_type", rename_all = "snake_case")]
pub enum TokenDetail {
    /// Hourly permit.
    PermitHour(PermitHourDetail),
    /// Day permit.
    PermitDay(PermitDayDetail),
    /// Exit pass.
    ExitPass(ExitPassDetail),
    /// Uniform delivery.
    UniformDelivery(UniformDeliveryDetail),
    /// Substitution.
    Substitution(SubstitutionDetail),
    /// Rate change.
    RateChange(RateChangeDetail),
    /// Overtime.
    Overtime(OvertimeDetail),
    /// Shift change.
    ShiftChange(ShiftChangeDetail),
}

impl TokenDetail {
    /// The token type this detail belongs to.
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        match self {
            Self::PermitHour(_) => TokenType::PermitHour,
            Self::PermitDay(_) => TokenType::PermitDay,
            Self::ExitPass(_) => TokenType::ExitPass,
            Self::UniformDelivery(_) => TokenType::UniformDelivery,
            Self::Substitution(_) => TokenType::Substitution,
            Self::RateChange(_) => TokenType::RateChange,
            Self::Overtime(_) => TokenType::Overtime,
            Self::ShiftChange(_) => TokenType::ShiftChange,
        }
    }

    /// Delivery evidence, for uniform deliveries only.
    #[must_use]
    pub const fn delivery(&self) -> Option<&DeliveryRecord> {
        match self {
            Self::UniformDelivery(d) => Some(&d.delivery),
            _ => None,
        }
    }
}

/// The central entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-readable sequence, e.g. `TK-2026-000001`.
    pub display_number: String,
    /// Opaque code used in QR and public links.
    pub token_code: String,
    /// Current status.
    pub status: TokenStatus,
    /// User who requested the token.
    pub requester_id: Uuid,
    /// Operational area, used to scope approval authority.
    pub area: Option<String>,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
    /// Required approval levels.
    pub requirements: ApprovalRequirements,
    /// Granted approval levels.
    pub approvals: LevelApprovals,
    /// Set once rejected.
    pub rejection: Option<Rejection>,
    /// Set once cancelled.
    pub cancellation: Option<Cancellation>,
    /// Set once validated.
    pub validation: Option<ValidationRecord>,
    /// Set once expired by the sweep.
    pub expired_at: Option<DateTime<Utc>>,
    /// Type-specific data.
    pub detail: TokenDetail,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl Token {
    /// The token type, derived from the detail variant.
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.detail.token_type()
    }

    /// Returns true if `at` lies within `[valid_from, valid_until]`.
    #[must_use]
    pub fn is_within_validity(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_until
    }

    /// Returns true if the generated document (PDF/QR) can be handed out.
    #[must_use]
    pub fn document_available(&self) -> bool {
        self.token_type() == TokenType::UniformDelivery
            && matches!(self.status, TokenStatus::Approved | TokenStatus::Used)
    }

    /// Returns true if the uniform items were handed over.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.detail.delivery().is_some_and(|d| d.is_delivered)
    }

    /// Applies a committed change to this token.
    pub fn apply(&mut self, change: &TokenChange) {
        match change {
            TokenChange::Submit { .. } => {}
            TokenChange::Approve {
                level, approval, ..
            } => {
                *self.approvals.slot_mut(*level) = Some(approval.clone());
            }
            TokenChange::Reject { rejection, .. } => {
                self.rejection = Some(rejection.clone());
            }
            TokenChange::Cancel { cancellation, .. } => {
                self.cancellation = Some(cancellation.clone());
            }
            TokenChange::Validate { validation, .. } => {
                self.validation = Some(validation.clone());
            }
            TokenChange::CompleteDelivery { delivery, .. } => {
                if let TokenDetail::UniformDelivery(detail) = &mut self.detail {
                    detail.delivery = delivery.clone();
                }
            }
            TokenChange::Expire { expired_at, .. } => {
                self.expired_at = Some(*expired_at);
            }
        }
        self.status = change.new_status();
        self.updated_at = change.occurred_at();
    }
}

/// A state change with its audit data, produced by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenChange {
    /// Draft submitted for approval.
    Submit {
        /// The new status.
        new_status: TokenStatus,
        /// When it was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// One level granted.
    Approve {
        /// The granted level.
        level: ApprovalLevel,
        /// The new status.
        new_status: TokenStatus,
        /// Grant audit data.
        approval: LevelApproval,
    },
    /// Turned down.
    Reject {
        /// The new status (Rejected).
        new_status: TokenStatus,
        /// Rejection audit data.
        rejection: Rejection,
    },
    /// Withdrawn.
    Cancel {
        /// The new status (Cancelled).
        new_status: TokenStatus,
        /// Cancellation audit data.
        cancellation: Cancellation,
    },
    /// Consumed by a validator.
    Validate {
        /// The new status (Used).
        new_status: TokenStatus,
        /// Validation audit data.
        validation: ValidationRecord,
    },
    /// Uniform handed over.
    CompleteDelivery {
        /// The new status (Used).
        new_status: TokenStatus,
        /// Delivery evidence.
        delivery: DeliveryRecord,
        /// Server time of completion.
        completed_at: DateTime<Utc>,
    },
    /// Validity window passed.
    Expire {
        /// The new status (Expired).
        new_status: TokenStatus,
        /// When the sweep expired the token.
        expired_at: DateTime<Utc>,
    },
}

impl TokenChange {
    /// Returns the new status resulting from this change.
    #[must_use]
    pub fn new_status(&self) -> TokenStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Cancel { new_status, .. }
            | Self::Validate { new_status, .. }
            | Self::CompleteDelivery { new_status, .. }
            | Self::Expire { new_status, .. } => *new_status,
        }
    }

    /// Returns when the change happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Submit { submitted_at, .. } => *submitted_at,
            Self::Approve { approval, .. } => approval.approved_at,
            Self::Reject { rejection, .. } => rejection.rejected_at,
            Self::Cancel { cancellation, .. } => cancellation.cancelled_at,
            Self::Validate { validation, .. } => validation.validated_at,
            Self::CompleteDelivery { completed_at, .. } => *completed_at,
            Self::Expire { expired_at, .. } => *expired_at,
        }
    }

    /// Short name of the change, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::Cancel { .. } => "cancel",
            Self::Validate { .. } => "validate",
            Self::CompleteDelivery { .. } => "complete_delivery",
            Self::Expire { .. } => "expire",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_as_str_and_parse() {
        for status in TokenStatus::ALL {
            assert_eq!(TokenStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            TokenStatus::parse("PENDING_L2"),
            Some(TokenStatus::PendingL2)
        );
        assert_eq!(TokenStatus::parse("invalid"), None);
    }

    #[test]
    fn test_type_as_str_and_parse() {
        for token_type in TokenType::ALL {
            assert_eq!(TokenType::parse(token_type.as_str()), Some(token_type));
        }
        assert_eq!(TokenType::parse("EXIT_PASS"), Some(TokenType::ExitPass));
        assert_eq!(TokenType::parse("parcel"), None);
    }

    #[test]
    fn test_type_index_matches_all_order() {
        for (i, token_type) in TokenType::ALL.into_iter().enumerate() {
            assert_eq!(token_type.index(), i);
        }
    }

    #[test]
    fn test_status_terminal_and_pending() {
        assert!(TokenStatus::Used.is_terminal());
        assert!(TokenStatus::Expired.is_terminal());
        assert!(TokenStatus::Cancelled.is_terminal());
        assert!(TokenStatus::Rejected.is_terminal());
        assert!(!TokenStatus::Approved.is_terminal());
        assert!(!TokenStatus::Draft.is_terminal());

        assert!(TokenStatus::PendingL1.is_pending());
        assert!(!TokenStatus::Approved.is_pending());
        assert_eq!(
            TokenStatus::PendingL3.outstanding_level(),
            Some(ApprovalLevel::L3)
        );
        for level in ApprovalLevel::ALL {
            assert_eq!(TokenStatus::pending(level).outstanding_level(), Some(level));
        }
    }

    #[test]
    fn test_requirements_navigation() {
        let req = ApprovalRequirements::new(true, false, true);
        assert_eq!(req.first(), Some(ApprovalLevel::L1));
        assert_eq!(req.after(ApprovalLevel::L1), Some(ApprovalLevel::L3));
        assert_eq!(req.after(ApprovalLevel::L3), None);
        assert_eq!(req.count(), 2);
        assert!(ApprovalRequirements::default().is_empty());
    }

    #[test]
    fn test_level_number_round_trip() {
        assert_eq!(ApprovalLevel::from_number(2), Some(ApprovalLevel::L2));
        assert_eq!(ApprovalLevel::from_number(0), None);
        assert_eq!(ApprovalLevel::from_number(4), None);
        assert_eq!(ApprovalLevel::L3.number(), 3);
        assert_eq!(ApprovalLevel::L2.to_string(), "L2");
    }

    #[test]
    fn test_level_deserializes_from_number() {
        let level: ApprovalLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, ApprovalLevel::L3);
        assert!(serde_json::from_str::<ApprovalLevel>("7").is_err());
    }

    #[test]
    fn test_exit_pass_total_value() {
        let detail = ExitPassDetail {
            items: vec![
                ExitPassItem {
                    description: "Pallet jack".to_string(),
                    quantity: dec!(5),
                    unit_value: dec!(1000),
                    requires_return: true,
                },
                ExitPassItem {
                    description: "Scanner".to_string(),
                    quantity: dec!(1),
                    unit_value: dec!(16000),
                    requires_return: false,
                },
            ],
            destination: "Hub North".to_string(),
            vehicle_plate: None,
        };
        assert_eq!(detail.total_value(), Some(dec!(21000)));
    }

    #[test]
    fn test_exit_pass_total_value_overflow_is_none() {
        let item = |quantity, unit_value| ExitPassItem {
            description: "Crane".to_string(),
            quantity,
            unit_value,
            requires_return: false,
        };
        let product = ExitPassDetail {
            items: vec![item(Decimal::MAX, dec!(2))],
            destination: "Port".to_string(),
            vehicle_plate: None,
        };
        assert_eq!(product.items[0].line_value(), None);
        assert_eq!(product.total_value(), None);

        let sum = ExitPassDetail {
            items: vec![item(dec!(1), Decimal::MAX), item(dec!(1), Decimal::MAX)],
            destination: "Port".to_string(),
            vehicle_plate: None,
        };
        assert_eq!(sum.total_value(), None);
    }

    #[test]
    fn test_detail_tagged_by_token_type() {
        let detail = TokenDetail::Overtime(OvertimeDetail {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            hours: dec!(2.5),
            reason: "Inventory count".to_string(),
        });

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["token_type"], "overtime");
        assert_eq!(json["reason"], "Inventory count");

        let back: TokenDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back.token_type(), TokenType::Overtime);
    }
}
