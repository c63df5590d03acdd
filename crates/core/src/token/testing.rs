//! Shared fixtures for token unit tests.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::token::actor::ActorContext;
use crate::token::machine::TokenStateMachine;
use crate::token::policy::PolicyTable;
use crate::token::types::{
    ApprovalLevel, EvidenceRef, ExitPassDetail, ExitPassItem, LevelApproval, LevelApprovals,
    OvertimeDetail, PermitDayDetail, PermitHourDetail, RateChangeDetail, ShiftChangeDetail,
    SubstitutionDetail, Token, TokenDetail, TokenStatus, TokenType, UniformDeliveryDetail,
    UniformItem,
};

pub fn window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
}

pub fn actor_with(permissions: &[&str]) -> ActorContext {
    ActorContext::new(Uuid::new_v4(), permissions.iter().copied(), false)
}

pub fn machine() -> TokenStateMachine {
    TokenStateMachine::new(&PolicyTable::standard().unwrap())
}

pub fn signature() -> EvidenceRef {
    EvidenceRef::new(format!("signatures/{}.png", Uuid::new_v4()), "image/png")
}

pub fn photo() -> EvidenceRef {
    EvidenceRef::new(format!("photos/{}.jpg", Uuid::new_v4()), "image/jpeg")
}

pub fn approved_level() -> LevelApproval {
    LevelApproval {
        approved_at: window_start(),
        approved_by: Uuid::new_v4(),
        notes: None,
        signature: None,
        photo: None,
    }
}

pub fn sample_detail(token_type: TokenType) -> TokenDetail {
    let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    match token_type {
        TokenType::PermitHour => TokenDetail::PermitHour(PermitHourDetail {
            date,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            reason: "Medical appointment".to_string(),
            with_pay: true,
        }),
        TokenType::PermitDay => TokenDetail::PermitDay(PermitDayDetail {
            start_date: date,
            end_date: date,
            reason: "Family matter".to_string(),
            with_pay: false,
        }),
        TokenType::ExitPass => TokenDetail::ExitPass(ExitPassDetail {
            items: vec![ExitPassItem {
                description: "Hand truck".to_string(),
                quantity: dec!(2),
                unit_value: dec!(150),
                requires_return: true,
            }],
            destination: "Cross-dock B".to_string(),
            vehicle_plate: Some("ABC-123".to_string()),
        }),
        TokenType::UniformDelivery => TokenDetail::UniformDelivery(UniformDeliveryDetail {
            items: vec![UniformItem {
                description: "Safety vest".to_string(),
                size: Some("L".to_string()),
                quantity: 2,
            }],
            delivery: Default::default(),
        }),
        TokenType::Substitution => TokenDetail::Substitution(SubstitutionDetail {
            substituted_personnel_id: Uuid::new_v4(),
            position: "Forklift operator".to_string(),
            date,
            shift: Some("night".to_string()),
        }),
        TokenType::RateChange => TokenDetail::RateChange(RateChangeDetail {
            position: "Picker".to_string(),
            current_rate: dec!(12.50),
            new_rate: dec!(13.75),
            effective_date: date,
        }),
        TokenType::Overtime => TokenDetail::Overtime(OvertimeDetail {
            date,
            hours: dec!(3),
            reason: "Peak season backlog".to_string(),
        }),
        TokenType::ShiftChange => TokenDetail::ShiftChange(ShiftChangeDetail {
            date,
            from_shift: "morning".to_string(),
            to_shift: "evening".to_string(),
            swap_with_personnel_id: None,
        }),
    }
}

/// A token of `token_type` in `status`, with the approvals that status implies.
pub fn sample_token(token_type: TokenType, status: TokenStatus) -> Token {
    let policy = PolicyTable::standard().unwrap();
    let detail = sample_detail(token_type);
    let requirements = policy.resolve_detail(&detail).requirements;

    let granted: Vec<ApprovalLevel> = match status {
        TokenStatus::PendingL1 | TokenStatus::PendingL2 | TokenStatus::PendingL3 => {
            let outstanding = status.outstanding_level().unwrap();
            requirements.levels().filter(|l| *l < outstanding).collect()
        }
        TokenStatus::Approved | TokenStatus::Used => requirements.levels().collect(),
        _ => Vec::new(),
    };
    let mut approvals = LevelApprovals::default();
    for level in granted {
        let grant = Some(approved_level());
        match level {
            ApprovalLevel::L1 => approvals.level_1 = grant,
            ApprovalLevel::L2 => approvals.level_2 = grant,
            ApprovalLevel::L3 => approvals.level_3 = grant,
        }
    }
    let start = window_start();
    Token {
        id: Uuid::new_v4(),
        display_number: "TK-2026-000001".to_string(),
        token_code: base64_url::encode(Uuid::new_v4().as_bytes()),
        status,
        requester_id: Uuid::new_v4(),
        area: None,
        valid_from: start,
        valid_until: start + Duration::hours(12),
        requirements,
        approvals,
        rejection: None,
        cancellation: None,
        validation: None,
        expired_at: None,
        detail,
        created_at: start - Duration::hours(1),
        updated_at: start - Duration::hours(1),
    }
}
