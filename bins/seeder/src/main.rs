//! Database seeder for Gatepass development and testing.
//!
//! Creates one token of every type, requested by a fixed development user,
//! so the approval and validation queues have something to show, then
//! prints bearer tokens for the development personas signed with the
//! configured JWT secret and lifetime.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use gatepass_core::token::{
    ActorContext, DeliveryRecord, ExitPassDetail, ExitPassItem, NewToken, OvertimeDetail,
    PermitDayDetail, PermitHourDetail, PolicyTable, RateChangeDetail, ShiftChangeDetail,
    SubstitutionDetail, SystemClock, TokenDetail, TokenService, UniformDeliveryDetail, UniformItem,
    permissions,
};
use gatepass_db::{TokenRepository, connect};
use gatepass_shared::{AppConfig, JwtConfig, JwtService};

/// Development requester (consistent for all seeds)
const DEV_REQUESTER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);
/// Development coworker used by substitutions and shift swaps
const DEV_COWORKER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0003);
/// Development approver holding every level
const DEV_APPROVER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0004);
/// Development gate guard (security pool)
const DEV_GUARD_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0005);
/// Development payroll clerk (payroll pool)
const DEV_PAYROLL_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0006);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone());

    println!("Connecting to database...");
    let db = connect(&database_url, 2, 1).await?;

    let service = TokenService::new(
        Arc::new(TokenRepository::new(db)),
        Arc::new(SystemClock),
        Arc::new(PolicyTable::standard()?),
    );
    let requester = ActorContext::new(DEV_REQUESTER_ID, Vec::<String>::new(), false);

    println!("Seeding tokens...");
    let mut created = 0;
    for (label, detail) in sample_details() {
        let now = Utc::now();
        let input = NewToken {
            area: Some("warehouse".to_string()),
            valid_from: now,
            valid_until: now + Duration::days(2),
            detail,
            submit: true,
        };
        match service.create(input, &requester).await {
            Ok(token) => {
                created += 1;
                println!(
                    "  {} {label}: {} ({})",
                    token.display_number, token.status, token.token_code
                );
            }
            Err(e) => eprintln!("Failed to create {label} token: {e}"),
        }
    }

    println!("Seeding complete! Created {created} tokens");

    let jwt = JwtService::new(JwtConfig::from(&config.jwt));
    println!(
        "Development bearer tokens (valid {}s):",
        jwt.access_token_expires_in()
    );
    for (label, user_id, perms) in dev_personas() {
        let token = jwt.generate_access_token(
            user_id,
            perms.iter().map(ToString::to_string).collect(),
            false,
        )?;
        println!("  {label}: Bearer {token}");
    }
    Ok(())
}

/// Personas covering every step of the workflow.
fn dev_personas() -> [(&'static str, Uuid, Vec<&'static str>); 4] {
    [
        ("requester", DEV_REQUESTER_ID, vec![]),
        (
            "approver",
            DEV_APPROVER_ID,
            vec![
                permissions::APPROVE_LEVEL_1,
                permissions::APPROVE_LEVEL_2,
                permissions::APPROVE_LEVEL_3,
            ],
        ),
        ("gate guard", DEV_GUARD_ID, vec![permissions::VALIDATE_SECURITY]),
        ("payroll clerk", DEV_PAYROLL_ID, vec![permissions::VALIDATE_PAYROLL]),
    ]
}

/// One detail per token type.
fn sample_details() -> Vec<(&'static str, TokenDetail)> {
    let today = Utc::now().date_naive();
    let tomorrow = today + Duration::days(1);

    vec![
        (
            "hourly permit",
            TokenDetail::PermitHour(PermitHourDetail {
                date: today,
                start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
                end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
                reason: "Medical appointment".to_string(),
                with_pay: true,
            }),
        ),
        (
            "day permit",
            TokenDetail::PermitDay(PermitDayDetail {
                start_date: tomorrow,
                end_date: tomorrow,
                reason: "Family matter".to_string(),
                with_pay: false,
            }),
        ),
        (
            "exit pass",
            TokenDetail::ExitPass(ExitPassDetail {
                items: vec![
                    ExitPassItem {
                        description: "Pallet jack".to_string(),
                        quantity: Decimal::from(2),
                        unit_value: Decimal::from(4_500),
                        requires_return: true,
                    },
                    ExitPassItem {
                        description: "Handheld scanner".to_string(),
                        quantity: Decimal::from(3),
                        unit_value: Decimal::from(4_000),
                        requires_return: true,
                    },
                ],
                destination: "Repair shop".to_string(),
                vehicle_plate: Some("B 9012 XZ".to_string()),
            }),
        ),
        (
            "uniform delivery",
            TokenDetail::UniformDelivery(UniformDeliveryDetail {
                items: vec![
                    UniformItem {
                        description: "Safety vest".to_string(),
                        size: Some("L".to_string()),
                        quantity: 2,
                    },
                    UniformItem {
                        description: "Steel-toe boots".to_string(),
                        size: Some("42".to_string()),
                        quantity: 1,
                    },
                ],
                delivery: DeliveryRecord::default(),
            }),
        ),
        (
            "substitution",
            TokenDetail::Substitution(SubstitutionDetail {
                substituted_personnel_id: DEV_COWORKER_ID,
                position: "Forklift operator".to_string(),
                date: tomorrow,
                shift: Some("night".to_string()),
            }),
        ),
        (
            "rate change",
            TokenDetail::RateChange(RateChangeDetail {
                position: "Picker".to_string(),
                current_rate: Decimal::new(1250, 2),
                new_rate: Decimal::new(1375, 2),
                effective_date: tomorrow,
            }),
        ),
        (
            "overtime",
            TokenDetail::Overtime(OvertimeDetail {
                date: today,
                hours: Decimal::from(3),
                reason: "Peak season backlog".to_string(),
            }),
        ),
        (
            "shift change",
            TokenDetail::ShiftChange(ShiftChangeDetail {
                date: tomorrow,
                from_shift: "morning".to_string(),
                to_shift: "evening".to_string(),
                swap_with_personnel_id: Some(DEV_COWORKER_ID),
            }),
        ),
    ]
}
