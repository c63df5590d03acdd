//! Property-based tests for the policy table.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::token::policy::{EXIT_PASS_LEVEL_3_THRESHOLD, PolicyContext, PolicyTable};
use crate::token::types::{ApprovalLevel, ExitPassDetail, ExitPassItem, TokenDetail, TokenType};

fn arb_token_type() -> impl Strategy<Value = TokenType> {
    proptest::sample::select(TokenType::ALL.to_vec())
}

/// Money amounts with two decimals, up to 10,000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_item() -> impl Strategy<Value = ExitPassItem> {
    (1i64..=20, arb_amount()).prop_map(|(quantity, unit_value)| ExitPassItem {
        description: "item".to_string(),
        quantity: Decimal::from(quantity),
        unit_value,
        requires_return: false,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Level 3 on an exit pass tracks the threshold exactly.
    #[test]
    fn prop_exit_pass_level_3_iff_over_threshold(items in prop::collection::vec(arb_item(), 1..6)) {
        let table = PolicyTable::standard().unwrap();
        let detail = TokenDetail::ExitPass(ExitPassDetail {
            items,
            destination: "Hub".to_string(),
            vehicle_plate: None,
        });
        let total = match &detail {
            TokenDetail::ExitPass(pass) => pass.total_value().unwrap(),
            _ => Decimal::ZERO,
        };

        let resolved = table.resolve_detail(&detail);
        prop_assert_eq!(resolved.requirements.level_3, total > EXIT_PASS_LEVEL_3_THRESHOLD);
        prop_assert!(resolved.requirements.level_1);
        prop_assert!(resolved.requirements.level_2);
    }

    /// Only exit passes look at the item value.
    #[test]
    fn prop_other_types_ignore_value(token_type in arb_token_type(), total in arb_amount()) {
        prop_assume!(token_type != TokenType::ExitPass);
        let table = PolicyTable::standard().unwrap();
        let context = PolicyContext { total_value: total * Decimal::from(100) };

        prop_assert_eq!(
            table.resolve(token_type, &context),
            table.resolve(token_type, &PolicyContext::default())
        );
    }

    /// Every type needs at least one level, and level 1 is always first.
    #[test]
    fn prop_every_type_starts_at_level_1(token_type in arb_token_type(), total in arb_amount()) {
        let table = PolicyTable::standard().unwrap();
        let resolved = table.resolve(token_type, &PolicyContext { total_value: total });

        prop_assert!(!resolved.requirements.is_empty());
        prop_assert_eq!(resolved.requirements.first(), Some(ApprovalLevel::L1));
    }
}
