//! Property-based tests for the token state machine.

use chrono::Duration;
use proptest::prelude::*;
use uuid::Uuid;

use crate::token::actor::{ActorContext, permissions};
use crate::token::delivery::DeliveryInput;
use crate::token::error::TokenError;
use crate::token::machine::{EvidenceInput, TokenAction};
use crate::token::testing::{machine, sample_token, signature};
use crate::token::types::{ApprovalLevel, TokenStatus, TokenType};
use crate::token::validation::ValidationRouter;

fn arb_token_type() -> impl Strategy<Value = TokenType> {
    proptest::sample::select(TokenType::ALL.to_vec())
}

fn arb_terminal_status() -> impl Strategy<Value = TokenStatus> {
    prop_oneof![
        Just(TokenStatus::Used),
        Just(TokenStatus::Expired),
        Just(TokenStatus::Cancelled),
        Just(TokenStatus::Rejected),
    ]
}

fn arb_level() -> impl Strategy<Value = ApprovalLevel> {
    proptest::sample::select(ApprovalLevel::ALL.to_vec())
}

/// Actors with any subset of the workflow permissions.
fn arb_actor() -> impl Strategy<Value = ActorContext> {
    let all = vec![
        permissions::APPROVE_LEVEL_1,
        permissions::APPROVE_LEVEL_2,
        permissions::APPROVE_LEVEL_3,
        permissions::VALIDATE_SECURITY,
        permissions::VALIDATE_PAYROLL,
        permissions::CANCEL_ANY,
    ];
    (proptest::sample::subsequence(all, 0..=6), any::<bool>())
        .prop_map(|(perms, elevated)| ActorContext::new(Uuid::new_v4(), perms, elevated))
}

fn arb_action() -> impl Strategy<Value = TokenAction> {
    prop_oneof![
        Just(TokenAction::Submit),
        arb_level().prop_map(|level| TokenAction::Approve {
            level,
            evidence: EvidenceInput::default(),
        }),
        Just(TokenAction::Reject {
            reason: "not needed".to_string()
        }),
        Just(TokenAction::Cancel),
        Just(TokenAction::Validate {
            evidence: EvidenceInput::default()
        }),
        Just(TokenAction::CompleteDelivery(DeliveryInput {
            signature: Some(signature()),
            ..DeliveryInput::default()
        })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Terminal tokens accept no action, whoever asks.
    #[test]
    fn prop_terminal_status_rejects_everything(
        token_type in arb_token_type(),
        status in arb_terminal_status(),
        action in arb_action(),
        actor in arb_actor(),
    ) {
        let token = sample_token(token_type, status);
        let result = machine().apply(&token, action, &actor, token.valid_from);
        let is_invalid = matches!(result, Err(TokenError::InvalidTransition { .. }));
        prop_assert!(is_invalid);
    }

    /// Approving in order reaches Approved after exactly the required count,
    /// and one more approval at any level is refused.
    #[test]
    fn prop_sequential_approval_reaches_approved(token_type in arb_token_type(), extra in arb_level()) {
        let machine = machine();
        let actor = ActorContext::new(Uuid::new_v4(), Vec::<String>::new(), true);
        let mut token = sample_token(token_type, TokenStatus::Draft);
        token = machine
            .apply(&token, TokenAction::Submit, &actor, token.valid_from)
            .unwrap()
            .token;

        let required: Vec<_> = token.requirements.levels().collect();
        for (i, level) in required.iter().enumerate() {
            let transition = machine
                .apply(
                    &token,
                    TokenAction::Approve { level: *level, evidence: EvidenceInput::default() },
                    &actor,
                    token.valid_from,
                )
                .unwrap();
            token = transition.token;
            let done = i + 1 == required.len();
            prop_assert_eq!(token.status == TokenStatus::Approved, done);
        }

        let again = machine.apply(
            &token,
            TokenAction::Approve { level: extra, evidence: EvidenceInput::default() },
            &actor,
            token.valid_from,
        );
        let is_invalid = matches!(again, Err(TokenError::InvalidTransition { .. }));
        prop_assert!(is_invalid);
    }

    /// Approving any level other than the outstanding one is a state error,
    /// never a permission error.
    #[test]
    fn prop_wrong_level_is_invalid_transition(
        token_type in arb_token_type(),
        level in arb_level(),
        actor in arb_actor(),
    ) {
        let token = sample_token(token_type, TokenStatus::PendingL1);
        prop_assume!(level != ApprovalLevel::L1);

        let result = machine().apply(
            &token,
            TokenAction::Approve { level, evidence: EvidenceInput::default() },
            &actor,
            token.valid_from,
        );
        let is_invalid = matches!(result, Err(TokenError::InvalidTransition { .. }));
        prop_assert!(is_invalid);
    }

    /// Validation succeeds exactly when the actor is in the owning pool and
    /// the time is inside the window.
    #[test]
    fn prop_validation_requires_pool_and_window(
        token_type in arb_token_type(),
        actor in arb_actor(),
        offset_minutes in -120i64..900,
    ) {
        prop_assume!(token_type != TokenType::UniformDelivery);
        let machine = machine();
        let token = sample_token(token_type, TokenStatus::Approved);
        let at = token.valid_from + Duration::minutes(offset_minutes);

        let result = machine.apply(
            &token,
            TokenAction::Validate { evidence: EvidenceInput::default() },
            &actor,
            at,
        );

        let in_pool = ValidationRouter::actor_pools(&actor)
            .contains(&machine.router().pool_for(token_type).unwrap());
        match result {
            Ok(transition) => {
                prop_assert!(in_pool && token.is_within_validity(at));
                prop_assert_eq!(transition.token.status, TokenStatus::Used);
            }
            Err(TokenError::Forbidden(_)) => prop_assert!(!in_pool),
            Err(TokenError::OutOfValidityWindow { .. }) => {
                prop_assert!(in_pool && !token.is_within_validity(at));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}
