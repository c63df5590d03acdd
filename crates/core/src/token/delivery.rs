//! Uniform delivery completion.
//!
//! The terminal step of a uniform delivery replaces validation: the receiver
//! signs, up to two photographs are bound, and the token becomes used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token::actor::ActorContext;
use crate::token::error::TokenError;
use crate::token::evidence::check_evidence;
use crate::token::types::{
    DeliveryRecord, EvidenceRef, Token, TokenChange, TokenStatus, TokenType,
};

/// Maximum number of photographs bound to a delivery.
pub const MAX_DELIVERY_PHOTOS: usize = 2;

/// Evidence submitted when completing a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryInput {
    /// Receiver's signature. Required.
    pub signature: Option<EvidenceRef>,
    /// Up to [`MAX_DELIVERY_PHOTOS`] photographs.
    #[serde(default)]
    pub photos: Vec<EvidenceRef>,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Stateless handler for the delivery sub-flow.
pub struct DeliveryCompletionHandler;

impl DeliveryCompletionHandler {
    /// Checks that the token is an approved, undelivered uniform delivery.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` otherwise.
    pub fn check_ready(token: &Token) -> Result<(), TokenError> {
        if token.token_type() != TokenType::UniformDelivery
            || token.status != TokenStatus::Approved
            || token.is_delivered()
        {
            return Err(TokenError::invalid(token.status, "complete delivery of"));
        }
        Ok(())
    }

    /// Checks the preconditions and builds the completion change.
    ///
    /// Approval levels are not re-checked: reaching `Approved` already
    /// implies them. Any authenticated actor may complete a delivery.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` if the token is not an approved, undelivered
    ///   uniform delivery
    /// * `ValidationFailed` if the signature is missing, there are too many
    ///   photos, or an evidence reference is malformed
    pub fn complete(
        token: &Token,
        input: DeliveryInput,
        actor: &ActorContext,
        now: DateTime<Utc>,
    ) -> Result<TokenChange, TokenError> {
        Self::check_ready(token)?;

        let signature = input.signature.ok_or_else(|| {
            TokenError::ValidationFailed("delivery requires the receiver's signature".to_string())
        })?;
        if input.photos.len() > MAX_DELIVERY_PHOTOS {
            return Err(TokenError::ValidationFailed(format!(
                "at most {MAX_DELIVERY_PHOTOS} photos may be attached, got {}",
                input.photos.len()
            )));
        }
        check_evidence("signature", &signature)?;
        for photo in &input.photos {
            check_evidence("photo", photo)?;
        }

        Ok(TokenChange::CompleteDelivery {
            new_status: TokenStatus::Used,
            delivery: DeliveryRecord {
                is_delivered: true,
                delivered_by: Some(actor.user_id),
                delivered_at: Some(now),
                signature: Some(signature),
                photos: input.photos,
                notes: input.notes,
            },
            completed_at: now,
        })
    }
}
