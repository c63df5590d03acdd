//! Checks on evidence references captured with approvals, validations and deliveries.

use crate::token::error::TokenError;
use crate::token::types::EvidenceRef;

/// Rejects references with an empty storage key or a non-image content type.
///
/// # Errors
///
/// Returns `ValidationFailed` naming `field`.
pub fn check_evidence(field: &str, evidence: &EvidenceRef) -> Result<(), TokenError> {
    if evidence.storage_key.trim().is_empty() {
        return Err(TokenError::ValidationFailed(format!(
            "{field} has an empty storage key"
        )));
    }
    if !evidence.content_type.starts_with("image/") {
        return Err(TokenError::ValidationFailed(format!(
            "{field} must be an image, got {}",
            evidence.content_type
        )));
    }
    Ok(())
}

/// [`check_evidence`] for an optional reference.
///
/// # Errors
///
/// Returns `ValidationFailed` naming `field`.
pub fn check_optional(field: &str, evidence: Option<&EvidenceRef>) -> Result<(), TokenError> {
    evidence.map_or(Ok(()), |e| check_evidence(field, e))
}
