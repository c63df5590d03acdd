//! Token repository for database operations.
//!
//! Implements [`TokenStore`] on top of the `tokens` table. Every write after
//! creation is a conditional `UPDATE ... WHERE id = $1 AND status = $2`, so a
//! transition only commits if nobody moved the token since it was read.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, Set, SqlErr, Statement,
};
use serde_json::Value as Json;
use tracing::debug;
use uuid::Uuid;

use crate::entities::tokens;
use gatepass_core::token::{
    ApprovalLevel, ApprovalRequirements, Cancellation, EvidenceRef, LevelApproval,
    LevelApprovals, Rejection, Token, TokenDetail, TokenError, TokenStatus, TokenStore,
    TokenType, ValidationRecord,
};

const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO token_sequences (year, last_value) VALUES ($1, 1)
ON CONFLICT (year) DO UPDATE SET last_value = token_sequences.last_value + 1
RETURNING last_value
";

#[derive(Debug, FromQueryResult)]
struct SequenceRow {
    last_value: i64,
}

/// Token repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    db: DatabaseConnection,
}

impl TokenRepository {
    /// Creates a new token repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn storage(e: &DbErr) -> TokenError {
    TokenError::Storage(e.to_string())
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn insert(&self, token: &Token) -> Result<(), TokenError> {
        let active = to_active_model(token)?;
        active.insert(&self.db).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
                TokenError::Storage(format!("duplicate token: {detail}"))
            } else {
                storage(&e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, TokenError> {
        tokens::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| storage(&e))?
            .map(to_domain)
            .transpose()
    }

    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>, TokenError> {
        tokens::Entity::find()
            .filter(tokens::Column::TokenCode.eq(token_code))
            .one(&self.db)
            .await
            .map_err(|e| storage(&e))?
            .map(to_domain)
            .transpose()
    }

    async fn compare_and_swap(
        &self,
        expected: TokenStatus,
        token: &Token,
    ) -> Result<bool, TokenError> {
        let mut active = to_active_model(token)?;
        active.id = NotSet;
        active.created_at = NotSet;

        let result = tokens::Entity::update_many()
            .set(active)
            .filter(tokens::Column::Id.eq(token.id))
            .filter(tokens::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| storage(&e))?;

        if result.rows_affected == 1 {
            return Ok(true);
        }

        // Zero rows: either the status moved or the row is gone.
        let exists = tokens::Entity::find_by_id(token.id)
            .one(&self.db)
            .await
            .map_err(|e| storage(&e))?
            .is_some();
        if exists {
            debug!(token_id = %token.id, expected = %expected, "status moved before write");
            Ok(false)
        } else {
            Err(TokenError::NotFound(token.id.to_string()))
        }
    }

    async fn list_by_status(
        &self,
        statuses: &[TokenStatus],
        types: Option<&[TokenType]>,
    ) -> Result<Vec<Token>, TokenError> {
        let mut query = tokens::Entity::find()
            .filter(tokens::Column::Status.is_in(statuses.iter().map(TokenStatus::as_str)));
        if let Some(types) = types {
            query = query.filter(tokens::Column::TokenType.is_in(types.iter().map(TokenType::as_str)));
        }

        query
            .order_by_desc(tokens::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| storage(&e))?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<Token>, TokenError> {
        tokens::Entity::find()
            .filter(
                tokens::Column::Status.is_in(TokenStatus::EXPIRABLE.iter().map(TokenStatus::as_str)),
            )
            .filter(tokens::Column::ValidUntil.lt(now))
            .order_by_asc(tokens::Column::ValidUntil)
            .all(&self.db)
            .await
            .map_err(|e| storage(&e))?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn next_display_sequence(&self, year: i32) -> Result<u64, TokenError> {
        let row = SequenceRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_SEQUENCE_SQL,
            [year.into()],
        ))
        .one(&self.db)
        .await
        .map_err(|e| storage(&e))?
        .ok_or_else(|| TokenError::Storage(format!("no display sequence returned for {year}")))?;

        u64::try_from(row.last_value)
            .map_err(|_| TokenError::Storage(format!("negative display sequence for {year}")))
    }
}

// ============================================================================
// Row conversion
// ============================================================================

fn corrupt(token_id: Uuid, what: impl std::fmt::Display) -> TokenError {
    TokenError::Storage(format!("token {token_id} has corrupt {what}"))
}

fn utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn evidence_to_json(evidence: Option<&EvidenceRef>) -> Result<Option<Json>, TokenError> {
    evidence
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| TokenError::Storage(e.to_string()))
}

fn evidence_from_json(token_id: Uuid, value: Option<Json>) -> Result<Option<EvidenceRef>, TokenError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| corrupt(token_id, format!("evidence: {e}")))
}

/// Reassembles one approval slot from its five columns.
fn level_from_columns(
    token_id: Uuid,
    approved_at: Option<DateTime<FixedOffset>>,
    approved_by: Option<Uuid>,
    notes: Option<String>,
    signature: Option<Json>,
    photo: Option<Json>,
) -> Result<Option<LevelApproval>, TokenError> {
    match (approved_at, approved_by) {
        (Some(at), Some(by)) => Ok(Some(LevelApproval {
            approved_at: utc(at),
            approved_by: by,
            notes,
            signature: evidence_from_json(token_id, signature)?,
            photo: evidence_from_json(token_id, photo)?,
        })),
        (None, None) => Ok(None),
        _ => Err(corrupt(token_id, "approval columns")),
    }
}

/// Converts a database row to a domain token.
pub fn to_domain(model: tokens::Model) -> Result<Token, TokenError> {
    let id = model.id;
    let status = TokenStatus::parse(&model.status)
        .ok_or_else(|| corrupt(id, format!("status '{}'", model.status)))?;
    let detail: TokenDetail = serde_json::from_value(model.detail)
        .map_err(|e| corrupt(id, format!("detail: {e}")))?;
    if detail.token_type().as_str() != model.token_type {
        return Err(corrupt(id, format!("token_type '{}'", model.token_type)));
    }

    let approvals = LevelApprovals {
        level_1: level_from_columns(
            id,
            model.level_1_approved_at,
            model.level_1_approved_by,
            model.level_1_notes,
            model.level_1_signature,
            model.level_1_photo,
        )?,
        level_2: level_from_columns(
            id,
            model.level_2_approved_at,
            model.level_2_approved_by,
            model.level_2_notes,
            model.level_2_signature,
            model.level_2_photo,
        )?,
        level_3: level_from_columns(
            id,
            model.level_3_approved_at,
            model.level_3_approved_by,
            model.level_3_notes,
            model.level_3_signature,
            model.level_3_photo,
        )?,
    };

    let rejection = match (
        model.rejected_by,
        model.rejected_at,
        model.rejected_level,
        model.rejection_reason,
    ) {
        (Some(rejected_by), Some(at), Some(level), Some(reason)) => Some(Rejection {
            rejected_by,
            rejected_at: utc(at),
            level: u8::try_from(level)
                .ok()
                .and_then(ApprovalLevel::from_number)
                .ok_or_else(|| corrupt(id, format!("rejected_level {level}")))?,
            reason,
        }),
        (None, None, None, None) => None,
        _ => return Err(corrupt(id, "rejection columns")),
    };

    let cancellation = match (model.cancelled_by, model.cancelled_at) {
        (Some(cancelled_by), Some(at)) => Some(Cancellation {
            cancelled_by,
            cancelled_at: utc(at),
        }),
        (None, None) => None,
        _ => return Err(corrupt(id, "cancellation columns")),
    };

    let validation = match (model.validated_by, model.validated_at) {
        (Some(validated_by), Some(at)) => Some(ValidationRecord {
            validated_by,
            validated_at: utc(at),
            notes: model.validation_notes,
            signature: evidence_from_json(id, model.validation_signature)?,
            photo: evidence_from_json(id, model.validation_photo)?,
        }),
        (None, None) => None,
        _ => return Err(corrupt(id, "validation columns")),
    };

    Ok(Token {
        id,
        display_number: model.display_number,
        token_code: model.token_code,
        status,
        requester_id: model.requester_id,
        area: model.area,
        valid_from: utc(model.valid_from),
        valid_until: utc(model.valid_until),
        requirements: ApprovalRequirements::new(
            model.requires_level_1,
            model.requires_level_2,
            model.requires_level_3,
        ),
        approvals,
        rejection,
        cancellation,
        validation,
        expired_at: model.expired_at.map(utc),
        detail,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

/// Converts a domain token to a fully populated active model.
pub fn to_active_model(token: &Token) -> Result<tokens::ActiveModel, TokenError> {
    let detail =
        serde_json::to_value(&token.detail).map_err(|e| TokenError::Storage(e.to_string()))?;
    let [l1, l2, l3] = ApprovalLevel::ALL.map(|level| token.approvals.get(level));
    let rejection = token.rejection.as_ref();
    let cancellation = token.cancellation.as_ref();
    let validation = token.validation.as_ref();

    Ok(tokens::ActiveModel {
        id: Set(token.id),
        display_number: Set(token.display_number.clone()),
        token_code: Set(token.token_code.clone()),
        token_type: Set(token.token_type().as_str().to_string()),
        status: Set(token.status.as_str().to_string()),
        requester_id: Set(token.requester_id),
        area: Set(token.area.clone()),
        valid_from: Set(token.valid_from.into()),
        valid_until: Set(token.valid_until.into()),
        requires_level_1: Set(token.requirements.level_1),
        requires_level_2: Set(token.requirements.level_2),
        requires_level_3: Set(token.requirements.level_3),
        level_1_approved_at: Set(l1.map(|a| a.approved_at.into())),
        level_1_approved_by: Set(l1.map(|a| a.approved_by)),
        level_1_notes: Set(l1.and_then(|a| a.notes.clone())),
        level_1_signature: Set(evidence_to_json(l1.and_then(|a| a.signature.as_ref()))?),
        level_1_photo: Set(evidence_to_json(l1.and_then(|a| a.photo.as_ref()))?),
        level_2_approved_at: Set(l2.map(|a| a.approved_at.into())),
        level_2_approved_by: Set(l2.map(|a| a.approved_by)),
        level_2_notes: Set(l2.and_then(|a| a.notes.clone())),
        level_2_signature: Set(evidence_to_json(l2.and_then(|a| a.signature.as_ref()))?),
        level_2_photo: Set(evidence_to_json(l2.and_then(|a| a.photo.as_ref()))?),
        level_3_approved_at: Set(l3.map(|a| a.approved_at.into())),
        level_3_approved_by: Set(l3.map(|a| a.approved_by)),
        level_3_notes: Set(l3.and_then(|a| a.notes.clone())),
        level_3_signature: Set(evidence_to_json(l3.and_then(|a| a.signature.as_ref()))?),
        level_3_photo: Set(evidence_to_json(l3.and_then(|a| a.photo.as_ref()))?),
        rejected_by: Set(rejection.map(|r| r.rejected_by)),
        rejected_at: Set(rejection.map(|r| r.rejected_at.into())),
        rejected_level: Set(rejection.map(|r| i16::from(r.level.number()))),
        rejection_reason: Set(rejection.map(|r| r.reason.clone())),
        cancelled_by: Set(cancellation.map(|c| c.cancelled_by)),
        cancelled_at: Set(cancellation.map(|c| c.cancelled_at.into())),
        validated_by: Set(validation.map(|v| v.validated_by)),
        validated_at: Set(validation.map(|v| v.validated_at.into())),
        validation_notes: Set(validation.and_then(|v| v.notes.clone())),
        validation_signature: Set(evidence_to_json(validation.and_then(|v| v.signature.as_ref()))?),
        validation_photo: Set(evidence_to_json(validation.and_then(|v| v.photo.as_ref()))?),
        expired_at: Set(token.expired_at.map(Into::into)),
        detail: Set(detail),
        created_at: Set(token.created_at.into()),
        updated_at: Set(token.updated_at.into()),
    })
}
