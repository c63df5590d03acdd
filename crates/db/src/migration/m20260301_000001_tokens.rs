//! Tokens migration.
//!
//! Creates the tokens table and the per-year display sequence.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(TOKENS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS tokens CASCADE; DROP TABLE IF EXISTS token_sequences CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const TOKENS_SQL: &str = r"
CREATE TABLE token_sequences (
    year INTEGER PRIMARY KEY,
    last_value BIGINT NOT NULL CHECK (last_value > 0)
);

CREATE TABLE tokens (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    display_number VARCHAR(32) NOT NULL,
    token_code VARCHAR(64) NOT NULL,
    token_type TEXT NOT NULL CHECK (token_type IN (
        'permit_hour', 'permit_day', 'exit_pass', 'uniform_delivery',
        'substitution', 'rate_change', 'overtime', 'shift_change'
    )),
    status TEXT NOT NULL CHECK (status IN (
        'draft', 'pending_l1', 'pending_l2', 'pending_l3', 'approved',
        'used', 'expired', 'cancelled', 'rejected'
    )),
    requester_id UUID NOT NULL,
    area TEXT,
    valid_from TIMESTAMPTZ NOT NULL,
    valid_until TIMESTAMPTZ NOT NULL,

    requires_level_1 BOOLEAN NOT NULL,
    requires_level_2 BOOLEAN NOT NULL,
    requires_level_3 BOOLEAN NOT NULL,

    level_1_approved_at TIMESTAMPTZ,
    level_1_approved_by UUID,
    level_1_notes TEXT,
    level_1_signature JSONB,
    level_1_photo JSONB,
    level_2_approved_at TIMESTAMPTZ,
    level_2_approved_by UUID,
    level_2_notes TEXT,
    level_2_signature JSONB,
    level_2_photo JSONB,
    level_3_approved_at TIMESTAMPTZ,
    level_3_approved_by UUID,
    level_3_notes TEXT,
    level_3_signature JSONB,
    level_3_photo JSONB,

    rejected_by UUID,
    rejected_at TIMESTAMPTZ,
    rejected_level SMALLINT CHECK (rejected_level BETWEEN 1 AND 3),
    rejection_reason TEXT,
    cancelled_by UUID,
    cancelled_at TIMESTAMPTZ,
    validated_by UUID,
    validated_at TIMESTAMPTZ,
    validation_notes TEXT,
    validation_signature JSONB,
    validation_photo JSONB,
    expired_at TIMESTAMPTZ,

    detail JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_tokens_window CHECK (valid_until > valid_from),
    CONSTRAINT chk_tokens_some_level CHECK (requires_level_1 OR requires_level_2 OR requires_level_3),
    CONSTRAINT chk_tokens_level_1 CHECK ((level_1_approved_at IS NULL) = (level_1_approved_by IS NULL)),
    CONSTRAINT chk_tokens_level_2 CHECK ((level_2_approved_at IS NULL) = (level_2_approved_by IS NULL)),
    CONSTRAINT chk_tokens_level_3 CHECK ((level_3_approved_at IS NULL) = (level_3_approved_by IS NULL)),
    CONSTRAINT chk_tokens_rejection CHECK (status <> 'rejected' OR rejection_reason IS NOT NULL)
);

CREATE UNIQUE INDEX idx_tokens_display_number ON tokens(display_number);
CREATE UNIQUE INDEX idx_tokens_code ON tokens(token_code);

-- Pending and validation queues
CREATE INDEX idx_tokens_status ON tokens(status, token_type, created_at DESC);

-- Expiry sweep
CREATE INDEX idx_tokens_expirable ON tokens(status, valid_until)
    WHERE status IN ('draft', 'pending_l1', 'pending_l2', 'pending_l3', 'approved');
";
