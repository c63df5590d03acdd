//! `SeaORM` Entity for tokens table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub display_number: String,
    #[sea_orm(unique)]
    pub token_code: String,
    pub token_type: String,
    pub status: String,
    pub requester_id: Uuid,
    pub area: Option<String>,
    pub valid_from: DateTimeWithTimeZone,
    pub valid_until: DateTimeWithTimeZone,
    pub requires_level_1: bool,
    pub requires_level_2: bool,
    pub requires_level_3: bool,
    pub level_1_approved_at: Option<DateTimeWithTimeZone>,
    pub level_1_approved_by: Option<Uuid>,
    pub level_1_notes: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_1_signature: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_1_photo: Option<Json>,
    pub level_2_approved_at: Option<DateTimeWithTimeZone>,
    pub level_2_approved_by: Option<Uuid>,
    pub level_2_notes: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_2_signature: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_2_photo: Option<Json>,
    pub level_3_approved_at: Option<DateTimeWithTimeZone>,
    pub level_3_approved_by: Option<Uuid>,
    pub level_3_notes: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_3_signature: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub level_3_photo: Option<Json>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    pub rejected_level: Option<i16>,
    pub rejection_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub validated_by: Option<Uuid>,
    pub validated_at: Option<DateTimeWithTimeZone>,
    pub validation_notes: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub validation_signature: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub validation_photo: Option<Json>,
    pub expired_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "JsonBinary")]
    pub detail: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
