use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CreditEntryKind {
    /// 赊账下单，金额为正
    #[sea_orm(string_value = "Charge")]
    Charge,
    /// 还款，金额为负
    #[sea_orm(string_value = "Payment")]
    Payment,
    /// 管理员调整，金额可正可负
    #[sea_orm(string_value = "Adjustment")]
    Adjustment,
}

impl std::fmt::Display for CreditEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditEntryKind::Charge => write!(f, "Charge"),
            CreditEntryKind::Payment => write!(f, "Payment"),
            CreditEntryKind::Adjustment => write!(f, "Adjustment"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "credit_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    pub kind: CreditEntryKind,
    /// 带符号金额 (paise)
    pub amount: i64,
    pub order_id: Option<i64>,
    pub note: Option<String>,
    pub staff_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
