use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentMode {
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "Credit")]
    Credit,
    #[sea_orm(string_value = "Online")]
    Online,
    #[sea_orm(string_value = "Card")]
    Card,
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMode::Cash => write!(f, "Cash"),
            PaymentMode::Credit => write!(f, "Credit"),
            PaymentMode::Online => write!(f, "Online"),
            PaymentMode::Card => write!(f, "Card"),
        }
    }
}

/// 订单，提交后不可修改（无改单/退款流程）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub total_sale: i64,
    pub tax: i64,
    pub amount_due: i64,
    pub total_cost: i64,
    pub profit: i64,
    pub payment_mode: PaymentMode,
    pub staff_id: i64,
    pub staff_username: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
