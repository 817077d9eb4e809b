use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// 未结清赊账 (paise)，等于 credit_entries 金额之和
    pub credit_balance: i64,
    pub total_spent: i64,
    pub order_count: i64,
    pub loyalty_points: i64,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
