use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 菜单项
/// - price / cost: paise
/// - stock: NULL 表示不跟踪库存
/// - is_available: 软下架标记，菜单项不做物理删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub cost: i64,
    pub stock: Option<i32>,
    pub min_stock: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        matches!(self.stock, Some(stock) if stock <= self.min_stock)
    }

    /// Whether `quantity` more units can be sold from current stock.
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        match self.stock {
            None => true,
            Some(stock) => stock >= quantity,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
