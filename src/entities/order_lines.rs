use sea_orm::entity::prelude::*;

/// 订单明细；名称与单价为下单时快照
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "order_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub category: String,
    pub item_name: String,
    pub unit_price: i64,
    pub unit_cost: i64,
    pub quantity: i32,
    /// 逗号分隔的小料名称
    pub toppings: String,
    pub topping_unit_total: i64,
    pub line_total: i64,
    pub line_cost: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
