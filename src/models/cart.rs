use crate::pricing::OrderTotals;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// 购物车中未定价的一行；价格在查看和下单时按当前菜单计算
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub line_id: Uuid,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub topping_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    pub entries: Vec<CartEntry>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 同一菜品在购物车中的总数量；超出 i32 范围时返回 None
    pub fn quantity_of(&self, menu_item_id: i64) -> Option<i32> {
        self.entries
            .iter()
            .filter(|e| e.menu_item_id == menu_item_id)
            .try_fold(0i32, |acc, e| acc.checked_add(e.quantity))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddCartLineRequest {
    pub menu_item_id: i64,
    #[schema(example = 2)]
    pub quantity: i32,
    #[serde(default)]
    pub topping_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineView {
    pub line_id: Uuid,
    pub menu_item_id: i64,
    pub category: String,
    pub item_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub toppings: Vec<String>,
    pub topping_unit_total: i64,
    pub line_total: i64,
    /// false 时该行无法下单（菜品或小料已下架）
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub totals: OrderTotals,
}
