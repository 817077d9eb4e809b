use crate::config::KioskConfig;
use crate::entities::{menu_item_entity, topping_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: i64,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    /// paise
    pub price: i64,
    pub cost: i64,
    /// null = 不跟踪库存
    pub stock: Option<i32>,
    pub min_stock: i32,
    pub is_available: bool,
    pub low_stock: bool,
    pub accepts_toppings: bool,
    pub updated_at: DateTime<Utc>,
}

impl MenuItemResponse {
    pub fn new(item: menu_item_entity::Model, kiosk: &KioskConfig) -> Self {
        Self {
            low_stock: item.is_low_stock(),
            accepts_toppings: kiosk.allows_toppings(&item.category),
            id: item.id,
            category: item.category,
            name: item.name,
            description: item.description,
            price: item.price,
            cost: item.cost,
            stock: item.stock,
            min_stock: item.min_stock,
            is_available: item.is_available,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct MenuQuery {
    pub category: Option<String>,
    pub available_only: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    #[schema(example = "Momos")]
    pub category: String,
    #[schema(example = "Paneer Half")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 9000)]
    pub price: i64,
    #[schema(example = 2500)]
    pub cost: i64,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub category: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub cost: Option<i64>,
    /// 设定库存并开始跟踪
    pub stock: Option<i32>,
    /// true 时停止跟踪库存 (stock 置空)
    pub untrack_stock: Option<bool>,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestockRequest {
    /// 正数入库，负数报损
    #[schema(example = 20)]
    pub delta: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ToppingResponse {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub is_available: bool,
}

impl From<topping_entity::Model> for ToppingResponse {
    fn from(t: topping_entity::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            price: t.price,
            is_available: t.is_available,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateToppingRequest {
    #[schema(example = "Extra Cheese")]
    pub name: String,
    #[schema(example = 2000)]
    pub price: i64,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateToppingRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CsvImportResult {
    pub created: u32,
    pub updated: u32,
}
