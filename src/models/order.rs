use crate::entities::{PaymentMode, order_entity, order_line_entity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitOrderRequest {
    pub payment_mode: PaymentMode,
    pub customer_id: Option<i64>,
    /// 顾客姓名或电话（自由文本）
    #[schema(example = "9876543210")]
    pub customer: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub menu_item_id: i64,
    pub category: String,
    pub item_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub toppings: Vec<String>,
    pub topping_unit_total: i64,
    pub line_total: i64,
    pub line_cost: i64,
}

impl From<order_line_entity::Model> for OrderLineResponse {
    fn from(line: order_line_entity::Model) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            category: line.category,
            item_name: line.item_name,
            unit_price: line.unit_price,
            quantity: line.quantity,
            toppings: split_toppings(&line.toppings),
            topping_unit_total: line.topping_unit_total,
            line_total: line.line_total,
            line_cost: line.line_cost,
        }
    }
}

pub fn split_toppings(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
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
    pub lines: Vec<OrderLineResponse>,
}

impl OrderResponse {
    pub fn new(order: order_entity::Model, lines: Vec<order_line_entity::Model>) -> Self {
        Self {
            id: order.id,
            created_at: order.created_at,
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            total_sale: order.total_sale,
            tax: order.tax,
            amount_due: order.amount_due,
            total_cost: order.total_cost,
            profit: order.profit,
            payment_mode: order.payment_mode,
            staff_id: order.staff_id,
            staff_username: order.staff_username,
            notes: order.notes,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// YYYY-MM-DD（本地日期，含）
    pub from: Option<String>,
    pub to: Option<String>,
    pub payment_mode: Option<PaymentMode>,
    pub customer_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayOrdersResponse {
    pub date: NaiveDate,
    pub order_count: i64,
    pub total_sale: i64,
    pub total_profit: i64,
    pub orders: Vec<OrderResponse>,
}
