use crate::entities::{CreditEntryKind, credit_entry_entity, customer_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_balance: i64,
    pub total_spent: i64,
    pub order_count: i64,
    pub loyalty_points: i64,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub last_order_at: Option<DateTime<Utc>>,
}

impl From<customer_entity::Model> for CustomerResponse {
    fn from(c: customer_entity::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            phone: c.phone,
            email: c.email,
            address: c.address,
            credit_balance: c.credit_balance,
            total_spent: c.total_spent,
            order_count: c.order_count,
            loyalty_points: c.loyalty_points,
            is_active: c.is_active,
            joined_at: c.joined_at,
            last_order_at: c.last_order_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct CustomerQuery {
    /// 姓名或电话子串
    pub search: Option<String>,
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    #[schema(example = "Ravi Kumar")]
    pub name: String,
    #[schema(example = "9876543210")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// paise, > 0
    #[schema(example = 5000)]
    pub amount: i64,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustBalanceRequest {
    /// 带符号 paise
    #[schema(example = -2000)]
    pub amount: i64,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditEntryResponse {
    pub id: i64,
    pub customer_id: i64,
    pub kind: CreditEntryKind,
    pub amount: i64,
    pub order_id: Option<i64>,
    pub note: Option<String>,
    pub staff_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<credit_entry_entity::Model> for CreditEntryResponse {
    fn from(e: credit_entry_entity::Model) -> Self {
        Self {
            id: e.id,
            customer_id: e.customer_id,
            kind: e.kind,
            amount: e.amount,
            order_id: e.order_id,
            note: e.note,
            staff_id: e.staff_id,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditUpdateResponse {
    pub customer: CustomerResponse,
    pub entry: CreditEntryResponse,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct LedgerQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OutstandingSummary {
    pub total_outstanding: i64,
    pub customers: Vec<CustomerResponse>,
}
