use crate::entities::{CreditEntryKind, credit_entry_entity as credit, customer_entity as customers};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdjustBalanceRequest, AuthUser, CreateCustomerRequest, CreditEntryResponse,
    CreditUpdateResponse, CustomerQuery, CustomerResponse, LedgerQuery, OutstandingSummary,
    PaginatedResponse, PaginationParams, RecordPaymentRequest, UpdateCustomerRequest,
};
use crate::utils::{format_amount, looks_like_phone, normalize_phone};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct CustomerService {
    pool: DatabaseConnection,
}

impl CustomerService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_customer(&self, req: CreateCustomerRequest) -> AppResult<CustomerResponse> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Customer name is required".to_string()));
        }
        let phone = clean_phone(req.phone)?;
        if let Some(phone) = &phone {
            ensure_phone_free(&self.pool, phone, None).await?;
        }

        let customer = insert_customer(
            &self.pool,
            name,
            phone,
            clean_optional(req.email),
            clean_optional(req.address),
        )
        .await?;
        Ok(customer.into())
    }

    pub async fn list_customers(
        &self,
        query: &CustomerQuery,
    ) -> AppResult<PaginatedResponse<CustomerResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut select = customers::Entity::find();
        if !query.include_inactive.unwrap_or(false) {
            select = select.filter(customers::Column::IsActive.eq(true));
        }
        if let Some(search) = query.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            select = select.filter(
                Condition::any()
                    .add(customers::Column::Name.contains(search))
                    .add(customers::Column::Phone.contains(search)),
            );
        }

        let total = select.clone().count(&self.pool).await? as i64;
        let list = select
            .order_by_asc(customers::Column::Name)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::from_params(
            list.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    pub async fn get_customer(&self, id: i64) -> AppResult<CustomerResponse> {
        Ok(find_customer(&self.pool, id).await?.into())
    }

    pub async fn update_customer(
        &self,
        id: i64,
        req: UpdateCustomerRequest,
    ) -> AppResult<CustomerResponse> {
        let customer = find_customer(&self.pool, id).await?;
        let mut am = customer.into_active_model();

        if let Some(name) = req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::ValidationError("Customer name is required".to_string()));
            }
            am.name = Set(name.to_string());
        }
        if req.phone.is_some() {
            let phone = clean_phone(req.phone)?;
            if let Some(phone) = &phone {
                ensure_phone_free(&self.pool, phone, Some(id)).await?;
            }
            am.phone = Set(phone);
        }
        if let Some(email) = req.email {
            am.email = Set(clean_optional(Some(email)));
        }
        if let Some(address) = req.address {
            am.address = Set(clean_optional(Some(address)));
        }
        if let Some(is_active) = req.is_active {
            am.is_active = Set(is_active);
        }
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }

    /// 记录还款：金额必须 > 0 且不超过未结清余额
    pub async fn record_payment(
        &self,
        customer_id: i64,
        req: RecordPaymentRequest,
        staff: &AuthUser,
    ) -> AppResult<CreditUpdateResponse> {
        if req.amount <= 0 {
            return Err(AppError::ValidationError(
                "Payment amount must be greater than 0".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;
        let customer = find_customer(&txn, customer_id).await?;
        if req.amount > customer.credit_balance {
            return Err(AppError::ValidationError(format!(
                "Payment {} exceeds outstanding balance {}",
                format_amount(req.amount),
                format_amount(customer.credit_balance)
            )));
        }

        let entry = post_credit_entry(
            &txn,
            customer_id,
            CreditEntryKind::Payment,
            -req.amount,
            None,
            clean_optional(req.note),
            staff.id,
        )
        .await?;
        let customer = find_customer(&txn, customer_id).await?;
        txn.commit().await?;

        log::info!(
            "Payment {} recorded for customer {} by {}, balance now {}",
            format_amount(req.amount),
            customer.name,
            staff.username,
            format_amount(customer.credit_balance)
        );
        Ok(CreditUpdateResponse {
            customer: customer.into(),
            entry: entry.into(),
        })
    }

    /// 管理员调整余额（带符号），余额不得为负
    pub async fn adjust_balance(
        &self,
        customer_id: i64,
        req: AdjustBalanceRequest,
        staff: &AuthUser,
    ) -> AppResult<CreditUpdateResponse> {
        staff.require_admin()?;
        if req.amount == 0 {
            return Err(AppError::ValidationError(
                "Adjustment amount must not be zero".to_string(),
            ));
        }
        let note = req.note.trim();
        if note.is_empty() {
            return Err(AppError::ValidationError(
                "A note is required for balance adjustments".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;
        let customer = find_customer(&txn, customer_id).await?;
        if customer.credit_balance + req.amount < 0 {
            return Err(AppError::ValidationError(format!(
                "Adjustment would make the balance negative (current {})",
                format_amount(customer.credit_balance)
            )));
        }
        let entry = post_credit_entry(
            &txn,
            customer_id,
            CreditEntryKind::Adjustment,
            req.amount,
            None,
            Some(note.to_string()),
            staff.id,
        )
        .await?;
        let customer = find_customer(&txn, customer_id).await?;
        txn.commit().await?;

        log::info!(
            "Balance of customer {} adjusted by {} ({})",
            customer.name,
            format_amount(req.amount),
            staff.username
        );
        Ok(CreditUpdateResponse {
            customer: customer.into(),
            entry: entry.into(),
        })
    }

    pub async fn ledger(
        &self,
        customer_id: i64,
        query: &LedgerQuery,
    ) -> AppResult<PaginatedResponse<CreditEntryResponse>> {
        find_customer(&self.pool, customer_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);

        let select = credit::Entity::find().filter(credit::Column::CustomerId.eq(customer_id));
        let total = select.clone().count(&self.pool).await? as i64;
        let list = select
            .order_by_desc(credit::Column::CreatedAt)
            .order_by_desc(credit::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::from_params(
            list.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    pub async fn outstanding(&self) -> AppResult<OutstandingSummary> {
        let list = customers::Entity::find()
            .filter(customers::Column::CreditBalance.gt(0))
            .order_by_desc(customers::Column::CreditBalance)
            .order_by_asc(customers::Column::Name)
            .all(&self.pool)
            .await?;
        let total_outstanding = list.iter().map(|c| c.credit_balance).sum();
        Ok(OutstandingSummary {
            total_outstanding,
            customers: list.into_iter().map(Into::into).collect(),
        })
    }
}

pub(crate) async fn find_customer<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> AppResult<customers::Model> {
    customers::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))
}

/// 下单时识别顾客：
/// 1. 指定 `customer_id` 时直接使用
/// 2. 自由文本先按电话精确匹配，再按姓名（不区分大小写）唯一匹配
/// 3. 姓名匹配到多人时报错，未匹配则新建顾客
pub(crate) async fn resolve_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: Option<i64>,
    text: Option<&str>,
) -> AppResult<Option<customers::Model>> {
    if let Some(id) = customer_id {
        return find_customer(conn, id).await.map(Some);
    }
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };

    let phone = looks_like_phone(text).then(|| normalize_phone(text));
    if let Some(phone) = &phone
        && let Some(found) = customers::Entity::find()
            .filter(customers::Column::Phone.eq(phone.as_str()))
            .one(conn)
            .await?
    {
        return Ok(Some(found));
    }

    // 两边都用 SQLite 的 lower()，折叠规则一致
    let mut by_name = customers::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(customers::Column::Name)))
                .eq(Func::lower(Expr::val(text))),
        )
        .limit(2)
        .all(conn)
        .await?;
    match by_name.len() {
        0 => {}
        1 => return Ok(by_name.pop()),
        _ => {
            return Err(AppError::ValidationError(format!(
                "More than one customer is named '{text}'; select the customer explicitly"
            )));
        }
    }

    let created = insert_customer(conn, text, phone, None, None).await?;
    log::info!("New customer created from order: {} (#{})", created.name, created.id);
    Ok(Some(created))
}

/// 记一笔账并同步更新顾客余额
pub(crate) async fn post_credit_entry<C: ConnectionTrait>(
    conn: &C,
    customer_id: i64,
    kind: CreditEntryKind,
    amount: i64,
    order_id: Option<i64>,
    note: Option<String>,
    staff_id: i64,
) -> AppResult<credit::Model> {
    let now = Utc::now();
    let entry = credit::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(kind),
        amount: Set(amount),
        order_id: Set(order_id),
        note: Set(note),
        staff_id: Set(staff_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let res = customers::Entity::update_many()
        .col_expr(
            customers::Column::CreditBalance,
            Expr::col(customers::Column::CreditBalance).add(amount),
        )
        .col_expr(customers::Column::UpdatedAt, Expr::value(now))
        .filter(customers::Column::Id.eq(customer_id))
        .filter(Expr::expr(Expr::col(customers::Column::CreditBalance).add(amount)).gte(0))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::ValidationError(
            "Credit balance cannot become negative".to_string(),
        ));
    }
    Ok(entry)
}

/// 下单后更新消费统计
pub(crate) async fn record_order_activity<C: ConnectionTrait>(
    conn: &C,
    customer_id: i64,
    amount_due: i64,
    points: i64,
    at: DateTime<Utc>,
) -> AppResult<()> {
    customers::Entity::update_many()
        .col_expr(
            customers::Column::TotalSpent,
            Expr::col(customers::Column::TotalSpent).add(amount_due),
        )
        .col_expr(
            customers::Column::OrderCount,
            Expr::col(customers::Column::OrderCount).add(1),
        )
        .col_expr(
            customers::Column::LoyaltyPoints,
            Expr::col(customers::Column::LoyaltyPoints).add(points),
        )
        .col_expr(customers::Column::LastOrderAt, Expr::value(Some(at)))
        .col_expr(customers::Column::UpdatedAt, Expr::value(at))
        .filter(customers::Column::Id.eq(customer_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn insert_customer<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
) -> AppResult<customers::Model> {
    let now = Utc::now();
    let customer = customers::ActiveModel {
        name: Set(name.to_string()),
        phone: Set(phone),
        email: Set(email),
        address: Set(address),
        credit_balance: Set(0),
        total_spent: Set(0),
        order_count: Set(0),
        loyalty_points: Set(0),
        is_active: Set(true),
        joined_at: Set(now),
        last_order_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(customer)
}

async fn ensure_phone_free<C: ConnectionTrait>(
    conn: &C,
    phone: &str,
    excluding: Option<i64>,
) -> AppResult<()> {
    let mut select = customers::Entity::find().filter(customers::Column::Phone.eq(phone));
    if let Some(id) = excluding {
        select = select.filter(customers::Column::Id.ne(id));
    }
    if select.count(conn).await? > 0 {
        return Err(AppError::ValidationError(format!(
            "Phone {phone} is already registered to another customer"
        )));
    }
    Ok(())
}

fn clean_phone(phone: Option<String>) -> AppResult<Option<String>> {
    match clean_optional(phone) {
        None => Ok(None),
        Some(p) if looks_like_phone(&p) => Ok(Some(normalize_phone(&p))),
        Some(p) => Err(AppError::ValidationError(format!("Invalid phone number: {p}"))),
    }
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::test_db;
    use crate::entities::UserRole;
    use crate::models::Page;

    fn staff() -> AuthUser {
        AuthUser {
            id: 2,
            username: "ravi".into(),
            role: UserRole::Staff,
            pages: vec![Page::Customers],
        }
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: 1,
            username: "admin".into(),
            role: UserRole::Admin,
            pages: vec![],
        }
    }

    fn new_customer(name: &str, phone: Option<&str>) -> CreateCustomerRequest {
        CreateCustomerRequest {
            name: name.into(),
            phone: phone.map(Into::into),
            email: None,
            address: None,
        }
    }

    async fn charge(db: &DatabaseConnection, customer_id: i64, amount: i64) {
        post_credit_entry(db, customer_id, CreditEntryKind::Charge, amount, None, None, 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_search() {
        let svc = CustomerService::new(test_db().await);
        let ravi = svc
            .create_customer(new_customer("Ravi Kumar", Some("+91 98765 43210")))
            .await
            .unwrap();
        assert_eq!(ravi.phone.as_deref(), Some("+919876543210"));
        svc.create_customer(new_customer("Sita", None)).await.unwrap();

        assert!(svc
            .create_customer(new_customer("Other", Some("+919876543210")))
            .await
            .is_err());
        assert!(svc.create_customer(new_customer(" ", None)).await.is_err());

        let found = svc
            .list_customers(&CustomerQuery {
                search: Some("ravi".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.data[0].id, ravi.id);

        let by_phone = svc
            .list_customers(&CustomerQuery {
                search: Some("98765".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_phone.total, 1);
    }

    #[tokio::test]
    async fn test_inactive_hidden_unless_requested() {
        let svc = CustomerService::new(test_db().await);
        let c = svc.create_customer(new_customer("Sita", None)).await.unwrap();
        svc.update_customer(
            c.id,
            UpdateCustomerRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let visible = svc.list_customers(&CustomerQuery::default()).await.unwrap();
        assert_eq!(visible.total, 0);
        let all = svc
            .list_customers(&CustomerQuery {
                include_inactive: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.total, 1);
    }

    #[tokio::test]
    async fn test_payment_rules() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let c = svc.create_customer(new_customer("Ravi", None)).await.unwrap();
        charge(&db, c.id, 25_000).await;

        let zero = RecordPaymentRequest { amount: 0, note: None };
        assert!(svc.record_payment(c.id, zero, &staff()).await.is_err());
        let too_much = RecordPaymentRequest { amount: 25_001, note: None };
        assert!(svc.record_payment(c.id, too_much, &staff()).await.is_err());

        let paid = svc
            .record_payment(
                c.id,
                RecordPaymentRequest {
                    amount: 10_000,
                    note: Some("cash".into()),
                },
                &staff(),
            )
            .await
            .unwrap();
        assert_eq!(paid.customer.credit_balance, 15_000);
        assert_eq!(paid.entry.kind, CreditEntryKind::Payment);
        assert_eq!(paid.entry.amount, -10_000);
    }

    #[tokio::test]
    async fn test_balance_equals_ledger_sum() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let c = svc.create_customer(new_customer("Ravi", None)).await.unwrap();
        charge(&db, c.id, 12_000).await;
        charge(&db, c.id, 8_000).await;
        svc.record_payment(c.id, RecordPaymentRequest { amount: 5_000, note: None }, &staff())
            .await
            .unwrap();
        svc.adjust_balance(
            c.id,
            AdjustBalanceRequest {
                amount: -1_000,
                note: "rounding".into(),
            },
            &admin(),
        )
        .await
        .unwrap();

        let ledger = svc.ledger(c.id, &LedgerQuery::default()).await.unwrap();
        assert_eq!(ledger.total, 4);
        let sum: i64 = ledger.data.iter().map(|e| e.amount).sum();
        let customer = svc.get_customer(c.id).await.unwrap();
        assert_eq!(customer.credit_balance, sum);
        assert_eq!(customer.credit_balance, 14_000);
        // 最新的在前
        assert_eq!(ledger.data[0].kind, CreditEntryKind::Adjustment);
    }

    #[tokio::test]
    async fn test_adjustment_rules() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let c = svc.create_customer(new_customer("Ravi", None)).await.unwrap();
        charge(&db, c.id, 3_000).await;

        let req = || AdjustBalanceRequest {
            amount: -5_000,
            note: "write off".into(),
        };
        assert!(matches!(
            svc.adjust_balance(c.id, req(), &staff()).await,
            Err(AppError::PermissionDenied)
        ));
        assert!(svc.adjust_balance(c.id, req(), &admin()).await.is_err());

        let no_note = AdjustBalanceRequest {
            amount: 1_000,
            note: "  ".into(),
        };
        assert!(svc.adjust_balance(c.id, no_note, &admin()).await.is_err());
        assert_eq!(svc.get_customer(c.id).await.unwrap().credit_balance, 3_000);
    }

    #[tokio::test]
    async fn test_outstanding_summary() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let a = svc.create_customer(new_customer("A", None)).await.unwrap();
        let b = svc.create_customer(new_customer("B", None)).await.unwrap();
        svc.create_customer(new_customer("C", None)).await.unwrap();
        charge(&db, a.id, 2_000).await;
        charge(&db, b.id, 9_000).await;

        let summary = svc.outstanding().await.unwrap();
        assert_eq!(summary.total_outstanding, 11_000);
        assert_eq!(summary.customers.len(), 2);
        assert_eq!(summary.customers[0].id, b.id);
    }

    #[tokio::test]
    async fn test_resolve_customer_from_text() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let ravi = svc
            .create_customer(new_customer("Ravi Kumar", Some("9876543210")))
            .await
            .unwrap();

        let by_phone = resolve_customer(&db, None, Some("98765 43210")).await.unwrap().unwrap();
        assert_eq!(by_phone.id, ravi.id);
        let by_name = resolve_customer(&db, None, Some("ravi kumar")).await.unwrap().unwrap();
        assert_eq!(by_name.id, ravi.id);
        assert!(resolve_customer(&db, None, Some("  ")).await.unwrap().is_none());
        assert!(resolve_customer(&db, Some(9999), None).await.is_err());

        let created = resolve_customer(&db, None, Some("9123456780")).await.unwrap().unwrap();
        assert_eq!(created.phone.as_deref(), Some("9123456780"));
        assert_ne!(created.id, ravi.id);

        svc.create_customer(new_customer("Sita", None)).await.unwrap();
        svc.create_customer(new_customer("sita", None)).await.unwrap();
        assert!(matches!(
            resolve_customer(&db, None, Some("SITA")).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_non_ascii_name_reuses_customer() {
        let db = test_db().await;
        let svc = CustomerService::new(db.clone());
        let elan = svc
            .create_customer(new_customer("Élan Ganguly", None))
            .await
            .unwrap();

        let same = resolve_customer(&db, None, Some("Élan Ganguly")).await.unwrap().unwrap();
        assert_eq!(same.id, elan.id);
        let shouted = resolve_customer(&db, None, Some("ÉLAN GANGULY")).await.unwrap().unwrap();
        assert_eq!(shouted.id, elan.id);
    }

    #[tokio::test]
    async fn test_phone_with_area_code_in_parentheses() {
        let svc = CustomerService::new(test_db().await);
        let c = svc
            .create_customer(new_customer("Anita", Some("(022) 2345-6789")))
            .await
            .unwrap();
        assert_eq!(c.phone.as_deref(), Some("02223456789"));
    }
}
