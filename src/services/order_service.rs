use crate::config::KioskConfig;
use crate::entities::{
    CreditEntryKind, PaymentMode, menu_item_entity as items, order_entity as orders,
    order_line_entity as order_lines,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthUser, DateRange, OrderQuery, OrderResponse, PaginatedResponse, PaginationParams,
    SubmitOrderRequest, TodayOrdersResponse,
};
use crate::pricing::{OrderTotals, loyalty_points};
use crate::services::CartService;
use crate::services::cart_service::{check_toppings, resolve_lines};
use crate::services::customer_service::{
    post_credit_entry, record_order_activity, resolve_customer,
};
use crate::utils::format_amount;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

pub const WALK_IN_CUSTOMER: &str = "Walk-in";

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
    kiosk: KioskConfig,
    cart_service: CartService,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection, kiosk: KioskConfig, cart_service: CartService) -> Self {
        Self {
            pool,
            kiosk,
            cart_service,
        }
    }

    /// 提交当前员工的购物车。
    ///
    /// 整个过程在一个事务内完成：按数据库重新定价、条件扣减库存、写订单和明细、
    /// 更新顾客统计，赊账订单再记一笔 Charge。任一步失败整单回滚，购物车保持不变。
    pub async fn submit_order(
        &self,
        staff: &AuthUser,
        req: SubmitOrderRequest,
    ) -> AppResult<OrderResponse> {
        let cart = self.cart_service.snapshot(staff.id).await;
        if cart.is_empty() {
            return Err(AppError::ValidationError("Cart is empty".to_string()));
        }
        if cart.entries.iter().any(|e| e.quantity < 1) {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let customer_text = req
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if req.payment_mode == PaymentMode::Credit
            && req.customer_id.is_none()
            && customer_text.is_none()
        {
            return Err(AppError::ValidationError(
                "Credit orders require a customer".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let lines = resolve_lines(&txn, &cart.entries).await?;
        for line in &lines {
            if !line.item.is_available {
                return Err(AppError::ValidationError(format!(
                    "{} is currently unavailable",
                    line.item.name
                )));
            }
            check_toppings(&self.kiosk, &line.item, &line.toppings)?;
        }

        // 同一菜品合并数量后再扣库存
        let mut per_item: BTreeMap<i64, (i32, &items::Model)> = BTreeMap::new();
        for line in &lines {
            let slot = per_item.entry(line.item.id).or_insert((0, &line.item));
            slot.0 = slot.0.checked_add(line.entry.quantity).ok_or_else(|| {
                AppError::ValidationError(format!("Quantity too large for {}", line.item.name))
            })?;
        }
        for (item_id, (quantity, item)) in &per_item {
            if item.stock.is_none() {
                continue;
            }
            let res = items::Entity::update_many()
                .col_expr(
                    items::Column::Stock,
                    Expr::col(items::Column::Stock).sub(*quantity),
                )
                .filter(items::Column::Id.eq(*item_id))
                .filter(items::Column::Stock.gte(*quantity))
                .exec(&txn)
                .await?;
            if res.rows_affected == 0 {
                return Err(AppError::ValidationError(format!(
                    "Insufficient stock for {} (requested {quantity})",
                    item.name
                )));
            }
        }

        let customer = resolve_customer(&txn, req.customer_id, customer_text).await?;
        if req.payment_mode == PaymentMode::Credit
            && let Some(c) = &customer
            && !c.is_active
        {
            return Err(AppError::ValidationError(format!(
                "Customer {} is inactive and cannot take credit",
                c.name
            )));
        }

        let totals = OrderTotals::from_lines(lines.iter().map(|l| &l.priced), self.kiosk.tax_rate_bp);
        let now = Utc::now();

        let order = orders::ActiveModel {
            customer_id: Set(customer.as_ref().map(|c| c.id)),
            customer_name: Set(customer
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string())),
            total_sale: Set(totals.total_sale),
            tax: Set(totals.tax),
            amount_due: Set(totals.amount_due),
            total_cost: Set(totals.total_cost),
            profit: Set(totals.profit),
            payment_mode: Set(req.payment_mode),
            staff_id: Set(staff.id),
            staff_username: Set(staff.username.clone()),
            notes: Set(req
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let line_models: Vec<order_lines::ActiveModel> = lines
            .iter()
            .map(|l| order_lines::ActiveModel {
                order_id: Set(order.id),
                menu_item_id: Set(l.item.id),
                category: Set(l.item.category.clone()),
                item_name: Set(l.item.name.clone()),
                unit_price: Set(l.priced.unit_price),
                unit_cost: Set(l.priced.unit_cost),
                quantity: Set(l.priced.quantity),
                toppings: Set(l.topping_names().join(", ")),
                topping_unit_total: Set(l.priced.topping_unit_total),
                line_total: Set(l.priced.line_total),
                line_cost: Set(l.priced.line_cost),
                ..Default::default()
            })
            .collect();
        order_lines::Entity::insert_many(line_models)
            .exec(&txn)
            .await?;

        if let Some(c) = &customer {
            let points = loyalty_points(totals.amount_due, self.kiosk.loyalty_spend_per_point);
            record_order_activity(&txn, c.id, totals.amount_due, points, now).await?;
            if req.payment_mode == PaymentMode::Credit {
                post_credit_entry(
                    &txn,
                    c.id,
                    CreditEntryKind::Charge,
                    totals.amount_due,
                    Some(order.id),
                    None,
                    staff.id,
                )
                .await?;
            }
        }

        let stored_lines = load_lines(&txn, order.id).await?;
        txn.commit().await?;

        let submitted: Vec<Uuid> = cart.entries.iter().map(|e| e.line_id).collect();
        self.cart_service.remove_submitted(staff.id, &submitted).await;

        log::info!(
            "Order #{} placed by {}: {} items, amount due {} ({}) for {}",
            order.id,
            staff.username,
            stored_lines.len(),
            format_amount(order.amount_due),
            order.payment_mode,
            order.customer_name
        );
        Ok(OrderResponse::new(order, stored_lines))
    }

    pub async fn get_order(&self, id: i64) -> AppResult<OrderResponse> {
        let order = orders::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;
        let lines = load_lines(&self.pool, id).await?;
        Ok(OrderResponse::new(order, lines))
    }

    pub async fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<OrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let range = DateRange::parse(
            query.from.as_deref(),
            query.to.as_deref(),
            self.kiosk.utc_offset(),
        )?;

        let mut select = filter_range(orders::Entity::find(), &range);
        if let Some(mode) = query.payment_mode {
            select = select.filter(orders::Column::PaymentMode.eq(mode));
        }
        if let Some(customer_id) = query.customer_id {
            select = select.filter(orders::Column::CustomerId.eq(customer_id));
        }

        let total = select.clone().count(&self.pool).await? as i64;
        let list = select
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let data = self.attach_lines(list).await?;
        Ok(PaginatedResponse::from_params(data, &params, total))
    }

    /// 今日（本地时间）订单及销售额、利润合计
    pub async fn today_orders(&self) -> AppResult<TodayOrdersResponse> {
        let offset = self.kiosk.utc_offset();
        let today = Utc::now().with_timezone(&offset).date_naive();
        let range = DateRange::day(today, offset);

        let list = filter_range(orders::Entity::find(), &range)
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.pool)
            .await?;

        let total_sale = list.iter().map(|o| o.total_sale).sum();
        let total_profit = list.iter().map(|o| o.profit).sum();
        let order_count = list.len() as i64;
        Ok(TodayOrdersResponse {
            date: today,
            order_count,
            total_sale,
            total_profit,
            orders: self.attach_lines(list).await?,
        })
    }

    async fn attach_lines(&self, list: Vec<orders::Model>) -> AppResult<Vec<OrderResponse>> {
        let ids: Vec<i64> = list.iter().map(|o| o.id).collect();
        let mut grouped: HashMap<i64, Vec<order_lines::Model>> = HashMap::new();
        if !ids.is_empty() {
            for line in order_lines::Entity::find()
                .filter(order_lines::Column::OrderId.is_in(ids))
                .order_by_asc(order_lines::Column::Id)
                .all(&self.pool)
                .await?
            {
                grouped.entry(line.order_id).or_default().push(line);
            }
        }
        Ok(list
            .into_iter()
            .map(|o| {
                let lines = grouped.remove(&o.id).unwrap_or_default();
                OrderResponse::new(o, lines)
            })
            .collect())
    }
}

pub(crate) fn filter_range(select: Select<orders::Entity>, range: &DateRange) -> Select<orders::Entity> {
    let mut select = select;
    if let Some(start) = range.start {
        select = select.filter(orders::Column::CreatedAt.gte(start));
    }
    if let Some(end) = range.end {
        select = select.filter(orders::Column::CreatedAt.lt(end));
    }
    select
}

async fn load_lines<C: ConnectionTrait>(conn: &C, order_id: i64) -> AppResult<Vec<order_lines::Model>> {
    Ok(order_lines::Entity::find()
        .filter(order_lines::Column::OrderId.eq(order_id))
        .order_by_asc(order_lines::Column::Id)
        .all(conn)
        .await?)
}
