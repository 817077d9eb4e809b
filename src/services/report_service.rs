//! Sales reports.
//!
//! Orders in the requested range are loaded once and aggregated in memory,
//! grouped by the kiosk's local date.

use crate::config::KioskConfig;
use crate::entities::{PaymentMode, order_entity as orders, order_line_entity as order_lines};
use crate::error::{AppError, AppResult};
use crate::models::{
    CustomerAnalysisRow, DateRange, ItemSalesRow, MenuPerformanceRow, PaymentModeRow,
    ReportPeriod, ReportQuery, SalesSummaryRow,
};
use crate::services::order_service::filter_range;
use crate::utils::format_amount;
use chrono::FixedOffset;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{BTreeMap, HashMap};

const LINE_QUERY_CHUNK: usize = 500;

#[derive(Clone)]
pub struct ReportService {
    pool: DatabaseConnection,
    kiosk: KioskConfig,
}

impl ReportService {
    pub fn new(pool: DatabaseConnection, kiosk: KioskConfig) -> Self {
        Self { pool, kiosk }
    }

    fn offset(&self) -> FixedOffset {
        self.kiosk.utc_offset()
    }

    fn range(&self, query: &ReportQuery) -> AppResult<DateRange> {
        DateRange::parse(query.from.as_deref(), query.to.as_deref(), self.offset())
    }

    async fn load_orders(&self, range: &DateRange) -> AppResult<Vec<orders::Model>> {
        Ok(filter_range(orders::Entity::find(), range)
            .order_by_asc(orders::Column::CreatedAt)
            .order_by_asc(orders::Column::Id)
            .all(&self.pool)
            .await?)
    }

    async fn load_lines(&self, order_list: &[orders::Model]) -> AppResult<Vec<order_lines::Model>> {
        let ids: Vec<i64> = order_list.iter().map(|o| o.id).collect();
        let mut lines = Vec::new();
        for chunk in ids.chunks(LINE_QUERY_CHUNK) {
            let mut part = order_lines::Entity::find()
                .filter(order_lines::Column::OrderId.is_in(chunk.iter().copied()))
                .order_by_asc(order_lines::Column::Id)
                .all(&self.pool)
                .await?;
            lines.append(&mut part);
        }
        Ok(lines)
    }

    pub async fn sales_summary(
        &self,
        period: ReportPeriod,
        query: &ReportQuery,
    ) -> AppResult<Vec<SalesSummaryRow>> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        Ok(summarize(&order_list, period, self.offset()))
    }

    pub async fn item_sales(&self, query: &ReportQuery) -> AppResult<Vec<ItemSalesRow>> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        let lines = self.load_lines(&order_list).await?;
        Ok(item_sales(&order_list, &lines, self.offset()))
    }

    pub async fn customer_analysis(&self, query: &ReportQuery) -> AppResult<Vec<CustomerAnalysisRow>> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        Ok(customer_analysis(&order_list))
    }

    pub async fn menu_performance(&self, query: &ReportQuery) -> AppResult<Vec<MenuPerformanceRow>> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        let lines = self.load_lines(&order_list).await?;
        Ok(menu_performance(&lines))
    }

    pub async fn payment_breakdown(&self, query: &ReportQuery) -> AppResult<Vec<PaymentModeRow>> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        Ok(payment_breakdown(&order_list))
    }

    /// 订单明细 CSV，每行一条订单明细
    pub async fn export_orders_csv(&self, query: &ReportQuery) -> AppResult<String> {
        let order_list = self.load_orders(&self.range(query)?).await?;
        let lines = self.load_lines(&order_list).await?;
        let csv = orders_csv(&order_list, &lines, self.offset())?;
        log::info!("Exported {} orders ({} lines) to CSV", order_list.len(), lines.len());
        Ok(csv)
    }
}

fn summarize(
    order_list: &[orders::Model],
    period: ReportPeriod,
    offset: FixedOffset,
) -> Vec<SalesSummaryRow> {
    let mut groups: BTreeMap<String, SalesSummaryRow> = BTreeMap::new();
    for order in order_list {
        let key = order
            .created_at
            .with_timezone(&offset)
            .format(period.key_format())
            .to_string();
        let row = groups.entry(key.clone()).or_insert_with(|| SalesSummaryRow {
            period: key,
            order_count: 0,
            total_sale: 0,
            total_cost: 0,
            profit: 0,
        });
        row.order_count += 1;
        row.total_sale += order.total_sale;
        row.total_cost += order.total_cost;
        row.profit += order.profit;
    }
    // 最近的周期在前
    groups.into_values().rev().collect()
}

fn item_sales(
    order_list: &[orders::Model],
    lines: &[order_lines::Model],
    offset: FixedOffset,
) -> Vec<ItemSalesRow> {
    let dates: HashMap<i64, String> = order_list
        .iter()
        .map(|o| {
            (
                o.id,
                o.created_at.with_timezone(&offset).format("%Y-%m-%d").to_string(),
            )
        })
        .collect();

    let mut groups: BTreeMap<(String, String, String), (i64, i64)> = BTreeMap::new();
    for line in lines {
        let Some(date) = dates.get(&line.order_id) else {
            continue;
        };
        let slot = groups
            .entry((date.clone(), line.category.clone(), line.item_name.clone()))
            .or_default();
        slot.0 += i64::from(line.quantity);
        slot.1 += line.line_total;
    }

    let mut rows: Vec<ItemSalesRow> = groups
        .into_iter()
        .map(|((date, category, item), (quantity, total))| ItemSalesRow {
            date,
            category,
            item,
            quantity,
            total,
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.total.cmp(&a.total)));
    rows
}

/// 仅统计有顾客的订单（不含散客）
fn customer_analysis(order_list: &[orders::Model]) -> Vec<CustomerAnalysisRow> {
    let mut groups: HashMap<i64, CustomerAnalysisRow> = HashMap::new();
    for order in order_list {
        let Some(customer_id) = order.customer_id else {
            continue;
        };
        let row = groups.entry(customer_id).or_insert_with(|| CustomerAnalysisRow {
            customer_id: Some(customer_id),
            customer_name: order.customer_name.clone(),
            order_count: 0,
            total_spent: 0,
        });
        row.order_count += 1;
        row.total_spent += order.amount_due;
    }
    let mut rows: Vec<CustomerAnalysisRow> = groups.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.customer_name.cmp(&b.customer_name))
    });
    rows
}

fn menu_performance(lines: &[order_lines::Model]) -> Vec<MenuPerformanceRow> {
    let mut groups: HashMap<(String, String), MenuPerformanceRow> = HashMap::new();
    for line in lines {
        let row = groups
            .entry((line.category.clone(), line.item_name.clone()))
            .or_insert_with(|| MenuPerformanceRow {
                category: line.category.clone(),
                item: line.item_name.clone(),
                quantity: 0,
                revenue: 0,
                profit: 0,
            });
        row.quantity += i64::from(line.quantity);
        row.revenue += line.line_total;
        row.profit += line.line_total - line.line_cost;
    }
    let mut rows: Vec<MenuPerformanceRow> = groups.into_values().collect();
    // 按利润从高到低
    rows.sort_by(|a, b| {
        b.profit
            .cmp(&a.profit)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.item.cmp(&b.item))
    });
    rows
}

fn payment_breakdown(order_list: &[orders::Model]) -> Vec<PaymentModeRow> {
    let mut groups: HashMap<PaymentMode, (i64, i64)> = HashMap::new();
    for order in order_list {
        let slot = groups.entry(order.payment_mode).or_default();
        slot.0 += 1;
        slot.1 += order.amount_due;
    }
    let mut rows: Vec<PaymentModeRow> = groups
        .into_iter()
        .map(|(payment_mode, (order_count, amount_due))| PaymentModeRow {
            payment_mode,
            order_count,
            amount_due,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.amount_due
            .cmp(&a.amount_due)
            .then_with(|| a.payment_mode.to_string().cmp(&b.payment_mode.to_string()))
    });
    rows
}

fn orders_csv(
    order_list: &[orders::Model],
    lines: &[order_lines::Model],
    offset: FixedOffset,
) -> AppResult<String> {
    let by_id: HashMap<i64, &orders::Model> = order_list.iter().map(|o| (o.id, o)).collect();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "timestamp",
        "order_id",
        "customer",
        "category",
        "item",
        "qty",
        "toppings",
        "total_sale",
        "total_cost",
        "profit",
        "payment_mode",
        "staff",
    ])?;

    for line in lines {
        let Some(order) = by_id.get(&line.order_id) else {
            continue;
        };
        writer.write_record([
            order
                .created_at
                .with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            order.id.to_string(),
            order.customer_name.clone(),
            line.category.clone(),
            line.item_name.clone(),
            line.quantity.to_string(),
            line.toppings.clone(),
            format_amount(line.line_total),
            format_amount(line.line_cost),
            format_amount(line.line_total - line.line_cost),
            order.payment_mode.to_string(),
            order.staff_username.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalError(format!("CSV encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order(id: i64, at: (i32, u32, u32, u32), customer: Option<i64>, sale: i64, cost: i64, mode: PaymentMode) -> orders::Model {
        orders::Model {
            id,
            customer_id: customer,
            customer_name: customer.map_or("Walk-in".to_string(), |c| format!("Customer {c}")),
            total_sale: sale,
            tax: 0,
            amount_due: sale,
            total_cost: cost,
            profit: sale - cost,
            payment_mode: mode,
            staff_id: 1,
            staff_username: "ravi".into(),
            notes: None,
            created_at: Utc.with_ymd_and_hms(at.0, at.1, at.2, at.3, 0, 0).unwrap(),
        }
    }

    fn line(order_id: i64, item: &str, qty: i32, total: i64, cost: i64) -> order_lines::Model {
        order_lines::Model {
            id: order_id * 10 + qty as i64,
            order_id,
            menu_item_id: 1,
            category: "Momos".into(),
            item_name: item.into(),
            unit_price: total / i64::from(qty),
            unit_cost: cost / i64::from(qty),
            quantity: qty,
            toppings: String::new(),
            topping_unit_total: 0,
            line_total: total,
            line_cost: cost,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_daily_summary_newest_first() {
        let list = vec![
            order(1, (2025, 3, 1, 10), None, 8000, 1000, PaymentMode::Cash),
            order(2, (2025, 3, 1, 12), None, 4000, 1000, PaymentMode::Cash),
            order(3, (2025, 3, 2, 9), None, 6000, 1500, PaymentMode::Online),
        ];
        let rows = summarize(&list, ReportPeriod::Daily, utc());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2025-03-02");
        assert_eq!(rows[1].order_count, 2);
        assert_eq!(rows[1].total_sale, 12000);
        assert_eq!(rows[1].profit, 10000);
    }

    #[test]
    fn test_local_offset_moves_late_orders_to_next_day() {
        // 20:00 UTC = 次日 01:30 IST
        let list = vec![order(1, (2025, 3, 1, 20), None, 8000, 1000, PaymentMode::Cash)];
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        assert_eq!(summarize(&list, ReportPeriod::Daily, ist)[0].period, "2025-03-02");
        assert_eq!(summarize(&list, ReportPeriod::Monthly, ist)[0].period, "2025-03");
    }

    #[test]
    fn test_weekly_uses_sunday_weeks() {
        // 2025-03-01 是周六，03-02 是周日
        let list = vec![
            order(1, (2025, 3, 1, 10), None, 100, 0, PaymentMode::Cash),
            order(2, (2025, 3, 2, 10), None, 100, 0, PaymentMode::Cash),
        ];
        let rows = summarize(&list, ReportPeriod::Weekly, utc());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2025-09");
        assert_eq!(rows[1].period, "2025-08");
    }

    #[test]
    fn test_item_sales_and_menu_performance() {
        let list = vec![
            order(1, (2025, 3, 1, 10), None, 0, 0, PaymentMode::Cash),
            order(2, (2025, 3, 1, 11), None, 0, 0, PaymentMode::Cash),
        ];
        let lines = vec![
            line(1, "Veg Half", 2, 16000, 2000),
            line(2, "Veg Half", 1, 8000, 1000),
            line(2, "Chicken Full", 1, 19000, 3400),
        ];
        let items = item_sales(&list, &lines, utc());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item, "Veg Half");
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].total, 24000);

        let perf = menu_performance(&lines);
        assert_eq!(perf[0].item, "Veg Half");
        assert_eq!(perf[0].profit, 24000 - 3000);
        assert_eq!(perf[1].revenue, 19000);
    }

    #[test]
    fn test_menu_performance_ranks_by_profit() {
        // Chicken 营收更高，但 Veg 利润更高
        let lines = vec![
            line(1, "Chicken Full", 1, 19000, 12000),
            line(1, "Veg Half", 1, 16000, 2000),
            line(2, "Corn Half", 1, 9000, 2000),
        ];
        let perf = menu_performance(&lines);
        let order: Vec<&str> = perf.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(order, vec!["Veg Half", "Chicken Full", "Corn Half"]);
        assert_eq!(perf[1].profit, 7000);
        assert_eq!(perf[2].profit, 7000);
    }

    #[test]
    fn test_customer_analysis_skips_walk_ins() {
        let list = vec![
            order(1, (2025, 3, 1, 10), Some(7), 5000, 0, PaymentMode::Credit),
            order(2, (2025, 3, 2, 10), Some(7), 3000, 0, PaymentMode::Cash),
            order(3, (2025, 3, 2, 11), Some(8), 9000, 0, PaymentMode::Cash),
            order(4, (2025, 3, 2, 12), None, 99_000, 0, PaymentMode::Cash),
        ];
        let rows = customer_analysis(&list);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].customer_id, Some(8));
        assert_eq!(rows[1].order_count, 2);
        assert_eq!(rows[1].total_spent, 8000);
    }

    #[test]
    fn test_payment_breakdown() {
        let list = vec![
            order(1, (2025, 3, 1, 10), None, 5000, 0, PaymentMode::Cash),
            order(2, (2025, 3, 1, 11), None, 3000, 0, PaymentMode::Cash),
            order(3, (2025, 3, 1, 12), Some(1), 9000, 0, PaymentMode::Credit),
        ];
        let rows = payment_breakdown(&list);
        assert_eq!(rows[0].payment_mode, PaymentMode::Credit);
        assert_eq!(rows[1].order_count, 2);
        assert_eq!(rows[1].amount_due, 8000);
    }

    #[test]
    fn test_orders_csv_layout() {
        let list = vec![order(1, (2025, 3, 1, 10), Some(3), 16000, 2000, PaymentMode::Credit)];
        let mut l = line(1, "Veg Half", 2, 16000, 2000);
        l.toppings = "Masala, Butter".into();
        let csv = orders_csv(&list, &[l], utc()).unwrap();
        let mut rows = csv.lines();
        assert_eq!(
            rows.next().unwrap(),
            "timestamp,order_id,customer,category,item,qty,toppings,total_sale,total_cost,profit,payment_mode,staff"
        );
        assert_eq!(
            rows.next().unwrap(),
            "2025-03-01 10:00:00,1,Customer 3,Momos,Veg Half,2,\"Masala, Butter\",160.00,20.00,140.00,Credit,ravi"
        );
        assert!(rows.next().is_none());
    }
}
