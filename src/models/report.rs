use crate::entities::PaymentMode;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    /// 周以周日为一周开始 (`%U`)
    pub fn key_format(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "%Y-%m-%d",
            ReportPeriod::Weekly => "%Y-%U",
            ReportPeriod::Monthly => "%Y-%m",
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ReportQuery {
    /// YYYY-MM-DD（含）
    pub from: Option<String>,
    /// YYYY-MM-DD（含）
    pub to: Option<String>,
}

/// 本地日期区间换算成 UTC 半开区间 `[start, end)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn parse(from: Option<&str>, to: Option<&str>, offset: FixedOffset) -> AppResult<Self> {
        let from = from.map(parse_date).transpose()?;
        let to = to.map(parse_date).transpose()?;
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(AppError::ValidationError(
                "`from` must not be after `to`".to_string(),
            ));
        }
        Ok(Self {
            start: from.map(|d| local_midnight(d, offset)),
            end: to
                .and_then(|d| d.succ_opt())
                .map(|d| local_midnight(d, offset)),
        })
    }

    /// 单个本地日期
    pub fn day(date: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            start: Some(local_midnight(date, offset)),
            end: date.succ_opt().map(|d| local_midnight(d, offset)),
        }
    }
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid date (expected YYYY-MM-DD): {s}")))
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    match offset.from_local_datetime(&naive).single() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalesSummaryRow {
    /// `YYYY-MM-DD`、`YYYY-WW` 或 `YYYY-MM`
    pub period: String,
    pub order_count: i64,
    pub total_sale: i64,
    pub total_cost: i64,
    pub profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ItemSalesRow {
    pub date: String,
    pub category: String,
    pub item: String,
    pub quantity: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CustomerAnalysisRow {
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub order_count: i64,
    pub total_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MenuPerformanceRow {
    pub category: String,
    pub item: String,
    pub quantity: i64,
    pub revenue: i64,
    pub profit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentModeRow {
    pub payment_mode: PaymentMode,
    pub order_count: i64,
    pub amount_due: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_uses_local_midnight() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let range = DateRange::parse(Some("2025-03-01"), Some("2025-03-01"), ist).unwrap();
        assert_eq!(
            range.start.unwrap().to_rfc3339(),
            "2025-02-28T18:30:00+00:00"
        );
        assert_eq!(range.end.unwrap().to_rfc3339(), "2025-03-01T18:30:00+00:00");

        // 半开区间：本地 23:59:59 仍在范围内，次日 00:00 不在
        let last_second = Utc.with_ymd_and_hms(2025, 3, 1, 18, 29, 59).unwrap();
        assert!(last_second < range.end.unwrap());
        assert_eq!(
            Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 0).unwrap(),
            range.end.unwrap()
        );
    }

    #[test]
    fn test_open_range_and_errors() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let open = DateRange::parse(None, None, utc).unwrap();
        assert_eq!(open, DateRange::default());
        assert!(open.start.is_none() && open.end.is_none());

        assert!(DateRange::parse(Some("01/03/2025"), None, utc).is_err());
        assert!(DateRange::parse(Some("2025-03-02"), Some("2025-03-01"), utc).is_err());
    }
}
