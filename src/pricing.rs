//! Order arithmetic.
//!
//! All amounts are integer paise. Nothing here touches the database so the
//! cart preview and the order submission share exactly the same numbers.

use serde::Serialize;
use utoipa::ToSchema;

/// One priced line: `(price + sum(toppings)) * quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: i64,
    pub unit_cost: i64,
    pub topping_unit_total: i64,
    pub quantity: i32,
    pub line_total: i64,
    pub line_cost: i64,
}

impl PricedLine {
    pub fn new(unit_price: i64, unit_cost: i64, topping_prices: &[i64], quantity: i32) -> Self {
        let topping_unit_total: i64 = topping_prices.iter().sum();
        Self {
            unit_price,
            unit_cost,
            topping_unit_total,
            quantity,
            line_total: line_total(unit_price, topping_prices, quantity),
            line_cost: unit_cost * i64::from(quantity),
        }
    }
}

pub fn line_total(unit_price: i64, topping_prices: &[i64], quantity: i32) -> i64 {
    (unit_price + topping_prices.iter().sum::<i64>()) * i64::from(quantity)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderTotals {
    /// 明细合计
    pub total_sale: i64,
    pub tax: i64,
    pub amount_due: i64,
    pub total_cost: i64,
    pub profit: i64,
}

impl OrderTotals {
    pub fn from_lines<'a, I>(lines: I, tax_rate_bp: i64) -> Self
    where
        I: IntoIterator<Item = &'a PricedLine>,
    {
        let (total_sale, total_cost) = lines
            .into_iter()
            .fold((0i64, 0i64), |(sale, cost), l| (sale + l.line_total, cost + l.line_cost));
        let tax = tax_amount(total_sale, tax_rate_bp);
        Self {
            total_sale,
            tax,
            amount_due: total_sale + tax,
            total_cost,
            profit: total_sale - total_cost,
        }
    }
}

/// 四舍五入到 paise
pub fn tax_amount(total_sale: i64, tax_rate_bp: i64) -> i64 {
    if tax_rate_bp <= 0 || total_sale <= 0 {
        return 0;
    }
    (total_sale * tax_rate_bp + 5_000) / 10_000
}

pub fn loyalty_points(amount_due: i64, spend_per_point: i64) -> i64 {
    if spend_per_point <= 0 || amount_due <= 0 {
        return 0;
    }
    amount_due / spend_per_point
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_includes_toppings_per_unit() {
        // Cheese Maggi ₹70 + Extra Cheese ₹20 + Egg ₹15, x2
        assert_eq!(line_total(7000, &[2000, 1500], 2), 21000);
        assert_eq!(line_total(8000, &[], 3), 24000);
        assert_eq!(line_total(8000, &[1000], 0), 0);
    }

    #[test]
    fn test_priced_line_cost_ignores_toppings() {
        let line = PricedLine::new(6000, 1500, &[1000, 1000], 4);
        assert_eq!(line.topping_unit_total, 2000);
        assert_eq!(line.line_total, 32000);
        assert_eq!(line.line_cost, 6000);
    }

    #[test]
    fn test_order_totals_sum_lines_and_profit() {
        let lines = vec![
            PricedLine::new(8000, 1000, &[], 2),
            PricedLine::new(9000, 3000, &[2000], 1),
            PricedLine::new(4000, 1000, &[1000, 1500], 3),
        ];
        let totals = OrderTotals::from_lines(&lines, 0);

        let expected_sale: i64 = lines.iter().map(|l| l.line_total).sum();
        let expected_cost: i64 = lines.iter().map(|l| l.line_cost).sum();
        assert_eq!(totals.total_sale, expected_sale);
        assert_eq!(totals.total_sale, 16000 + 11000 + 19500);
        assert_eq!(totals.total_cost, expected_cost);
        assert_eq!(totals.profit, totals.total_sale - totals.total_cost);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.amount_due, totals.total_sale);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10% of ₹46.55 = ₹4.655 -> ₹4.66
        assert_eq!(tax_amount(4655, 1000), 466);
        assert_eq!(tax_amount(4650, 1000), 465);
        assert_eq!(tax_amount(4655, 0), 0);

        let lines = [PricedLine::new(10000, 0, &[], 1)];
        let totals = OrderTotals::from_lines(&lines, 500);
        assert_eq!(totals.tax, 500);
        assert_eq!(totals.amount_due, 10500);
        // profit is computed on the pre-tax sale
        assert_eq!(totals.profit, 10000);
    }

    #[test]
    fn test_empty_order_totals() {
        let totals = OrderTotals::from_lines(&Vec::<PricedLine>::new(), 1000);
        assert_eq!(totals, OrderTotals::default());
    }

    #[test]
    fn test_loyalty_points() {
        assert_eq!(loyalty_points(25_500, 1000), 25);
        assert_eq!(loyalty_points(999, 1000), 0);
        assert_eq!(loyalty_points(25_500, 0), 0);
    }
}
