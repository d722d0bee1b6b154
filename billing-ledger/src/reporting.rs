use crate::models::BillStatus;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// The slice of a bill the aggregator needs.
#[derive(Debug, Clone)]
pub struct BillSnapshot {
    pub status: BillStatus,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Whole-ledger totals and per-status counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BillingOverview {
    pub total_bills: i64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub paid_bills: i64,
    pub pending_bills: i64,
    pub partial_bills: i64,
    pub cancelled_bills: i64,
}

/// Aggregates for one creation month, keyed `YYYY-MM` (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyBucket {
    pub month: String,
    pub bills_count: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

/// Aggregate the whole bill collection into per-status counts and sums.
pub fn overview<'a, I>(bills: I) -> BillingOverview
where
    I: IntoIterator<Item = &'a BillSnapshot>,
{
    let mut stats = BillingOverview::default();
    for bill in bills {
        stats.total_bills += 1;
        stats.total_amount += bill.total_amount;
        stats.total_paid += bill.paid_amount;
        match bill.status {
            BillStatus::Paid => stats.paid_bills += 1,
            BillStatus::Pending => stats.pending_bills += 1,
            BillStatus::Partial => stats.partial_bills += 1,
            BillStatus::Cancelled => stats.cancelled_bills += 1,
        }
    }
    stats
}

/// Group bills by creation month over the trailing 12 months (inclusive of
/// the current month), most recent month first.
pub fn monthly_breakdown<'a, I>(bills: I, now: DateTime<Utc>) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = &'a BillSnapshot>,
{
    let current = month_index(now);
    let mut buckets: BTreeMap<i32, MonthlyBucket> = BTreeMap::new();

    for bill in bills {
        let index = month_index(bill.created_at);
        if index > current || current - index > 11 {
            continue;
        }
        let bucket = buckets.entry(index).or_insert_with(|| MonthlyBucket {
            month: format!(
                "{:04}-{:02}",
                bill.created_at.year(),
                bill.created_at.month()
            ),
            bills_count: 0,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
        });
        bucket.bills_count += 1;
        bucket.total_amount += bill.total_amount;
        bucket.paid_amount += bill.paid_amount;
    }

    buckets.into_values().rev().collect()
}

// Months since year zero; adjacent months differ by exactly one.
fn month_index(at: DateTime<Utc>) -> i32 {
    at.year() * 12 + at.month0() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bill(status: BillStatus, total: Decimal, paid: Decimal, created_at: &str) -> BillSnapshot {
        BillSnapshot {
            status,
            total_amount: total,
            paid_amount: paid,
            created_at: created_at.parse().unwrap(),
        }
    }

    #[test]
    fn overview_counts_and_sums() {
        let bills = vec![
            bill(BillStatus::Paid, dec!(100), dec!(100), "2026-07-01T10:00:00Z"),
            bill(BillStatus::Partial, dec!(80), dec!(30), "2026-07-02T10:00:00Z"),
            bill(BillStatus::Pending, dec!(50), dec!(0), "2026-07-03T10:00:00Z"),
            bill(BillStatus::Cancelled, dec!(40), dec!(0), "2026-07-04T10:00:00Z"),
        ];
        let stats = overview(&bills);
        assert_eq!(stats.total_bills, 4);
        assert_eq!(stats.total_amount, dec!(270));
        assert_eq!(stats.total_paid, dec!(130));
        assert_eq!(stats.paid_bills, 1);
        assert_eq!(stats.partial_bills, 1);
        assert_eq!(stats.pending_bills, 1);
        assert_eq!(stats.cancelled_bills, 1);
    }

    #[test]
    fn per_status_counts_sum_to_total() {
        let bills = vec![
            bill(BillStatus::Paid, dec!(10), dec!(10), "2026-01-01T00:00:00Z"),
            bill(BillStatus::Paid, dec!(20), dec!(20), "2026-02-01T00:00:00Z"),
            bill(BillStatus::Pending, dec!(30), dec!(0), "2026-03-01T00:00:00Z"),
            bill(BillStatus::Partial, dec!(40), dec!(15), "2026-04-01T00:00:00Z"),
        ];
        let stats = overview(&bills);
        assert_eq!(
            stats.paid_bills + stats.pending_bills + stats.partial_bills + stats.cancelled_bills,
            stats.total_bills
        );
    }

    #[test]
    fn overview_of_nothing_is_zero() {
        let bills: Vec<BillSnapshot> = Vec::new();
        assert_eq!(overview(&bills), BillingOverview::default());
    }

    #[test]
    fn monthly_groups_by_creation_month() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let bills = vec![
            bill(BillStatus::Paid, dec!(100), dec!(100), "2026-08-01T10:00:00Z"),
            bill(BillStatus::Pending, dec!(50), dec!(0), "2026-08-05T10:00:00Z"),
            bill(BillStatus::Partial, dec!(60), dec!(20), "2026-06-20T10:00:00Z"),
        ];
        let buckets = monthly_breakdown(&bills, now);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].month, "2026-08");
        assert_eq!(buckets[0].bills_count, 2);
        assert_eq!(buckets[0].total_amount, dec!(150));
        assert_eq!(buckets[0].paid_amount, dec!(100));
        assert_eq!(buckets[1].month, "2026-06");
        assert_eq!(buckets[1].bills_count, 1);
    }

    #[test]
    fn months_are_ordered_most_recent_first() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let bills = vec![
            bill(BillStatus::Paid, dec!(1), dec!(1), "2025-12-01T00:00:00Z"),
            bill(BillStatus::Paid, dec!(1), dec!(1), "2026-03-01T00:00:00Z"),
            bill(BillStatus::Paid, dec!(1), dec!(1), "2026-08-01T00:00:00Z"),
        ];
        let months: Vec<String> = monthly_breakdown(&bills, now)
            .into_iter()
            .map(|b| b.month)
            .collect();
        assert_eq!(months, vec!["2026-08", "2026-03", "2025-12"]);
    }

    #[test]
    fn window_spans_twelve_months_inclusive() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let bills = vec![
            // Oldest month still inside the window (11 months back).
            bill(BillStatus::Paid, dec!(1), dec!(1), "2025-09-30T23:59:59Z"),
            // One month too old.
            bill(BillStatus::Paid, dec!(1), dec!(1), "2025-08-31T00:00:00Z"),
            // Future-dated rows never appear.
            bill(BillStatus::Paid, dec!(1), dec!(1), "2026-09-01T00:00:00Z"),
        ];
        let buckets = monthly_breakdown(&bills, now);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].month, "2025-09");
    }

    #[test]
    fn monthly_counts_never_exceed_total() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap();
        let bills = vec![
            bill(BillStatus::Paid, dec!(1), dec!(1), "2026-08-01T00:00:00Z"),
            bill(BillStatus::Paid, dec!(1), dec!(1), "2024-01-01T00:00:00Z"),
        ];
        let in_window: i64 = monthly_breakdown(&bills, now)
            .iter()
            .map(|b| b.bills_count)
            .sum();
        assert!(in_window <= overview(&bills).total_bills);
    }
}
