use crate::schema::NetSalesFact;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Days after which an unpaid invoice is flagged as overdue.
pub const DEFAULT_OVERDUE_AFTER_DAYS: i64 = 90;

/// An inclusive date range. Every rollup in this module takes one; the
/// caller decides the reporting period, the library never consults a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// January 1st of `today`'s year through `today`.
    pub fn year_to_date(today: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap();
        Self { start, end: today }
    }

    /// The `n` days ending on `today`.
    pub fn last_n_days(today: NaiveDate, n: u64) -> Self {
        let back = n.saturating_sub(1);
        let start = today
            .checked_sub_days(Days::new(back))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// First of `today`'s month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap();
        Self { start, end: today }
    }

    /// The full calendar month before `today`'s month.
    pub fn previous_month(today: NaiveDate) -> Self {
        let (year, month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };
        Self {
            start: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            end: last_day_of_month(year, month),
        }
    }

    /// The same window shifted one year back. February 29th clamps to the
    /// 28th on non-leap years.
    pub fn previous_year(&self) -> Self {
        Self {
            start: shift_year(self.start, -1),
            end: shift_year(self.end, -1),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One calendar month of a gap-filled series. `month` is the first day of
/// the month; `growth_pct` compares against the previous bucket and is 0.0
/// for the first bucket and whenever the previous bucket's total is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: NaiveDate,
    pub total: f64,
    pub growth_pct: f64,
}

/// One calendar day of a gap-filled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub total: f64,
}

/// One group of a ranking, with its share of the ranking's grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub label: String,
    pub total: f64,
    pub percentage_of_total: f64,
}

/// One row of the due-amount tables: what an invoice still owes and how
/// long the money has been outstanding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingInvoice {
    pub effective_date: NaiveDate,
    pub invoice_number: String,
    pub seller_name: String,
    pub payee_name: String,
    pub due_amount: f64,
    pub days_outstanding: i64,
    pub overdue: bool,
}

pub fn filter_window<'a>(facts: &'a [NetSalesFact], window: &DateWindow) -> Vec<&'a NetSalesFact> {
    facts
        .iter()
        .filter(|fact| window.contains(fact.effective_date))
        .collect()
}

pub fn total_in_window(facts: &[NetSalesFact], window: &DateWindow) -> f64 {
    facts
        .iter()
        .filter(|fact| window.contains(fact.effective_date))
        .map(|fact| fact.net_amount)
        .sum()
}

pub fn due_in_window(facts: &[NetSalesFact], window: &DateWindow) -> f64 {
    facts
        .iter()
        .filter(|fact| window.contains(fact.effective_date))
        .map(|fact| fact.due_amount)
        .sum()
}

/// Builds the gap-filled monthly series for the window: one bucket for every
/// calendar month from the window's first month through its last, 0.0 where
/// no fact landed. Facts outside the window are ignored even when their
/// month overlaps it.
pub fn monthly_series(facts: &[NetSalesFact], window: &DateWindow) -> Vec<MonthBucket> {
    // 1. Sum facts into their calendar month.
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for fact in facts {
        if window.contains(fact.effective_date) {
            *totals.entry(first_of_month(fact.effective_date)).or_insert(0.0) += fact.net_amount;
        }
    }

    // 2. Walk the window's months so silent months still get a bucket.
    let mut series = Vec::new();
    let mut previous: Option<f64> = None;
    let mut current = first_of_month(window.start);
    let last = first_of_month(window.end);
    while current <= last {
        let total = totals.get(&current).copied().unwrap_or(0.0);
        series.push(MonthBucket {
            month: current,
            total,
            growth_pct: growth_pct(previous, total),
        });
        previous = Some(total);
        current = next_month(current);
    }
    series
}

/// Daily counterpart of [`monthly_series`].
pub fn daily_series(facts: &[NetSalesFact], window: &DateWindow) -> Vec<DayBucket> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for fact in facts {
        if window.contains(fact.effective_date) {
            *totals.entry(fact.effective_date).or_insert(0.0) += fact.net_amount;
        }
    }

    let mut series = Vec::new();
    let mut current = window.start;
    while current <= window.end {
        series.push(DayBucket {
            day: current,
            total: totals.get(&current).copied().unwrap_or(0.0),
        });
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    series
}

/// Running totals over a daily series.
pub fn cumulative_daily(series: &[DayBucket]) -> Vec<DayBucket> {
    let mut running = 0.0;
    series
        .iter()
        .map(|bucket| {
            running += bucket.total;
            DayBucket {
                day: bucket.day,
                total: running,
            }
        })
        .collect()
}

/// Mean month-over-month growth across the series, skipping the first
/// bucket (it has nothing to grow from). 0.0 for series shorter than two
/// buckets.
pub fn average_growth_pct(series: &[MonthBucket]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let sum: f64 = series[1..].iter().map(|bucket| bucket.growth_pct).sum();
    sum / (series.len() - 1) as f64
}

/// Groups facts by `key_fn`, sums net amounts, and ranks descending. Ties
/// order by label so equal totals come out deterministically. Each group
/// carries its percentage of the grand total over ALL groups, computed
/// before any truncation to `top`; when the grand total is 0 every
/// percentage is 0.
pub fn ranked_by<F>(facts: &[NetSalesFact], key_fn: F, top: Option<usize>) -> Vec<RankedGroup>
where
    F: Fn(&NetSalesFact) -> String,
{
    let mut totals: HashMap<String, f64> = HashMap::new();
    for fact in facts {
        *totals.entry(key_fn(fact)).or_insert(0.0) += fact.net_amount;
    }

    let grand_total: f64 = totals.values().sum();
    let mut groups: Vec<RankedGroup> = totals
        .into_iter()
        .map(|(label, total)| RankedGroup {
            label,
            total,
            percentage_of_total: if grand_total == 0.0 {
                0.0
            } else {
                total / grand_total * 100.0
            },
        })
        .collect();

    groups.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    if let Some(limit) = top {
        groups.truncate(limit);
    }
    groups
}

/// Open receivables: positive-net facts still owing money, one row per
/// invoice event. An invoice's several item facts all repeat the same
/// invoice-scoped balance, so they collapse by mean into one row. Ordered by
/// amount owed descending and, on equal amounts, by age (older first).
/// Reversal facts never appear: their due is forced to zero during
/// reconciliation.
pub fn receivables(
    facts: &[NetSalesFact],
    today: NaiveDate,
    overdue_after_days: i64,
) -> Vec<OutstandingInvoice> {
    type InvoiceKey = (NaiveDate, String, String, String);
    let mut order: Vec<InvoiceKey> = Vec::new();
    let mut dues: HashMap<InvoiceKey, (f64, usize)> = HashMap::new();
    for fact in facts {
        if fact.net_amount <= 0.0 || fact.due_amount <= 0.0 {
            continue;
        }
        let key: InvoiceKey = (
            fact.effective_date,
            fact.invoice_number.clone(),
            fact.seller_name.clone(),
            fact.payee_name.clone(),
        );
        let entry = dues.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0.0, 0)
        });
        entry.0 += fact.due_amount;
        entry.1 += 1;
    }

    let mut rows: Vec<OutstandingInvoice> = order
        .into_iter()
        .map(|key| {
            let (due_sum, count) = dues[&key];
            let (effective_date, invoice_number, seller_name, payee_name) = key;
            let days_outstanding = (today - effective_date).num_days();
            OutstandingInvoice {
                effective_date,
                invoice_number,
                seller_name,
                payee_name,
                due_amount: due_sum / count as f64,
                days_outstanding,
                overdue: days_outstanding > overdue_after_days,
            }
        })
        .collect();
    sort_by_due_then_age(&mut rows);
    rows
}

/// The `limit` facts owing the most, oldest first among equals. Nothing is
/// filtered out: when fewer than `limit` facts owe anything, paid rows fill
/// the rest of the table.
pub fn oldest_largest_due(
    facts: &[NetSalesFact],
    today: NaiveDate,
    limit: usize,
) -> Vec<OutstandingInvoice> {
    let mut rows: Vec<OutstandingInvoice> = facts
        .iter()
        .map(|fact| {
            let days_outstanding = (today - fact.effective_date).num_days();
            OutstandingInvoice {
                effective_date: fact.effective_date,
                invoice_number: fact.invoice_number.clone(),
                seller_name: fact.seller_name.clone(),
                payee_name: fact.payee_name.clone(),
                due_amount: fact.due_amount,
                days_outstanding,
                overdue: days_outstanding > DEFAULT_OVERDUE_AFTER_DAYS,
            }
        })
        .collect();
    sort_by_due_then_age(&mut rows);
    rows.truncate(limit);
    rows
}

fn sort_by_due_then_age(rows: &mut [OutstandingInvoice]) {
    rows.sort_by(|a, b| {
        b.due_amount
            .partial_cmp(&a.due_amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.effective_date.cmp(&b.effective_date))
    });
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

fn next_month(first_day: NaiveDate) -> NaiveDate {
    let (year, month) = if first_day.month() == 12 {
        (first_day.year() + 1, 1)
    } else {
        (first_day.year(), first_day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

fn shift_year(date: NaiveDate, years: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year() + years, date.month(), date.day())
        .unwrap_or_else(|| last_day_of_month(date.year() + years, date.month()))
}

/// Percentage change from `previous` to `current`, 0.0 when there is
/// nothing to compare against.
pub fn change_pct(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

fn growth_pct(previous: Option<f64>, current: f64) -> f64 {
    match previous {
        Some(prev) => change_pct(prev, current),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(date: (i32, u32, u32), invoice: &str, net: f64, due: f64) -> NetSalesFact {
        NetSalesFact {
            effective_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            invoice_number: invoice.to_string(),
            seller_name: "ANA".to_string(),
            payee_name: "Clinica Central".to_string(),
            payee_nit: "123456".to_string(),
            item_name: "Ibuprofen".to_string(),
            item_category: "Analgesics".to_string(),
            net_amount: net,
            due_amount: due,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_series_gap_fills_window() {
        // Sales in January and April only; the series still carries all
        // four months.
        let facts = vec![
            fact((2024, 1, 15), "F-1", 100.0, 0.0),
            fact((2024, 4, 2), "F-2", 50.0, 0.0),
        ];
        let window = DateWindow::new(ymd(2024, 1, 1), ymd(2024, 4, 30));
        let series = monthly_series(&facts, &window);

        assert_eq!(series.len(), 4);
        assert_eq!(series[0].month, ymd(2024, 1, 1));
        assert_eq!(series[0].total, 100.0);
        assert_eq!(series[1].total, 0.0);
        assert_eq!(series[2].total, 0.0);
        assert_eq!(series[3].month, ymd(2024, 4, 1));
        assert_eq!(series[3].total, 50.0);
    }

    #[test]
    fn test_growth_pct_zero_previous() {
        let facts = vec![
            fact((2024, 1, 15), "F-1", 100.0, 0.0),
            fact((2024, 3, 15), "F-2", 80.0, 0.0),
            fact((2024, 4, 15), "F-3", 100.0, 0.0),
        ];
        let window = DateWindow::new(ymd(2024, 1, 1), ymd(2024, 4, 30));
        let series = monthly_series(&facts, &window);

        assert_eq!(series[0].growth_pct, 0.0); // first bucket
        assert_eq!(series[1].growth_pct, -100.0); // 100 -> 0
        assert_eq!(series[2].growth_pct, 0.0); // 0 -> 80, previous was 0
        assert_eq!(series[3].growth_pct, 25.0); // 80 -> 100
    }

    #[test]
    fn test_monthly_series_ignores_facts_outside_window() {
        let facts = vec![
            fact((2024, 1, 5), "F-1", 999.0, 0.0),
            fact((2024, 1, 20), "F-2", 100.0, 0.0),
        ];
        let window = DateWindow::new(ymd(2024, 1, 10), ymd(2024, 1, 31));
        let series = monthly_series(&facts, &window);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total, 100.0);
    }

    #[test]
    fn test_ranking_percentages_sum_to_100() {
        let facts = vec![
            fact((2024, 1, 1), "F-1", 500.0, 0.0),
            fact((2024, 1, 2), "F-2", 300.0, 0.0),
            fact((2024, 1, 3), "F-3", 200.0, 0.0),
        ];
        let groups = ranked_by(&facts, |f| f.invoice_number.clone(), None);

        let percentage_sum: f64 = groups.iter().map(|g| g.percentage_of_total).sum();
        assert!((percentage_sum - 100.0).abs() < 1e-9);
        assert_eq!(groups[0].label, "F-1");
        assert_eq!(groups[0].percentage_of_total, 50.0);
    }

    #[test]
    fn test_ranking_truncation_keeps_global_percentages() {
        let facts = vec![
            fact((2024, 1, 1), "F-1", 500.0, 0.0),
            fact((2024, 1, 2), "F-2", 300.0, 0.0),
            fact((2024, 1, 3), "F-3", 200.0, 0.0),
        ];
        let top = ranked_by(&facts, |f| f.invoice_number.clone(), Some(2));
        assert_eq!(top.len(), 2);
        // Still the share of the full grand total, not of the top 2.
        assert_eq!(top[0].percentage_of_total, 50.0);
        assert_eq!(top[1].percentage_of_total, 30.0);
    }

    #[test]
    fn test_ranking_zero_total() {
        let facts = vec![
            fact((2024, 1, 1), "F-1", 500.0, 0.0),
            fact((2024, 1, 2), "F-2", -500.0, 0.0),
        ];
        let groups = ranked_by(&facts, |f| f.invoice_number.clone(), None);
        assert!(groups.iter().all(|g| g.percentage_of_total == 0.0));
    }

    #[test]
    fn test_ranking_ties_order_by_label() {
        let facts = vec![
            fact((2024, 1, 1), "F-B", 100.0, 0.0),
            fact((2024, 1, 2), "F-A", 100.0, 0.0),
        ];
        let groups = ranked_by(&facts, |f| f.invoice_number.clone(), None);
        assert_eq!(groups[0].label, "F-A");
        assert_eq!(groups[1].label, "F-B");
    }

    #[test]
    fn test_due_ties_broken_by_older_date() {
        let facts = vec![
            fact((2024, 3, 1), "F-NEW", 100.0, 750.0),
            fact((2024, 1, 1), "F-OLD", 100.0, 750.0),
            fact((2024, 2, 1), "F-BIG", 100.0, 900.0),
        ];
        let rows = oldest_largest_due(&facts, ymd(2024, 6, 1), 10);
        let order: Vec<&str> = rows.iter().map(|r| r.invoice_number.as_str()).collect();
        assert_eq!(order, vec!["F-BIG", "F-OLD", "F-NEW"]);
    }

    #[test]
    fn test_receivables_flags_overdue_and_skips_reversals() {
        let facts = vec![
            fact((2024, 1, 1), "F-OLD", 100.0, 400.0),
            fact((2024, 5, 20), "F-NEW", 100.0, 300.0),
            fact((2024, 2, 1), "F-CN", -100.0, 0.0),
            fact((2024, 3, 1), "F-PAID", 100.0, 0.0),
        ];
        let rows = receivables(&facts, ymd(2024, 6, 1), DEFAULT_OVERDUE_AFTER_DAYS);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].invoice_number, "F-OLD");
        assert!(rows[0].overdue);
        assert_eq!(rows[0].days_outstanding, 152);
        assert_eq!(rows[1].invoice_number, "F-NEW");
        assert!(!rows[1].overdue);
    }

    #[test]
    fn test_receivables_one_row_per_invoice() {
        // Three item facts of one invoice, each repeating its balance.
        let mut first = fact((2024, 1, 1), "F-1", 100.0, 400.0);
        first.item_name = "Ibuprofen".to_string();
        let mut second = fact((2024, 1, 1), "F-1", 50.0, 400.0);
        second.item_name = "Gauze".to_string();
        let mut third = fact((2024, 1, 1), "F-1", 25.0, 400.0);
        third.item_name = "Masks".to_string();

        let rows = receivables(
            &[first, second, third],
            ymd(2024, 2, 1),
            DEFAULT_OVERDUE_AFTER_DAYS,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].due_amount, 400.0);
    }

    #[test]
    fn test_oldest_largest_due_pads_with_paid_rows() {
        let facts = vec![
            fact((2024, 2, 1), "F-PAID", 100.0, 0.0),
            fact((2024, 1, 1), "F-OWED", 100.0, 40.0),
        ];
        let rows = oldest_largest_due(&facts, ymd(2024, 3, 1), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].invoice_number, "F-OWED");
        assert_eq!(rows[1].invoice_number, "F-PAID");
    }

    #[test]
    fn test_daily_series_and_cumulative() {
        let facts = vec![
            fact((2024, 5, 1), "F-1", 10.0, 0.0),
            fact((2024, 5, 3), "F-2", 20.0, 0.0),
        ];
        let window = DateWindow::new(ymd(2024, 5, 1), ymd(2024, 5, 4));
        let series = daily_series(&facts, &window);
        assert_eq!(series.len(), 4);
        assert_eq!(series[1].total, 0.0);

        let running = cumulative_daily(&series);
        let totals: Vec<f64> = running.iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![10.0, 10.0, 30.0, 30.0]);
    }

    #[test]
    fn test_average_growth() {
        let series = vec![
            MonthBucket { month: ymd(2024, 1, 1), total: 100.0, growth_pct: 0.0 },
            MonthBucket { month: ymd(2024, 2, 1), total: 120.0, growth_pct: 20.0 },
            MonthBucket { month: ymd(2024, 3, 1), total: 132.0, growth_pct: 10.0 },
        ];
        assert_eq!(average_growth_pct(&series), 15.0);
        assert_eq!(average_growth_pct(&series[..1]), 0.0);
        assert_eq!(average_growth_pct(&[]), 0.0);
    }

    #[test]
    fn test_change_pct() {
        assert_eq!(change_pct(100.0, 150.0), 50.0);
        assert_eq!(change_pct(200.0, 150.0), -25.0);
        assert_eq!(change_pct(0.0, 150.0), 0.0);
    }

    #[test]
    fn test_windows() {
        let today = ymd(2024, 5, 15);

        let ytd = DateWindow::year_to_date(today);
        assert_eq!(ytd.start, ymd(2024, 1, 1));
        assert_eq!(ytd.end, today);

        let last30 = DateWindow::last_n_days(today, 30);
        assert_eq!(last30.start, ymd(2024, 4, 16));
        assert_eq!(last30.end, today);

        let mtd = DateWindow::month_to_date(today);
        assert_eq!(mtd.start, ymd(2024, 5, 1));

        let prev = DateWindow::previous_month(today);
        assert_eq!(prev.start, ymd(2024, 4, 1));
        assert_eq!(prev.end, ymd(2024, 4, 30));

        let january = DateWindow::previous_month(ymd(2025, 1, 10));
        assert_eq!(january.start, ymd(2024, 12, 1));
        assert_eq!(january.end, ymd(2024, 12, 31));
    }

    #[test]
    fn test_previous_year_clamps_leap_day() {
        let window = DateWindow::new(ymd(2024, 2, 29), ymd(2024, 2, 29));
        let shifted = window.previous_year();
        assert_eq!(shifted.start, ymd(2023, 2, 28));
        assert_eq!(shifted.end, ymd(2023, 2, 28));
    }

    #[test]
    fn test_empty_input_is_total() {
        let window = DateWindow::new(ymd(2024, 1, 1), ymd(2024, 3, 31));
        assert_eq!(total_in_window(&[], &window), 0.0);
        assert_eq!(due_in_window(&[], &window), 0.0);
        assert_eq!(monthly_series(&[], &window).len(), 3);
        assert!(monthly_series(&[], &window).iter().all(|b| b.total == 0.0));
        assert!(ranked_by(&[], |f| f.item_name.clone(), None).is_empty());
        assert!(oldest_largest_due(&[], ymd(2024, 4, 1), 10).is_empty());
    }
}
