use crate::rollup::{
    average_growth_pct, change_pct, cumulative_daily, daily_series, filter_window, monthly_series,
    oldest_largest_due, receivables, total_in_window, DateWindow, DayBucket, MonthBucket,
    OutstandingInvoice, RankedGroup, DEFAULT_OVERDUE_AFTER_DAYS,
};
use crate::schema::{NetSalesFact, PipelineOptions, RawSalesLine};
use crate::segment::{category_summary, segment_customers, CategorySummary, CustomerSegment, SegmentFilter};
use crate::trend::growth_trend_pct;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tuning knobs of the overview, with the dashboard's historical defaults.
#[derive(Debug, Clone)]
pub struct OverviewParams {
    /// Sample-account NITs; when non-empty the report carries a second
    /// total with these customers removed.
    pub sample_payee_nits: Vec<String>,
    pub top_items: usize,
    pub due_rows: usize,
    pub overdue_after_days: i64,
}

impl Default for OverviewParams {
    fn default() -> Self {
        Self {
            sample_payee_nits: Vec::new(),
            top_items: 10,
            due_rows: 10,
            overdue_after_days: DEFAULT_OVERDUE_AFTER_DAYS,
        }
    }
}

/// The general-view model: headline totals, the monthly series and the
/// rankings over one caller-chosen window, plus the receivables alerts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewReport {
    pub window: DateWindow,
    pub overall_total: f64,
    /// Present when sample accounts are configured: the same total without
    /// them.
    pub overall_total_excluding_samples: Option<f64>,
    pub due_total: f64,
    pub growth_trend_pct: f64,
    pub average_growth_pct: f64,
    pub monthly: Vec<MonthBucket>,
    pub seller_ranking: Vec<RankedGroup>,
    pub top_items: Vec<RankedGroup>,
    /// Window-scoped due table, padded with paid rows up to `due_rows`.
    pub oldest_largest_due: Vec<OutstandingInvoice>,
    /// Open receivables over the WHOLE ledger: an unpaid invoice needs
    /// collecting no matter which window the dashboard is looking at.
    pub receivables: Vec<OutstandingInvoice>,
}

impl OverviewReport {
    pub fn build(
        lines: &[RawSalesLine],
        window: DateWindow,
        today: NaiveDate,
        options: &PipelineOptions,
        params: &OverviewParams,
    ) -> Self {
        let facts = crate::build_facts(lines, options);
        let in_window: Vec<NetSalesFact> = filter_window(&facts, &window)
            .into_iter()
            .cloned()
            .collect();
        info!(
            "Building overview over {} facts ({} in window {} to {})",
            facts.len(),
            in_window.len(),
            window.start,
            window.end
        );

        let overall_total: f64 = in_window.iter().map(|fact| fact.net_amount).sum();
        let due_total: f64 = in_window.iter().map(|fact| fact.due_amount).sum();
        let overall_total_excluding_samples = if params.sample_payee_nits.is_empty() {
            None
        } else {
            Some(
                in_window
                    .iter()
                    .filter(|fact| !params.sample_payee_nits.contains(&fact.payee_nit))
                    .map(|fact| fact.net_amount)
                    .sum(),
            )
        };

        let monthly = monthly_series(&in_window, &window);

        Self {
            window,
            overall_total,
            overall_total_excluding_samples,
            due_total,
            growth_trend_pct: growth_trend_pct(&monthly),
            average_growth_pct: average_growth_pct(&monthly),
            seller_ranking: crate::rollup::ranked_by(
                &in_window,
                |fact| fact.seller_name.to_uppercase(),
                None,
            ),
            top_items: crate::rollup::ranked_by(
                &in_window,
                |fact| fact.item_name.clone(),
                Some(params.top_items),
            ),
            oldest_largest_due: oldest_largest_due(&in_window, today, params.due_rows),
            receivables: receivables(&facts, today, params.overdue_after_days),
            monthly,
        }
    }
}

/// The customers-view model: every customer segmented, plus per-category
/// totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerReport {
    pub segments: Vec<CustomerSegment>,
    pub categories: Vec<CategorySummary>,
}

impl CustomerReport {
    pub fn build(lines: &[RawSalesLine], today: NaiveDate, options: &PipelineOptions) -> Self {
        let facts = crate::build_facts(lines, options);
        let segments = segment_customers(&facts, today);
        info!("Segmented {} customers", segments.len());
        let categories = category_summary(&segments);
        Self {
            segments,
            categories,
        }
    }

    pub fn filtered(&self, filter: &SegmentFilter) -> Vec<CustomerSegment> {
        filter.apply(&self.segments)
    }
}

/// Narrowing criteria of the products view. Category and item matches are
/// exact membership, the price range is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categories: Vec<String>,
    pub items: Vec<String>,
    pub price_range: Option<(f64, f64)>,
}

impl ProductFilter {
    fn matches(&self, line: &RawSalesLine) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&line.item_category) {
            return false;
        }
        if !self.items.is_empty() && !self.items.contains(&line.item_name) {
            return false;
        }
        if let Some((min, max)) = self.price_range {
            if line.item_unitprice < min || line.item_unitprice > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductParams {
    /// Sample accounts are dropped from the whole view.
    pub sample_payee_nits: Vec<String>,
    /// Month span of the category trends; defaults to the span actually
    /// covered by the data.
    pub window: Option<DateWindow>,
}

/// One point of a category's monthly trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: NaiveDate,
    pub monthly_total: f64,
    pub cumulative_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub category: String,
    pub points: Vec<TrendPoint>,
}

/// Catalog-level measures over the filtered raw lines. These describe what
/// was put on invoices, so they come from the lines themselves rather than
/// the reconciled ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStats {
    pub distinct_items: usize,
    pub mean_unit_price: f64,
    /// Mean over invoices of each invoice's mean line quantity.
    pub mean_quantity_per_invoice: f64,
}

/// Historical summary of one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_name: String,
    pub total_sales: f64,
    /// The customer most often invoiced for this item; ties resolve to the
    /// alphabetically first name.
    pub top_payee: String,
    /// Date of the last non-reversed sale to that customer, when one
    /// exists.
    pub last_sale_to_top_payee: Option<NaiveDate>,
}

/// The products-view model. Category trends always cover the full
/// (sample-excluded) snapshot; stats and item summaries honor the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub category_trends: Vec<CategoryTrend>,
    pub stats: ProductStats,
    pub items: Vec<ItemSummary>,
}

impl ProductReport {
    pub fn build(
        lines: &[RawSalesLine],
        options: &PipelineOptions,
        filter: &ProductFilter,
        params: &ProductParams,
    ) -> Self {
        // 1. Drop sample accounts before anything else.
        let retail_lines: Vec<RawSalesLine> = lines
            .iter()
            .filter(|line| !params.sample_payee_nits.contains(&line.payee_nit))
            .cloned()
            .collect();
        let all_facts = crate::build_facts(&retail_lines, options);
        info!(
            "Building product report over {} lines ({} after sample exclusion)",
            lines.len(),
            retail_lines.len()
        );

        // 2. Per-category cumulative trend on a month axis shared by every
        //    category.
        let category_trends = Self::category_trends(&all_facts, params.window);

        // 3. Stats and summaries over the filtered subset.
        let filtered_lines: Vec<RawSalesLine> = retail_lines
            .iter()
            .filter(|line| filter.matches(line))
            .cloned()
            .collect();
        let stats = Self::stats(&filtered_lines);
        let items = Self::item_summaries(&crate::build_facts(&filtered_lines, options));

        Self {
            category_trends,
            stats,
            items,
        }
    }

    fn category_trends(facts: &[NetSalesFact], window: Option<DateWindow>) -> Vec<CategoryTrend> {
        let window = match window.or_else(|| observed_window(facts)) {
            Some(window) => window,
            None => return Vec::new(),
        };

        let categories: BTreeSet<&str> =
            facts.iter().map(|fact| fact.item_category.as_str()).collect();
        categories
            .into_iter()
            .map(|category| {
                let category_facts: Vec<NetSalesFact> = facts
                    .iter()
                    .filter(|fact| fact.item_category == category)
                    .cloned()
                    .collect();
                let mut cumulative = 0.0;
                let points = monthly_series(&category_facts, &window)
                    .into_iter()
                    .map(|bucket| {
                        cumulative += bucket.total;
                        TrendPoint {
                            month: bucket.month,
                            monthly_total: bucket.total,
                            cumulative_total: cumulative,
                        }
                    })
                    .collect();
                CategoryTrend {
                    category: category.to_string(),
                    points,
                }
            })
            .collect()
    }

    fn stats(lines: &[RawSalesLine]) -> ProductStats {
        let distinct_items = lines
            .iter()
            .map(|line| line.item_name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mean_unit_price = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|line| line.item_unitprice).sum::<f64>() / lines.len() as f64
        };

        let mut per_invoice: HashMap<&str, (f64, usize)> = HashMap::new();
        for line in lines {
            let entry = per_invoice
                .entry(line.invoice_number.as_str())
                .or_insert((0.0, 0));
            entry.0 += line.item_quantity;
            entry.1 += 1;
        }
        let mean_quantity_per_invoice = if per_invoice.is_empty() {
            0.0
        } else {
            per_invoice
                .values()
                .map(|(quantity_sum, count)| quantity_sum / *count as f64)
                .sum::<f64>()
                / per_invoice.len() as f64
        };

        ProductStats {
            distinct_items,
            mean_unit_price,
            mean_quantity_per_invoice,
        }
    }

    fn item_summaries(facts: &[NetSalesFact]) -> Vec<ItemSummary> {
        let mut by_item: BTreeMap<&str, Vec<&NetSalesFact>> = BTreeMap::new();
        for fact in facts {
            by_item.entry(fact.item_name.as_str()).or_default().push(fact);
        }

        by_item
            .into_iter()
            .map(|(item_name, item_facts)| {
                let total_sales: f64 = item_facts.iter().map(|fact| fact.net_amount).sum();

                let mut payee_counts: HashMap<&str, usize> = HashMap::new();
                for fact in &item_facts {
                    *payee_counts.entry(fact.payee_name.as_str()).or_insert(0) += 1;
                }
                let mut top_payee = "";
                let mut top_count = 0;
                for (payee, count) in payee_counts {
                    if count > top_count || (count == top_count && payee < top_payee) {
                        top_payee = payee;
                        top_count = count;
                    }
                }

                let last_sale_to_top_payee = item_facts
                    .iter()
                    .filter(|fact| fact.payee_name == top_payee && fact.net_amount > 0.0)
                    .map(|fact| fact.effective_date)
                    .max();

                ItemSummary {
                    item_name: item_name.to_string(),
                    total_sales,
                    top_payee: top_payee.to_string(),
                    last_sale_to_top_payee,
                }
            })
            .collect()
    }
}

/// One seller's card in the sales-team view: year-to-date standing, the
/// recent daily pulse, and the running month against the previous one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerSummary {
    pub seller_name: String,
    pub ytd_total: f64,
    /// Growth versus the same elapsed window last year; 0 when that window
    /// had no sales.
    pub yoy_growth_pct: f64,
    pub last_30_days_total: f64,
    pub last_30_days_daily: Vec<DayBucket>,
    pub month_to_date_total: f64,
    /// Growth of the running month versus the FULL previous calendar
    /// month; 0 when that month had no sales.
    pub mom_growth_pct: f64,
    pub month_to_date_cumulative: Vec<DayBucket>,
}

/// The sales-team view model: one summary per requested seller. Seller
/// matching is case-insensitive (names are normalized to uppercase); a
/// requested seller with no sales still appears, zeroed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerReport {
    pub sellers: Vec<SellerSummary>,
}

impl SellerReport {
    pub fn build(
        lines: &[RawSalesLine],
        sellers: &[String],
        today: NaiveDate,
        options: &PipelineOptions,
    ) -> Self {
        let mut facts = crate::build_facts(lines, options);
        for fact in &mut facts {
            fact.seller_name = fact.seller_name.to_uppercase();
        }

        let selected: BTreeSet<String> =
            sellers.iter().map(|name| name.to_uppercase()).collect();
        info!(
            "Building seller report for {} sellers over {} facts",
            selected.len(),
            facts.len()
        );

        let ytd = DateWindow::year_to_date(today);
        let previous_ytd = ytd.previous_year();
        let last_30 = DateWindow::last_n_days(today, 30);
        let month_to_date = DateWindow::month_to_date(today);
        let previous_month = DateWindow::previous_month(today);

        let sellers = selected
            .into_iter()
            .map(|seller_name| {
                let seller_facts: Vec<NetSalesFact> = facts
                    .iter()
                    .filter(|fact| fact.seller_name == seller_name)
                    .cloned()
                    .collect();

                let ytd_total = total_in_window(&seller_facts, &ytd);
                let previous_ytd_total = total_in_window(&seller_facts, &previous_ytd);
                let month_to_date_total = total_in_window(&seller_facts, &month_to_date);
                let previous_month_total = total_in_window(&seller_facts, &previous_month);
                let daily = daily_series(&seller_facts, &last_30);

                SellerSummary {
                    seller_name,
                    ytd_total,
                    yoy_growth_pct: change_pct(previous_ytd_total, ytd_total),
                    last_30_days_total: total_in_window(&seller_facts, &last_30),
                    last_30_days_daily: daily,
                    month_to_date_total,
                    mom_growth_pct: change_pct(previous_month_total, month_to_date_total),
                    month_to_date_cumulative: cumulative_daily(&daily_series(
                        &seller_facts,
                        &month_to_date,
                    )),
                }
            })
            .collect();

        Self { sellers }
    }

    /// Every seller present in the facts, uppercased and sorted. This is
    /// the population a selection UI offers.
    pub fn available_sellers(facts: &[NetSalesFact]) -> Vec<String> {
        facts
            .iter()
            .map(|fact| fact.seller_name.to_uppercase())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }
}

/// Smallest window covering every fact, `None` for an empty ledger.
fn observed_window(facts: &[NetSalesFact]) -> Option<DateWindow> {
    let start = facts.iter().map(|fact| fact.effective_date).min()?;
    let end = facts.iter().map(|fact| fact.effective_date).max()?;
    Some(DateWindow::new(start, end))
}
