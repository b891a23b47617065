//! # Net Sales Builder
//!
//! A library for reconciling raw invoice/credit-note line items into signed
//! net-sales facts and deriving the period-aware aggregates a sales dashboard
//! renders (time series, rankings, receivables, customer segments, per-seller
//! performance).
//!
//! ## Core Concepts
//!
//! - **Raw Line**: one item of one invoice as the sales API reports it, with invoice-scoped copies of `subtotal`, `extra_discount`, `total` and `due`
//! - **Priced Line**: a raw line with its revenue resolved under a [`PriceBasis`] (the invoice discount allocated proportionally, or list prices as-is)
//! - **Net-Sales Fact**: one signed ledger row; a credited sale carries a positive fact at its issue date and a negative fact at its credit-note date, so any window containing both nets to zero
//! - **Rollups**: pure, window-parameterized aggregations (totals, gap-filled series, rankings, receivables), all total over empty input
//! - **Report Views**: presentation-free models of the four dashboard pages, every one running the same parameterized pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use net_sales_builder::*;
//! use chrono::NaiveDate;
//!
//! let lines = parse_snapshot(&document)?;
//! let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
//!
//! let pipeline = NetSalesPipeline::new(lines, PipelineOptions::discount_adjusted());
//! let overview = pipeline.overview(
//!     DateWindow::year_to_date(today),
//!     today,
//!     &OverviewParams::default(),
//! );
//! println!("{}", format_money(overview.overall_total));
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod format;
pub mod ingestion;
pub mod pricing;
pub mod reconcile;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod segment;
pub mod source;
pub mod trend;

pub use auth::PasswordGate;
pub use config::DashboardConfig;
pub use error::{NetSalesError, Result};
pub use format::{format_money, format_pct, format_signed_pct};
pub use ingestion::*;
pub use pricing::price_lines;
pub use reconcile::Reconciler;
pub use report::*;
pub use rollup::*;
pub use schema::*;
pub use segment::{
    category_summary, classify, segment_customers, CategorySummary, CustomerSegment,
    SegmentCategory, SegmentFilter,
};
#[cfg(feature = "remote")]
pub use source::HttpSource;
pub use source::{CachedSource, SnapshotSource, StaticSource};
pub use trend::growth_trend_pct;

use chrono::NaiveDate;
use log::debug;

/// A snapshot of raw lines bound to one set of pipeline options, with
/// shortcuts to the reconciled ledger and to every report view.
///
/// The report builders also accept a `&[RawSalesLine]` directly; this wrapper
/// just keeps lines and options together when one snapshot feeds several
/// views.
pub struct NetSalesPipeline {
    lines: Vec<RawSalesLine>,
    options: PipelineOptions,
}

impl NetSalesPipeline {
    pub fn new(lines: Vec<RawSalesLine>, options: PipelineOptions) -> Self {
        Self { lines, options }
    }

    /// Pulls the snapshot out of a [`SnapshotSource`]. Wrap the source in a
    /// [`CachedSource`] first when repeated renders should not refetch.
    pub fn from_source<S: SnapshotSource>(source: &S, options: PipelineOptions) -> Result<Self> {
        Ok(Self::new(source.fetch_snapshot()?, options))
    }

    pub fn lines(&self) -> &[RawSalesLine] {
        &self.lines
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Runs pricing and reconciliation over the snapshot.
    pub fn facts(&self) -> Vec<NetSalesFact> {
        build_facts(&self.lines, &self.options)
    }

    pub fn overview(
        &self,
        window: DateWindow,
        today: NaiveDate,
        params: &OverviewParams,
    ) -> OverviewReport {
        OverviewReport::build(&self.lines, window, today, &self.options, params)
    }

    pub fn customers(&self, today: NaiveDate) -> CustomerReport {
        CustomerReport::build(&self.lines, today, &self.options)
    }

    pub fn products(&self, filter: &ProductFilter, params: &ProductParams) -> ProductReport {
        ProductReport::build(&self.lines, &self.options, filter, params)
    }

    pub fn sellers(&self, sellers: &[String], today: NaiveDate) -> SellerReport {
        SellerReport::build(&self.lines, sellers, today, &self.options)
    }
}

/// Prices the lines and reconciles them into the signed fact ledger, the
/// whole pipeline short of report assembly.
pub fn build_facts(lines: &[RawSalesLine], options: &PipelineOptions) -> Vec<NetSalesFact> {
    debug!(
        "Building facts from {} lines ({:?} pricing, {:?} aggregation, {:?} partition)",
        lines.len(),
        options.price_basis,
        options.sales_aggregation,
        options.sale_partition
    );
    let priced = price_lines(lines, options.price_basis);
    Reconciler::new(options).reconcile(&priced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn line(
        invoice: &str,
        issued: (i32, u32, u32),
        credited: Option<(i32, u32, u32)>,
        seller: &str,
        item: &str,
        unitprice: f64,
        subtotal: f64,
        extra_discount: f64,
        due: f64,
    ) -> RawSalesLine {
        RawSalesLine {
            invoice_number: invoice.to_string(),
            issued_at: NaiveDate::from_ymd_opt(issued.0, issued.1, issued.2).unwrap(),
            creditnote_date: credited
                .map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap()),
            seller_name: seller.to_string(),
            payee_name: "Clinica Central".to_string(),
            payee_nit: "123456".to_string(),
            item_name: item.to_string(),
            item_category: "General".to_string(),
            item_unitprice: unitprice,
            item_quantity: 1.0,
            subtotal,
            extra_discount,
            total: subtotal - extra_discount,
            due,
            item_sales: None,
        }
    }

    fn snapshot() -> Vec<RawSalesLine> {
        vec![
            // Two-line invoice with a Q40 lump discount on a Q400 subtotal.
            line("F-100", (2024, 1, 10), None, "Ana", "Ibuprofen", 100.0, 400.0, 40.0, 360.0),
            line("F-100", (2024, 1, 10), None, "Ana", "Amoxicillin", 300.0, 400.0, 40.0, 360.0),
            // Credited in March.
            line("F-200", (2024, 2, 5), Some((2024, 3, 1)), "Beto", "Gauze", 100.0, 100.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_end_to_end_discount_adjusted() {
        let facts = build_facts(&snapshot(), &PipelineOptions::discount_adjusted());

        // The two F-100 originals discounted to 90 and 270, then the F-200
        // reversal; this preset drops the credited original.
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].net_amount, 90.0);
        assert_eq!(facts[1].net_amount, 270.0);
        assert_eq!(facts[2].net_amount, -100.0);
        assert_eq!(
            facts[2].effective_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(total_in_window(&facts, &window), 260.0);
    }

    #[test]
    fn test_end_to_end_list_price() {
        let facts = build_facts(&snapshot(), &PipelineOptions::list_price());

        // All three originals plus the reversal; the credited invoice nets
        // to zero across any window containing both of its dates.
        assert_eq!(facts.len(), 4);
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(total_in_window(&facts, &window), 400.0);

        let credited_net: f64 = facts
            .iter()
            .filter(|fact| fact.invoice_number == "F-200")
            .map(|fact| fact.net_amount)
            .sum();
        assert_eq!(credited_net, 0.0);
    }

    #[test]
    fn test_pipeline_facade() {
        let source = StaticSource::new(snapshot());
        let pipeline =
            NetSalesPipeline::from_source(&source, PipelineOptions::discount_adjusted()).unwrap();
        assert_eq!(pipeline.lines().len(), 3);
        assert_eq!(pipeline.facts().len(), 3);

        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let window = DateWindow::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), today);
        let overview = pipeline.overview(window, today, &OverviewParams::default());
        assert_eq!(overview.overall_total, 260.0);
        assert_eq!(overview.monthly.len(), 4);
        assert_eq!(overview.monthly[0].total, 360.0);
        assert_eq!(overview.monthly[2].total, -100.0);

        let customers = pipeline.customers(today);
        assert_eq!(customers.segments.len(), 1);
    }
}
