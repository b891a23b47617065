use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single normalized invoice line from the sales API snapshot.
///
/// One invoice produces one line per item sold. The fields `subtotal`,
/// `extra_discount`, `total` and `due` are invoice-scoped: every line of the
/// same invoice repeats the same invoice-level value. Consumers that need an
/// invoice-level figure must read it from one representative line, never sum
/// it across lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSalesLine {
    pub invoice_number: String,

    /// Date the invoice was issued.
    pub issued_at: NaiveDate,

    /// Date a credit note reversed this line, if any. `None` means the sale
    /// stands.
    pub creditnote_date: Option<NaiveDate>,

    pub seller_name: String,
    pub payee_name: String,

    /// Tax identifier of the paying customer. Kept as a string: upstream
    /// emits these both as numbers and as strings.
    pub payee_nit: String,

    pub item_name: String,
    pub item_category: String,

    /// Catalog (list) unit price for the item.
    pub item_unitprice: f64,
    pub item_quantity: f64,

    /// Invoice-scoped sum of list prices across the invoice's lines.
    pub subtotal: f64,

    /// Invoice-scoped lump discount applied on top of per-line pricing.
    pub extra_discount: f64,

    /// Invoice-scoped grand total.
    pub total: f64,

    /// Invoice-scoped unpaid balance.
    pub due: f64,

    /// Line revenue as precomputed upstream, when the API provides it.
    #[serde(default)]
    pub item_sales: Option<f64>,
}

impl RawSalesLine {
    /// Whether a credit note has reversed this line.
    pub fn is_credited(&self) -> bool {
        self.creditnote_date.is_some()
    }
}

/// An invoice line with its price resolved under a [`PriceBasis`].
///
/// Produced by the pricing engine; consumed by reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub line: RawSalesLine,

    /// Unit price after invoice-level discount allocation (equal to the list
    /// price under [`PriceBasis::ListPrice`] or when no discount applies).
    pub real_unitprice: f64,

    /// Revenue attributed to this line under the chosen basis.
    pub item_sales: f64,
}

/// One signed, sale-or-reversal row of the reconciled ledger.
///
/// Facts are ephemeral: they are recomputed from the raw snapshot on every
/// pipeline run and never persisted. A plain sale contributes one positive
/// fact; a credited sale additionally contributes a negative fact dated at
/// the credit note, so the pair nets to zero over any window containing both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetSalesFact {
    /// Effective ledger date: `issued_at` for sales, `creditnote_date` for
    /// reversals.
    pub effective_date: NaiveDate,
    pub invoice_number: String,
    pub seller_name: String,
    pub payee_name: String,
    pub payee_nit: String,
    pub item_name: String,
    pub item_category: String,

    /// Signed revenue. Negative on reversal facts.
    pub net_amount: f64,

    /// Outstanding balance attributed to the fact. Always 0 on reversals: a
    /// credited invoice no longer owes anything.
    pub due_amount: f64,
}

impl NetSalesFact {
    /// Whether this fact is the negative half of a credit-note reversal.
    pub fn is_reversal(&self) -> bool {
        self.net_amount < 0.0
    }
}

/// How line revenue is priced before reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum PriceBasis {
    /// Allocate each invoice's `extra_discount` proportionally across its
    /// lines, so discounted invoices report what was actually charged.
    DiscountAdjusted,

    /// Take list prices as-is (upstream `item_sales` when present).
    ListPrice,
}

/// How grouped line revenues combine into one fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SalesAggregation {
    Mean,
    Sum,
}

/// Which lines feed the original-sale side of the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SalePartition {
    /// Only never-credited lines count as original sales; credited lines
    /// appear solely through their reversal pair. Sales totals then reflect
    /// kept revenue immediately.
    ExcludeCredited,

    /// Every line counts as an original sale; credited lines net out once
    /// their reversal date is inside the window.
    IncludeAll,
}

/// The full parameter set of the reconciliation pipeline.
///
/// Historically these choices were hard-wired into separate dashboard
/// variants; here they are explicit so one pipeline serves every view. The
/// two named presets reproduce the historical variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineOptions {
    pub price_basis: PriceBasis,
    pub sales_aggregation: SalesAggregation,
    pub sale_partition: SalePartition,
}

impl PipelineOptions {
    /// Discount-adjusted variant: allocated discounts, mean aggregation,
    /// credited lines excluded from the original partition.
    pub fn discount_adjusted() -> Self {
        Self {
            price_basis: PriceBasis::DiscountAdjusted,
            sales_aggregation: SalesAggregation::Mean,
            sale_partition: SalePartition::ExcludeCredited,
        }
    }

    /// List-price variant: upstream line revenue, sum aggregation, all lines
    /// in the original partition.
    pub fn list_price() -> Self {
        Self {
            price_basis: PriceBasis::ListPrice,
            sales_aggregation: SalesAggregation::Sum,
            sale_partition: SalePartition::IncludeAll,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::discount_adjusted()
    }
}
