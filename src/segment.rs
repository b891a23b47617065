use crate::schema::NetSalesFact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Lifecycle label for a customer, combining recency of their last purchase
/// with how often they buy relative to the customer base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentCategory {
    /// Bought recently, not yet a frequent buyer.
    Nuevo,
    /// Bought recently and buys often.
    Leal,
    /// Last purchase within a year, infrequent.
    Curioso,
    /// Last purchase within a year, used to buy often.
    Latente,
    /// One shot long ago.
    #[serde(rename = "1 Timer")]
    OneTimer,
    /// A frequent buyer the business lost.
    Olvidado,
}

impl SegmentCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentCategory::Nuevo => "Nuevo",
            SegmentCategory::Leal => "Leal",
            SegmentCategory::Curioso => "Curioso",
            SegmentCategory::Latente => "Latente",
            SegmentCategory::OneTimer => "1 Timer",
            SegmentCategory::Olvidado => "Olvidado",
        }
    }
}

impl fmt::Display for SegmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One customer with the measures the classifier ran on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSegment {
    pub payee_nit: String,
    pub payee_name: String,
    pub total_sales: f64,
    pub distinct_days_with_sales: usize,
    pub days_since_last_purchase: i64,
    pub category: SegmentCategory,
}

/// Rollup of one category across the customer base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: SegmentCategory,
    pub total_sales: f64,
    pub client_count: usize,
}

/// First-match decision list. Frequency is judged against the average
/// distinct purchase days across the whole customer base; "below" means
/// strictly below.
pub fn classify(
    days_since_last_purchase: i64,
    distinct_days_with_sales: usize,
    average_distinct_days: f64,
) -> SegmentCategory {
    let frequent = distinct_days_with_sales as f64 >= average_distinct_days;
    if days_since_last_purchase <= 180 {
        if frequent {
            SegmentCategory::Leal
        } else {
            SegmentCategory::Nuevo
        }
    } else if days_since_last_purchase <= 365 {
        if frequent {
            SegmentCategory::Latente
        } else {
            SegmentCategory::Curioso
        }
    } else if frequent {
        SegmentCategory::Olvidado
    } else {
        SegmentCategory::OneTimer
    }
}

struct CustomerAccumulator {
    payee_name: String,
    total_sales: f64,
    purchase_days: BTreeSet<NaiveDate>,
}

/// Segments every customer present in the facts. Recency counts from
/// `today`; the frequency threshold is the mean distinct-purchase-day count
/// over all customers. Output is ordered by total sales descending.
pub fn segment_customers(facts: &[NetSalesFact], today: NaiveDate) -> Vec<CustomerSegment> {
    // 1. Fold facts per customer.
    let mut customers: HashMap<(String, String), CustomerAccumulator> = HashMap::new();
    for fact in facts {
        let accumulator = customers
            .entry((fact.payee_nit.clone(), fact.payee_name.clone()))
            .or_insert_with(|| CustomerAccumulator {
                payee_name: fact.payee_name.clone(),
                total_sales: 0.0,
                purchase_days: BTreeSet::new(),
            });
        accumulator.total_sales += fact.net_amount;
        accumulator.purchase_days.insert(fact.effective_date);
    }
    if customers.is_empty() {
        return Vec::new();
    }

    // 2. Population average of distinct purchase days.
    let average_distinct_days = customers
        .values()
        .map(|c| c.purchase_days.len() as f64)
        .sum::<f64>()
        / customers.len() as f64;

    // 3. Classify each customer against that average.
    let mut segments: Vec<CustomerSegment> = customers
        .into_iter()
        .map(|((payee_nit, _), accumulator)| {
            let distinct_days_with_sales = accumulator.purchase_days.len();
            // The set is never empty: a customer only exists here because a
            // fact inserted a date.
            let last_purchase = *accumulator.purchase_days.iter().next_back().unwrap();
            let days_since_last_purchase = (today - last_purchase).num_days();
            CustomerSegment {
                payee_nit,
                payee_name: accumulator.payee_name,
                total_sales: accumulator.total_sales,
                distinct_days_with_sales,
                days_since_last_purchase,
                category: classify(
                    days_since_last_purchase,
                    distinct_days_with_sales,
                    average_distinct_days,
                ),
            }
        })
        .collect();

    segments.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.payee_name.cmp(&b.payee_name))
    });
    segments
}

/// Per-category totals and headcounts, largest total first.
pub fn category_summary(segments: &[CustomerSegment]) -> Vec<CategorySummary> {
    let mut totals: HashMap<SegmentCategory, (f64, usize)> = HashMap::new();
    for segment in segments {
        let entry = totals.entry(segment.category).or_insert((0.0, 0));
        entry.0 += segment.total_sales;
        entry.1 += 1;
    }

    let mut summaries: Vec<CategorySummary> = totals
        .into_iter()
        .map(|(category, (total_sales, client_count))| CategorySummary {
            category,
            total_sales,
            client_count,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.label().cmp(b.category.label()))
    });
    summaries
}

/// Interactive narrowing of a segment listing. All criteria are optional
/// and conjunctive; substring matches ignore case.
#[derive(Debug, Clone, Default)]
pub struct SegmentFilter {
    pub nit_contains: Option<String>,
    pub name_contains: Option<String>,
    pub categories: Vec<SegmentCategory>,
}

impl SegmentFilter {
    pub fn apply(&self, segments: &[CustomerSegment]) -> Vec<CustomerSegment> {
        segments
            .iter()
            .filter(|segment| self.matches(segment))
            .cloned()
            .collect()
    }

    fn matches(&self, segment: &CustomerSegment) -> bool {
        if let Some(needle) = &self.nit_contains {
            if !contains_ignore_case(&segment.payee_nit, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !contains_ignore_case(&segment.payee_name, needle) {
                return false;
            }
        }
        if !self.categories.is_empty() && !self.categories.contains(&segment.category) {
            return false;
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
