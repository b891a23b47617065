use crate::schema::{NetSalesFact, PipelineOptions, PricedLine, SalePartition, SalesAggregation};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Turns priced invoice lines into the signed net-sales ledger.
///
/// Lines never touched by a credit note yield one positive fact. Credited
/// lines yield a negative fact dated at the credit note and, depending on the
/// configured partition, may also yield their positive original; with
/// [`SalePartition::IncludeAll`] the pair nets to exactly zero across any
/// window containing both dates.
pub struct Reconciler<'a> {
    options: &'a PipelineOptions,
}

/// Grouping key for collapsing repeated lines of the same logical position.
type GroupKey = (NaiveDate, String, String, String, String, String);

struct GroupAccumulator {
    item_category: String,
    sales_sum: f64,
    due_sum: f64,
    line_count: usize,
}

impl<'a> Reconciler<'a> {
    pub fn new(options: &'a PipelineOptions) -> Self {
        Self { options }
    }

    pub fn reconcile(&self, priced: &[PricedLine]) -> Vec<NetSalesFact> {
        // 1. Split the snapshot into the original-sale side and the
        //    reversal side. Which lines count as originals is a caller
        //    choice; reversals are always exactly the credited lines.
        let originals: Vec<&PricedLine> = match self.options.sale_partition {
            SalePartition::ExcludeCredited => {
                priced.iter().filter(|p| !p.line.is_credited()).collect()
            }
            SalePartition::IncludeAll => priced.iter().collect(),
        };
        let reversals: Vec<&PricedLine> = priced
            .iter()
            .filter(|p| p.line.is_credited())
            .collect();
        debug!(
            "Reconciling {} lines: {} originals, {} reversals",
            priced.len(),
            originals.len(),
            reversals.len()
        );

        // 2. Collapse each side and concatenate. No deduplication happens
        //    across the two sides: a credited sale is represented by both
        //    rows, which is what makes window totals come out right.
        let mut facts = self.collapse(&originals, false);
        facts.extend(self.collapse(&reversals, true));

        info!(
            "Reconciled ledger holds {} facts from {} raw lines",
            facts.len(),
            priced.len()
        );
        facts
    }

    /// Collapses one partition into facts, grouped by the effective date and
    /// the full identity of the line. Output keeps the first-encounter order
    /// of each group.
    fn collapse(&self, lines: &[&PricedLine], reversal: bool) -> Vec<NetSalesFact> {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, GroupAccumulator> = HashMap::new();

        for priced in lines {
            let line = &priced.line;
            // Reversals move to the credit-note date. A credit note dated
            // before its invoice is taken at face value.
            let effective_date = if reversal {
                match line.creditnote_date {
                    Some(date) => date,
                    None => continue,
                }
            } else {
                line.issued_at
            };

            let key: GroupKey = (
                effective_date,
                line.invoice_number.clone(),
                line.seller_name.clone(),
                line.payee_name.clone(),
                line.payee_nit.clone(),
                line.item_name.clone(),
            );

            let accumulator = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                GroupAccumulator {
                    item_category: line.item_category.clone(),
                    sales_sum: 0.0,
                    due_sum: 0.0,
                    line_count: 0,
                }
            });
            accumulator.sales_sum += priced.item_sales;
            accumulator.due_sum += line.due;
            accumulator.line_count += 1;
        }

        order
            .into_iter()
            .map(|key| {
                let accumulator = &groups[&key];
                let count = accumulator.line_count as f64;

                let net_amount = match self.options.sales_aggregation {
                    SalesAggregation::Mean => accumulator.sales_sum / count,
                    SalesAggregation::Sum => accumulator.sales_sum,
                };
                // The due balance is invoice-scoped and repeated per line,
                // so it always collapses by mean. A reversed sale owes
                // nothing, whatever the raw rows still say.
                let due_amount = if reversal {
                    0.0
                } else {
                    accumulator.due_sum / count
                };

                let (effective_date, invoice_number, seller_name, payee_name, payee_nit, item_name) =
                    key;
                NetSalesFact {
                    effective_date,
                    invoice_number,
                    seller_name,
                    payee_name,
                    payee_nit,
                    item_name,
                    item_category: accumulator.item_category.clone(),
                    net_amount: if reversal { -net_amount } else { net_amount },
                    due_amount,
                }
            })
            .collect()
    }
}
