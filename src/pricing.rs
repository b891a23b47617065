use crate::schema::{PriceBasis, PricedLine, RawSalesLine};
use log::debug;
use std::collections::HashMap;

/// Invoice-level terms needed for discount allocation. Taken from the first
/// line of each invoice in encounter order: the fields are invoice-scoped
/// copies, so reading any single line is correct and summing them across
/// lines would multiply the discount by the line count.
#[derive(Debug, Clone, Copy)]
struct InvoiceTerms {
    extra_discount: f64,
    subtotal: f64,
}

/// Resolves each line's effective unit price and revenue under the given
/// basis. Output preserves input order.
pub fn price_lines(lines: &[RawSalesLine], basis: PriceBasis) -> Vec<PricedLine> {
    match basis {
        PriceBasis::DiscountAdjusted => price_discount_adjusted(lines),
        PriceBasis::ListPrice => price_list(lines),
    }
}

fn price_discount_adjusted(lines: &[RawSalesLine]) -> Vec<PricedLine> {
    // 1. Collect each invoice's discount terms from its first line.
    let mut terms: HashMap<&str, InvoiceTerms> = HashMap::new();
    for line in lines {
        terms
            .entry(line.invoice_number.as_str())
            .or_insert(InvoiceTerms {
                extra_discount: line.extra_discount,
                subtotal: line.subtotal,
            });
    }
    debug!(
        "Pricing {} lines across {} invoices (discount-adjusted)",
        lines.len(),
        terms.len()
    );

    // 2. Allocate the invoice discount across lines in proportion to each
    //    line's share of the subtotal. A zero subtotal means the invoice
    //    carries no allocatable base, so list prices stand.
    lines
        .iter()
        .map(|line| {
            let invoice = terms[line.invoice_number.as_str()];
            let real_unitprice = if invoice.subtotal != 0.0 {
                line.item_unitprice
                    - invoice.extra_discount * line.item_unitprice / invoice.subtotal
            } else {
                line.item_unitprice
            };
            PricedLine {
                real_unitprice,
                item_sales: real_unitprice * line.item_quantity,
                line: line.clone(),
            }
        })
        .collect()
}

fn price_list(lines: &[RawSalesLine]) -> Vec<PricedLine> {
    lines
        .iter()
        .map(|line| PricedLine {
            real_unitprice: line.item_unitprice,
            item_sales: line
                .item_sales
                .unwrap_or(line.item_unitprice * line.item_quantity),
            line: line.clone(),
        })
        .collect()
}
