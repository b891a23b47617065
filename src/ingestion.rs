use crate::error::{NetSalesError, Result};
use crate::schema::RawSalesLine;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::Deserialize;

/// A scalar as the sales API actually emits it: the same field may arrive as
/// a JSON number on one record and a quoted string on the next.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireScalar {
    Number(f64),
    Text(String),
}

impl WireScalar {
    fn as_number(&self) -> Option<f64> {
        match self {
            WireScalar::Number(n) => Some(*n),
            WireScalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Identifier rendering: integral numbers lose the float formatting so a
    /// NIT sent as `105272981` and as `"105272981"` compare equal.
    fn to_text(&self) -> String {
        match self {
            WireScalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            WireScalar::Number(n) => n.to_string(),
            WireScalar::Text(s) => s.trim().to_string(),
        }
    }
}

/// One record of the `/sales/details` payload, before validation.
///
/// Every field is optional at this stage so that a single broken record can
/// be reported with its index and field name instead of failing somewhere
/// inside the deserializer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSalesRecord {
    #[serde(default)]
    pub invoice_number: Option<WireScalar>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub creditnote_date: Option<String>,
    #[serde(default)]
    pub seller_name: Option<String>,
    #[serde(default)]
    pub payee_name: Option<String>,
    #[serde(default)]
    pub payee_nit: Option<WireScalar>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub item_unitprice: Option<WireScalar>,
    #[serde(default)]
    pub item_quantity: Option<WireScalar>,
    #[serde(default)]
    pub subtotal: Option<WireScalar>,
    #[serde(default)]
    pub extra_discount: Option<WireScalar>,
    #[serde(default)]
    pub total: Option<WireScalar>,
    #[serde(default)]
    pub due: Option<WireScalar>,
    #[serde(default)]
    pub item_sales: Option<WireScalar>,
}

/// Parses a snapshot document (a JSON array of records) into normalized
/// lines. The entire document is rejected on the first invalid record: a
/// dashboard built from half a snapshot would silently under-report.
pub fn parse_snapshot(document: &str) -> Result<Vec<RawSalesLine>> {
    let records: Vec<RawSalesRecord> = serde_json::from_str(document)?;
    normalize_records(records)
}

/// Validates and normalizes already-deserialized records.
pub fn normalize_records(records: Vec<RawSalesRecord>) -> Result<Vec<RawSalesLine>> {
    info!("Normalizing snapshot of {} raw records", records.len());

    let mut lines = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        lines.push(normalize_record(index, record)?);
    }

    debug!("Snapshot normalized: {} lines", lines.len());
    Ok(lines)
}

fn normalize_record(index: usize, record: RawSalesRecord) -> Result<RawSalesLine> {
    // 1. Identifiers and names.
    let invoice_number = require(index, "invoice_number", record.invoice_number)?.to_text();
    let seller_name = require_text(index, "seller_name", record.seller_name)?;
    let payee_name = require_text(index, "payee_name", record.payee_name)?;
    let payee_nit = require(index, "payee_nit", record.payee_nit)?.to_text();
    let item_name = require_text(index, "item_name", record.item_name)?;
    let item_category = require_text(index, "item_category", record.item_category)?;

    // 2. Dates. `creditnote_date` is genuinely optional; empty string and
    //    null both mean the sale was never reversed.
    let issued_raw = require_text(index, "issued_at", record.issued_at)?;
    let issued_at = parse_date(index, "issued_at", &issued_raw)?;
    let creditnote_date = match record.creditnote_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_date(index, "creditnote_date", raw)?),
    };

    // 3. Monetary fields, tolerant of string-typed numbers.
    let item_unitprice = require_number(index, "item_unitprice", record.item_unitprice)?;
    let item_quantity = require_number(index, "item_quantity", record.item_quantity)?;
    let subtotal = require_number(index, "subtotal", record.subtotal)?;
    let extra_discount = require_number(index, "extra_discount", record.extra_discount)?;
    let total = require_number(index, "total", record.total)?;
    let due = require_number(index, "due", record.due)?;

    // 4. Upstream-computed line revenue, when present.
    let item_sales = match record.item_sales {
        None => None,
        Some(value) => Some(number_of(index, "item_sales", &value)?),
    };

    Ok(RawSalesLine {
        invoice_number,
        issued_at,
        creditnote_date,
        seller_name,
        payee_name,
        payee_nit,
        item_name,
        item_category,
        item_unitprice,
        item_quantity,
        subtotal,
        extra_discount,
        total,
        due,
        item_sales,
    })
}

fn require<T>(index: usize, field: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| NetSalesError::DataFormat {
        index,
        field,
        message: "missing or null".to_string(),
    })
}

fn require_text(index: usize, field: &'static str, value: Option<String>) -> Result<String> {
    let text = require(index, field, value)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NetSalesError::DataFormat {
            index,
            field,
            message: "empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn require_number(index: usize, field: &'static str, value: Option<WireScalar>) -> Result<f64> {
    let scalar = require(index, field, value)?;
    number_of(index, field, &scalar)
}

fn number_of(index: usize, field: &'static str, scalar: &WireScalar) -> Result<f64> {
    scalar.as_number().ok_or_else(|| NetSalesError::DataFormat {
        index,
        field,
        message: format!("not a number: {:?}", scalar),
    })
}

/// Accepts the date renderings the API has been observed to emit: a bare
/// `YYYY-MM-DD`, an ISO-8601 datetime with or without fractional seconds,
/// and a full RFC 3339 timestamp. Time-of-day is discarded.
fn parse_date(index: usize, field: &'static str, raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive());
    }
    Err(NetSalesError::DataFormat {
        index,
        field,
        message: format!("unrecognized date: '{}'", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(creditnote: &str) -> String {
        format!(
            r#"{{
                "invoice_number": 4711,
                "issued_at": "2024-03-15T10:30:00",
                "creditnote_date": {creditnote},
                "seller_name": "Ana",
                "payee_name": "Clinica Central",
                "payee_nit": 105272981,
                "item_name": "Ibuprofen 400mg",
                "item_category": "Analgesics",
                "item_unitprice": "100.0",
                "item_quantity": 2,
                "subtotal": 400.0,
                "extra_discount": 40,
                "total": "360.00",
                "due": 0,
                "item_sales": 200.0
            }}"#
        )
    }

    #[test]
    fn test_parses_mixed_scalar_types() {
        let document = format!("[{}]", record_json("null"));
        let lines = parse_snapshot(&document).unwrap();
        assert_eq!(lines.len(), 1);

        let line = &lines[0];
        assert_eq!(line.invoice_number, "4711");
        assert_eq!(line.payee_nit, "105272981");
        assert_eq!(line.issued_at, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(line.creditnote_date, None);
        assert_eq!(line.item_unitprice, 100.0);
        assert_eq!(line.total, 360.0);
        assert_eq!(line.item_sales, Some(200.0));
    }

    #[test]
    fn test_creditnote_date_variants() {
        let credited = format!("[{}]", record_json("\"2024-04-01\""));
        let lines = parse_snapshot(&credited).unwrap();
        assert_eq!(
            lines[0].creditnote_date,
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );

        let blank = format!("[{}]", record_json("\"\""));
        let lines = parse_snapshot(&blank).unwrap();
        assert_eq!(lines[0].creditnote_date, None);
    }

    #[test]
    fn test_rfc3339_and_bare_dates() {
        for raw in [
            "2024-03-15",
            "2024-03-15T23:59:59.123",
            "2024-03-15 08:00:00",
            "2024-03-15T06:00:00-06:00",
        ] {
            let date = parse_date(0, "issued_at", raw).unwrap();
            assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        }
    }

    #[test]
    fn test_missing_field_aborts_with_location() {
        let broken = record_json("null").replace("\"payee_name\": \"Clinica Central\",", "");
        let document = format!("[{}, {}]", record_json("null"), broken);
        let err = parse_snapshot(&document).unwrap_err();
        match err {
            NetSalesError::DataFormat { index, field, .. } => {
                assert_eq!(index, 1);
                assert_eq!(field, "payee_name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_number_aborts() {
        let broken = record_json("null").replace("\"subtotal\": 400.0", "\"subtotal\": \"n/a\"");
        let document = format!("[{}]", broken);
        let err = parse_snapshot(&document).unwrap_err();
        match err {
            NetSalesError::DataFormat { index, field, .. } => {
                assert_eq!(index, 0);
                assert_eq!(field, "subtotal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_snapshot_is_valid() {
        assert!(parse_snapshot("[]").unwrap().is_empty());
    }

    #[test]
    fn test_non_array_document_rejected() {
        assert!(parse_snapshot("{\"rows\": []}").is_err());
    }
}
