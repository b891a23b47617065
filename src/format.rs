//! String rendering for the presentation layer. Amounts are quetzales.

/// Renders a money amount as `Q1,234.50`: the currency letter, the sign for
/// negative amounts, comma thousands groups and two decimals.
pub fn format_money(value: f64) -> String {
    let rendered = format!("{:.2}", value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some(parts) => parts,
        None => (rendered.as_str(), "00"),
    };
    let sign = if value < 0.0 { "-" } else { "" };
    format!("Q{}{}.{}", sign, group_thousands(integer), fraction)
}

/// `12.3%` style percentage.
pub fn format_pct(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}

/// Percentage with a leading `+` on strictly positive values, as used for
/// growth headlines: `+12.3%`, `-4.0%`, `0.0%`.
pub fn format_signed_pct(value: f64, decimals: usize) -> String {
    if value > 0.0 {
        format!("+{:.*}%", decimals, value)
    } else {
        format!("{:.*}%", decimals, value)
    }
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, byte) in bytes.iter().enumerate() {
        if position > 0 && (bytes.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*byte as char);
    }
    grouped
}
