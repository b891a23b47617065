use crate::rollup::MonthBucket;

/// Growth-trend headline for a monthly series: the ordinary-least-squares
/// slope of bucket totals against elapsed days since the first bucket,
/// expressed as a percentage of the first bucket's total (per day). Returns
/// 0.0 when the first bucket's total is 0 or the regression is degenerate
/// (fewer than two buckets, or no spread on the x axis).
pub fn growth_trend_pct(series: &[MonthBucket]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let first_value = series[0].total;
    if first_value == 0.0 {
        return 0.0;
    }

    let origin = series[0].month;
    let points: Vec<(f64, f64)> = series
        .iter()
        .map(|bucket| ((bucket.month - origin).num_days() as f64, bucket.total))
        .collect();

    match ols_slope(&points) {
        Some(slope) => slope / first_value * 100.0,
        None => 0.0,
    }
}

/// Least-squares slope of y against x. `None` when the x values carry no
/// spread.
fn ols_slope(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    let mean_x: f64 = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y: f64 = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }

    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}
