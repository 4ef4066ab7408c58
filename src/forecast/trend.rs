//! Short-horizon trend projection over the recent-history window.

/// Project the next wait time from recorded history.
///
/// With three or more values an ordinary least-squares line is fit against
/// index positions and projected one step ahead as `last + slope`; with fewer
/// values the last recorded value is used. Returns `None` on empty history so
/// the caller can fall back to the overall average.
pub fn project_next(history: &[f64]) -> Option<f64> {
    let last = *history.last()?;
    if history.len() < 3 {
        return Some(last);
    }
    Some(last + slope(history))
}

/// OLS slope of values against their index positions 0..n-1.
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}
