//! First difference of the composite AQI over time-ordered rows.

use crate::engine::round2;

/// `rates[i] = aqi[i] - aqi[i - 1]`, rounded to two decimals.
///
/// The first entry is always `Some(0.0)` since there is no prior value.
/// A difference against an undefined neighbour is `None`, never zero.
pub fn change_rates(aqi: &[Option<f64>]) -> Vec<Option<f64>> {
    if aqi.is_empty() {
        return Vec::new();
    }

    let mut rates = Vec::with_capacity(aqi.len());
    rates.push(Some(0.0));
    rates.extend(aqi.windows(2).map(|pair| match (pair[0], pair[1]) {
        (Some(prev), Some(next)) => Some(round2(next - prev)),
        _ => None,
    }));
    rates
}
