use std::collections::BTreeMap;

use anyhow::ensure;
use chrono::{Duration, NaiveDate};

use crate::models::{BandRow, DailyCount, LogRecord};

/// Resample one user's log rows into a contiguous daily hit count,
/// with zero-filled entries for days without activity.
pub fn resample_user_activity(logs: &[LogRecord], user_id: i64) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for record in logs.iter().filter(|record| record.user_id == user_id) {
        *counts.entry(record.occurred_at.date()).or_insert(0) += 1;
    }

    let (first, last) = match (counts.keys().next(), counts.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut series = Vec::new();
    let mut day = first;
    while day <= last {
        series.push(DailyCount {
            day,
            pages: counts.get(&day).copied().unwrap_or(0),
        });
        day = day + Duration::days(1);
    }
    series
}

/// Compute Bollinger bands over a daily count series: an exponentially
/// weighted midband and standard deviation with decay 2/(span+1), plus
/// %b, the position of each day's count within the band (0 = lower band,
/// 1 = upper band). %b is NaN where the band is undefined or has zero
/// width; that sentinel flows through, it is not an error.
pub fn compute_bands(
    series: &[DailyCount],
    span: f64,
    weight: f64,
    user_id: i64,
) -> anyhow::Result<Vec<BandRow>> {
    ensure!(span > 0.0, "span must be positive, got {span}");
    ensure!(weight >= 0.0, "weight must be non-negative, got {weight}");

    let alpha = 2.0 / (span + 1.0);
    let decay = 1.0 - alpha;

    // Running weighted moments. The newest sample weighs 1 and a sample
    // k days back weighs decay^k; deviations are accumulated against the
    // running mean so a constant series keeps an exactly-zero variance.
    let mut total_weight = 0.0;
    let mut total_sq_weight = 0.0;
    let mut mean = 0.0;
    let mut deviation_sum = 0.0;

    let mut rows = Vec::with_capacity(series.len());
    for point in series {
        let pages = point.pages as f64;
        let prior_weight = total_weight * decay;
        total_weight = prior_weight + 1.0;
        total_sq_weight = total_sq_weight * decay * decay + 1.0;

        let delta = pages - mean;
        mean += delta / total_weight;
        deviation_sum = deviation_sum * decay + (prior_weight / total_weight) * delta * delta;

        // Bias-corrected variance. The correction denominator is zero for
        // the first sample, where the stdev (and therefore %b) is NaN.
        let correction = total_weight * total_weight - total_sq_weight;
        let stdev = if correction > 0.0 {
            (deviation_sum * total_weight / correction).sqrt()
        } else {
            f64::NAN
        };

        let midband = mean;
        let upper_band = midband + weight * stdev;
        let lower_band = midband - weight * stdev;
        let band_width = upper_band - lower_band;
        let pct_b = if band_width == 0.0 {
            f64::NAN
        } else {
            (pages - lower_band) / band_width
        };

        rows.push(BandRow {
            day: point.day,
            pages: point.pages,
            midband,
            upper_band,
            lower_band,
            pct_b,
            user_id,
        });
    }

    Ok(rows)
}

/// Identify anomalous days for one user: days whose hit count sits above
/// the upper band (%b > 1). NaN %b never compares above 1, so undefined
/// days are excluded without a special case.
pub fn find_anomalies(
    logs: &[LogRecord],
    user_id: i64,
    span: f64,
    weight: f64,
) -> anyhow::Result<Vec<BandRow>> {
    let pages = resample_user_activity(logs, user_id);
    let banded = compute_bands(&pages, span, weight, user_id)?;
    Ok(banded.into_iter().filter(|row| row.pct_b > 1.0).collect())
}
