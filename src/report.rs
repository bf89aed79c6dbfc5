use std::fmt::Write;

use crate::models::{BandRow, VolumeSummary};

pub fn summarize_volume(bands: &[BandRow]) -> VolumeSummary {
    let mut summary = VolumeSummary {
        days: bands.len(),
        total_pages: 0,
        peak_day: None,
        peak_pages: 0,
    };

    for row in bands {
        summary.total_pages += row.pages;
        if row.pages > summary.peak_pages || summary.peak_day.is_none() {
            summary.peak_day = Some(row.day);
            summary.peak_pages = row.pages;
        }
    }

    summary
}

pub fn build_report(
    user_id: i64,
    span: f64,
    weight: f64,
    bands: &[BandRow],
    anomalies: &[BandRow],
) -> String {
    let summary = summarize_volume(bands);

    let mut output = String::new();

    let _ = writeln!(output, "# Access Anomaly Report: user {user_id}");
    let _ = writeln!(
        output,
        "EWMA span {span} days, band width {weight} standard deviations"
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Volume");

    if bands.is_empty() {
        let _ = writeln!(output, "No activity recorded for this user.");
    } else {
        let first = bands[0].day;
        let last = bands[bands.len() - 1].day;
        let mean_pages = summary.total_pages as f64 / summary.days as f64;
        let _ = writeln!(
            output,
            "- {} days observed ({} to {})",
            summary.days, first, last
        );
        let _ = writeln!(
            output,
            "- {} total page hits ({:.1} per day)",
            summary.total_pages, mean_pages
        );
        if let Some(peak_day) = summary.peak_day {
            let _ = writeln!(
                output,
                "- busiest day {} with {} hits",
                peak_day, summary.peak_pages
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Anomalous Days");

    if anomalies.is_empty() {
        let _ = writeln!(output, "No days above the upper band.");
    } else {
        for row in anomalies {
            let _ = writeln!(
                output,
                "- {}: {} hits, %b {:.2} (upper band {:.1}, midband {:.1})",
                row.day, row.pages, row.pct_b, row.upper_band, row.midband
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn band_row(day: u32, pages: i64, pct_b: f64) -> BandRow {
        BandRow {
            day: NaiveDate::from_ymd_opt(2020, 3, day).unwrap(),
            pages,
            midband: 2.0,
            upper_band: 4.0,
            lower_band: 0.0,
            pct_b,
            user_id: 466,
        }
    }

    #[test]
    fn summarize_tracks_peak_and_totals() {
        let bands = vec![band_row(1, 3, 0.5), band_row(2, 9, 1.2), band_row(3, 1, 0.2)];
        let summary = summarize_volume(&bands);
        assert_eq!(summary.days, 3);
        assert_eq!(summary.total_pages, 13);
        assert_eq!(summary.peak_pages, 9);
        assert_eq!(summary.peak_day, Some(NaiveDate::from_ymd_opt(2020, 3, 2).unwrap()));
    }

    #[test]
    fn report_handles_empty_activity() {
        let report = build_report(466, 20.0, 2.0, &[], &[]);
        assert!(report.contains("No activity recorded"));
        assert!(report.contains("No days above the upper band."));
    }

    #[test]
    fn report_lists_anomalous_days() {
        let bands = vec![band_row(1, 3, 0.5), band_row(2, 9, 1.2)];
        let anomalies = vec![bands[1].clone()];
        let report = build_report(466, 20.0, 2.0, &bands, &anomalies);
        assert!(report.contains("2020-03-02: 9 hits"));
        assert!(report.contains("2 days observed"));
    }
}
