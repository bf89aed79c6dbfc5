use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub occurred_at: NaiveDateTime,
    pub endpoint: String,
    pub user_id: i64,
    pub ip: String,
    pub cohort_name: String,
    pub cohort_start: NaiveDate,
    pub cohort_end: NaiveDate,
    pub program_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub pages: i64,
}

#[derive(Debug, Clone)]
pub struct VolumeSummary {
    pub days: usize,
    pub total_pages: i64,
    pub peak_day: Option<NaiveDate>,
    pub peak_pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandRow {
    pub day: NaiveDate,
    pub pages: i64,
    pub midband: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub pct_b: f64,
    pub user_id: i64,
}
