use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row};

use crate::models::LogRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let cohorts = vec![
        (1i64, "Staff", "2015-09-22", "2099-01-01", 2i64),
        (33i64, "Andromeda", "2019-03-18", "2019-07-30", 2i64),
        (59i64, "Bayes", "2019-08-19", "2020-01-30", 3i64),
    ];

    for (id, name, start_date, end_date, program_id) in cohorts {
        sqlx::query(
            r#"
            INSERT INTO curriculum.cohorts (id, name, start_date, end_date, program_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date, program_id = EXCLUDED.program_id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(NaiveDate::parse_from_str(start_date, "%Y-%m-%d").context("invalid date")?)
        .bind(NaiveDate::parse_from_str(end_date, "%Y-%m-%d").context("invalid date")?)
        .bind(program_id)
        .execute(pool)
        .await?;
    }

    let logs = vec![
        ("seed-001", "2019-04-01 09:02:11", "javascript-i/loops", 466i64, "97.105.19.58", 33i64),
        ("seed-002", "2019-04-01 09:40:53", "javascript-i/functions", 466i64, "97.105.19.58", 33i64),
        ("seed-003", "2019-04-02 10:12:07", "html-css/positioning", 466i64, "97.105.19.58", 33i64),
        ("seed-004", "2019-04-04 08:55:30", "javascript-ii/promises", 466i64, "97.105.19.58", 33i64),
        ("seed-005", "2019-09-03 13:21:44", "classification/overview", 581i64, "72.181.113.170", 59i64),
        ("seed-006", "2019-09-03 13:22:10", "classification/prep", 581i64, "72.181.113.170", 59i64),
        ("seed-007", "2019-09-05 15:47:02", "regression/model", 581i64, "72.181.113.170", 59i64),
    ];

    for (source_key, occurred_at, endpoint, user_id, ip, cohort_id) in logs {
        sqlx::query(
            r#"
            INSERT INTO curriculum.logs
            (occurred_at, endpoint, user_id, ip, cohort_id, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(
            NaiveDateTime::parse_from_str(occurred_at, "%Y-%m-%d %H:%M:%S")
                .context("invalid timestamp")?,
        )
        .bind(endpoint)
        .bind(user_id)
        .bind(ip)
        .bind(cohort_id)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_logs(pool: &PgPool) -> anyhow::Result<Vec<LogRecord>> {
    let rows = sqlx::query(
        "SELECT l.occurred_at, l.endpoint, l.user_id, l.ip, \
         c.name AS cohort_name, c.start_date AS cohort_start, \
         c.end_date AS cohort_end, c.program_id \
         FROM curriculum.logs l \
         JOIN curriculum.cohorts c ON c.id = l.cohort_id \
         ORDER BY l.occurred_at",
    )
    .fetch_all(pool)
    .await?;

    let mut logs = Vec::new();
    for row in rows {
        logs.push(LogRecord {
            occurred_at: row.get("occurred_at"),
            endpoint: row.get("endpoint"),
            user_id: row.get("user_id"),
            ip: row.get("ip"),
            cohort_name: row.get("cohort_name"),
            cohort_start: row.get("cohort_start"),
            cohort_end: row.get("cohort_end"),
            program_id: row.get("program_id"),
        });
    }

    Ok(logs)
}

/// Load the full log table, preferring a local CSV cache over a round trip
/// to Postgres. A cache miss queries the database and writes the cache for
/// the next run.
pub async fn load_logs(pool: &PgPool, cache: &Path) -> anyhow::Result<Vec<LogRecord>> {
    if cache.is_file() {
        let mut reader = csv::Reader::from_path(cache)
            .with_context(|| format!("failed to open cache {}", cache.display()))?;
        let mut logs = Vec::new();
        for result in reader.deserialize::<LogRecord>() {
            logs.push(result?);
        }
        return Ok(logs);
    }

    let logs = fetch_logs(pool).await?;

    let mut writer = csv::Writer::from_path(cache)
        .with_context(|| format!("failed to write cache {}", cache.display()))?;
    for record in &logs {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(logs)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        occurred_at: NaiveDateTime,
        endpoint: String,
        user_id: i64,
        ip: String,
        cohort_id: i64,
        cohort_name: String,
        cohort_start: NaiveDate,
        cohort_end: NaiveDate,
        program_id: i64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        sqlx::query(
            r#"
            INSERT INTO curriculum.cohorts (id, name, start_date, end_date, program_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date, program_id = EXCLUDED.program_id
            "#,
        )
        .bind(row.cohort_id)
        .bind(&row.cohort_name)
        .bind(row.cohort_start)
        .bind(row.cohort_end)
        .bind(row.program_id)
        .execute(pool)
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}-{}", row.user_id, row.occurred_at));

        let result = sqlx::query(
            r#"
            INSERT INTO curriculum.logs
            (occurred_at, endpoint, user_id, ip, cohort_id, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(row.occurred_at)
        .bind(&row.endpoint)
        .bind(row.user_id)
        .bind(&row.ip)
        .bind(row.cohort_id)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
