use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod bands;
mod db;
mod models;
mod report;

#[derive(Parser)]
#[command(name = "curriculum-log-anomaly")]
#[command(about = "Bollinger-band burst detector for curriculum access logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import log rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Flag days where a user's page hits rise above the upper band
    Detect {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 20.0)]
        span: f64,
        #[arg(long, default_value_t = 2.0)]
        weight: f64,
        #[arg(long, default_value = "curriculum_logs.csv")]
        cache: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report of one user's daily bands
    Report {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 20.0)]
        span: f64,
        #[arg(long, default_value_t = 2.0)]
        weight: f64,
        #[arg(long, default_value = "curriculum_logs.csv")]
        cache: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} log rows from {}.", csv.display());
        }
        Commands::Detect {
            user,
            span,
            weight,
            cache,
            json,
        } => {
            let logs = db::load_logs(&pool, &cache).await?;
            let anomalies = bands::find_anomalies(&logs, user, span, weight)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&anomalies)?);
            } else if anomalies.is_empty() {
                println!("No anomalous days for user {user}.");
            } else {
                println!("Anomalous days for user {user}:");
                for row in &anomalies {
                    println!(
                        "- {}: {} hits, %b {:.2} (upper band {:.1})",
                        row.day, row.pages, row.pct_b, row.upper_band
                    );
                }
            }
        }
        Commands::Report {
            user,
            span,
            weight,
            cache,
            out,
        } => {
            let logs = db::load_logs(&pool, &cache).await?;
            let pages = bands::resample_user_activity(&logs, user);
            let banded = bands::compute_bands(&pages, span, weight, user)?;
            let anomalies: Vec<models::BandRow> = banded
                .iter()
                .filter(|row| row.pct_b > 1.0)
                .cloned()
                .collect();
            let report = report::build_report(user, span, weight, &banded, &anomalies);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
