use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::sqlite::SqlitePoolOptions;

mod ai;
mod db;
mod models;
mod prompts;
mod report;
mod trend;

use models::{Gender, HistoryRecord, InputMode, UserProfile};
use trend::{ChartPoint, TimeScale};

#[derive(Parser)]
#[command(name = "zenpulse")]
#[command(about = "Local health assessment tracker with AI analysis and score trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local database schema
    InitDb,
    /// Load a small set of demo assessments
    Seed,
    /// Run a new assessment and store it in history
    Analyze {
        #[arg(long, value_enum, default_value_t = InputMode::DataOnly)]
        mode: InputMode,
        #[arg(long, value_enum, default_value_t = Gender::Unspecified)]
        gender: Gender,
        #[arg(long)]
        age: Option<u32>,
        /// Chronic condition, repeatable
        #[arg(long = "condition")]
        conditions: Vec<String>,
        #[arg(long)]
        symptoms: Option<String>,
        /// Photo or medical report attachment, repeatable
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Skip the API call and use the built-in fallback result
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// List stored assessments
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a stored report by id
    Show {
        id: String,
        #[arg(long, default_value = "week")]
        scale: TimeScale,
    },
    /// Print the score trend chart data
    Trend {
        #[arg(long, default_value = "week")]
        scale: TimeScale,
        /// Override the current score (defaults to the latest assessment)
        #[arg(long)]
        score: Option<i64>,
        /// Seed the projection noise for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write a markdown report for an assessment
    Report {
        /// Assessment id (defaults to the latest)
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value = "week")]
        scale: TimeScale,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export history summary columns to CSV
    Export {
        #[arg(long, default_value = "history.csv")]
        out: PathBuf,
    },
}

fn build_points(
    history: &[HistoryRecord],
    score: i64,
    scale: TimeScale,
    seed: Option<u64>,
) -> anyhow::Result<Vec<ChartPoint>> {
    let now = Utc::now();
    let points = match seed {
        Some(seed) => trend::build_trend_series(
            history,
            score,
            scale,
            now,
            &mut StdRng::seed_from_u64(seed),
        )?,
        None => trend::build_trend_series(history, score, scale, now, &mut rand::thread_rng())?,
    };
    Ok(points)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("ZENPULSE_DB")
        .unwrap_or_else(|_| "sqlite://zenpulse.db?mode=rwc".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to open the history database")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed assessments inserted.");
        }
        Commands::Analyze {
            mode,
            gender,
            age,
            conditions,
            symptoms,
            images,
            offline,
        } => {
            let profile = UserProfile {
                gender,
                age,
                chronic_conditions: conditions,
                custom_symptoms: symptoms,
            };
            let mut attachments = Vec::with_capacity(images.len());
            for path in &images {
                attachments.push(ai::InlineImage::from_file(path)?);
            }

            let client = reqwest::Client::new();
            let result =
                ai::analyze_health(&client, mode, &profile, &attachments, offline, Utc::now())
                    .await?;
            db::append_history(&pool, &result).await?;

            println!("Assessment {} stored.", result.id);
            println!(
                "Score {}/100, {} risk ({}), body type {}.",
                result.health_score,
                result.chronic_risk_level,
                result.chronic_risk_type,
                result.tcm_body_type
            );
            println!("{}", result.summary);
        }
        Commands::History { limit } => {
            let records = db::load_history(&pool).await?;
            if records.is_empty() {
                println!("No assessments stored yet.");
                return Ok(());
            }
            for record in records.iter().take(limit) {
                let preview: String = record.summary.chars().take(60).collect();
                println!(
                    "- {} {} score {} | {}",
                    record.id, record.recorded_at, record.score, preview
                );
            }
        }
        Commands::Show { id, scale } => {
            let Some(result) = db::fetch_result(&pool, &id).await? else {
                println!("No assessment with id {id}.");
                return Ok(());
            };
            let history = db::load_history(&pool).await?;
            let points = build_points(&history, result.health_score, scale, None)?;
            println!("{}", report::build_report(&result, scale, &points));
        }
        Commands::Trend { scale, score, seed } => {
            let history = db::load_history(&pool).await?;
            let current = match score.or_else(|| history.first().map(|r| r.score)) {
                Some(current) => current,
                None => {
                    println!("No assessments stored yet; pass --score to project anyway.");
                    return Ok(());
                }
            };
            let points = build_points(&history, current, scale, seed)?;

            println!("Score trend ({scale} scale):");
            print!("{}", report::render_trend_table(&points));
        }
        Commands::Report {
            id,
            scale,
            seed,
            out,
        } => {
            let history = db::load_history(&pool).await?;
            let result = match id {
                Some(id) => db::fetch_result(&pool, &id)
                    .await?
                    .with_context(|| format!("no assessment with id {id}"))?,
                None => match history.first() {
                    Some(record) => record.full_result.clone(),
                    None => {
                        println!("No assessments stored yet.");
                        return Ok(());
                    }
                },
            };
            let points = build_points(&history, result.health_score, scale, seed)?;
            let report = report::build_report(&result, scale, &points);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let exported = db::export_csv(&pool, &out).await?;
            println!("Exported {exported} assessments to {}.", out.display());
        }
    }

    Ok(())
}
