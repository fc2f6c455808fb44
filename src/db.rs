use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{AnalysisResult, Gender, HistoryRecord, UserProfile};

/// Capacity contract of the store: the 20 most recent assessments are kept,
/// everything older is evicted on append.
pub const HISTORY_CAP: usize = 20;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id TEXT PRIMARY KEY,
            recorded_at TEXT NOT NULL,
            score INTEGER NOT NULL,
            summary TEXT NOT NULL,
            full_result TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn append_history(pool: &SqlitePool, result: &AnalysisResult) -> anyhow::Result<()> {
    let payload = serde_json::to_string(result).context("serializing analysis result")?;

    sqlx::query(
        r#"
        INSERT INTO history (id, recorded_at, score, summary, full_result)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&result.id)
    .bind(&result.timestamp)
    .bind(result.health_score)
    .bind(&result.summary)
    .bind(payload)
    .execute(pool)
    .await?;

    // RFC 3339 UTC timestamps sort lexicographically, so text order is
    // chronological order here.
    sqlx::query(
        "DELETE FROM history WHERE id IN \
         (SELECT id FROM history ORDER BY recorded_at DESC LIMIT -1 OFFSET $1)",
    )
    .bind(HISTORY_CAP as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Full persisted list, most-recent-first.
pub async fn load_history(pool: &SqlitePool) -> anyhow::Result<Vec<HistoryRecord>> {
    let rows = sqlx::query(
        "SELECT id, recorded_at, score, summary, full_result \
         FROM history ORDER BY recorded_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let raw: String = row.get("full_result");
        let full_result: AnalysisResult =
            serde_json::from_str(&raw).context("decoding stored analysis result")?;
        records.push(HistoryRecord {
            id: row.get("id"),
            recorded_at: row.get("recorded_at"),
            score: row.get("score"),
            summary: row.get("summary"),
            full_result,
        });
    }

    Ok(records)
}

pub async fn fetch_result(pool: &SqlitePool, id: &str) -> anyhow::Result<Option<AnalysisResult>> {
    let row = sqlx::query("SELECT full_result FROM history WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.get("full_result");
            let result =
                serde_json::from_str(&raw).context("decoding stored analysis result")?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}

pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let profile = UserProfile {
        gender: Gender::Unspecified,
        age: Some(35),
        chronic_conditions: Vec::new(),
        custom_symptoms: None,
    };

    let seeds = [
        (
            "7c1d55a8-4f0e-4a7b-9a35-2f6e8cf41d02",
            "2026-07-12T08:30:00Z",
            64,
            "Qi Deficiency",
            "Signs of fatigue and a pale complexion. Prioritise rest and warm, digestible meals.",
        ),
        (
            "f09a6a1e-b2c3-4d58-8b67-5f1d9e7a3c44",
            "2026-07-20T09:10:00Z",
            69,
            "Qi Deficiency",
            "Energy improving with regular sleep. Keep gentle movement daily.",
        ),
        (
            "2e4b8d90-17aa-4c21-bd4f-90c3a5e6f718",
            "2026-07-29T08:05:00Z",
            73,
            "Balanced",
            "Complexion and energy close to baseline. Maintain the current plan.",
        ),
    ];

    for (id, recorded_at, score, body_type, summary) in seeds {
        let at = DateTime::parse_from_rfc3339(recorded_at)
            .context("invalid seed date")?
            .with_timezone(&Utc);
        let mut result = crate::ai::fallback_result(&profile, at);
        result.id = id.to_string();
        result.health_score = score;
        result.tcm_body_type = body_type.to_string();
        result.summary = summary.to_string();
        append_history(pool, &result).await?;
    }

    Ok(())
}

pub async fn export_csv(pool: &SqlitePool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Serialize)]
    struct CsvRow<'a> {
        id: &'a str,
        recorded_at: &'a str,
        score: i64,
        body_type: &'a str,
        risk_level: String,
        summary: &'a str,
    }

    let records = load_history(pool).await?;
    let mut writer = csv::Writer::from_path(csv_path)?;

    for record in &records {
        writer.serialize(CsvRow {
            id: &record.id,
            recorded_at: &record.recorded_at,
            score: record.score,
            body_type: &record.full_result.tcm_body_type,
            risk_level: record.full_result.chronic_risk_level.to_string(),
            summary: &record.summary,
        })?;
    }
    writer.flush()?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::ai;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    fn result_at(id: &str, recorded_at: &str, score: i64) -> AnalysisResult {
        let profile = UserProfile {
            gender: Gender::Unspecified,
            age: None,
            chronic_conditions: Vec::new(),
            custom_symptoms: None,
        };
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let mut result = ai::fallback_result(&profile, now);
        result.id = id.to_string();
        result.timestamp = recorded_at.to_string();
        result.health_score = score;
        result
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let pool = test_pool().await;
        append_history(&pool, &result_at("one", "2026-07-01T08:00:00Z", 64))
            .await
            .unwrap();
        append_history(&pool, &result_at("two", "2026-07-05T08:00:00Z", 70))
            .await
            .unwrap();

        let records = load_history(&pool).await.unwrap();
        assert_eq!(records.len(), 2);
        // storage order is most-recent-first
        assert_eq!(records[0].id, "two");
        assert_eq!(records[0].score, 70);
        assert_eq!(records[1].id, "one");
        assert_eq!(records[1].full_result.health_score, 64);
    }

    #[tokio::test]
    async fn append_is_idempotent_on_id() {
        let pool = test_pool().await;
        let result = result_at("dup", "2026-07-01T08:00:00Z", 64);
        append_history(&pool, &result).await.unwrap();
        append_history(&pool, &result).await.unwrap();

        assert_eq!(load_history(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cap_evicts_oldest_beyond_twenty() {
        let pool = test_pool().await;
        for i in 0..25 {
            let result = result_at(
                &format!("id-{i:02}"),
                &format!("2026-07-{:02}T08:00:00Z", i + 1),
                60,
            );
            append_history(&pool, &result).await.unwrap();
        }

        let records = load_history(&pool).await.unwrap();
        assert_eq!(records.len(), HISTORY_CAP);
        assert_eq!(records.first().unwrap().id, "id-24");
        assert_eq!(records.last().unwrap().id, "id-05");
    }

    #[tokio::test]
    async fn fetch_result_reloads_embedded_report() {
        let pool = test_pool().await;
        append_history(&pool, &result_at("kept", "2026-07-01T08:00:00Z", 81))
            .await
            .unwrap();

        let reloaded = fetch_result(&pool, "kept").await.unwrap().unwrap();
        assert_eq!(reloaded.health_score, 81);
        assert!(fetch_result(&pool, "missing").await.unwrap().is_none());
    }
}
