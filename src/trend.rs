use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

use crate::models::HistoryRecord;

/// Most recent history points kept on the chart. Older entries are dropped
/// for chart density only; stored history is untouched.
pub const HISTORY_WINDOW: usize = 5;

const TARGET_FLOOR: f64 = 95.0;
const IMPROVEMENT_RATE: f64 = 0.15;

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("history record {id} has unparsable date {raw:?}")]
    InvalidRecord { id: String, raw: String },

    #[error("unknown time scale {0:?}, expected day, week or month")]
    InvalidTimeScale(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScale {
    Day,
    Week,
    Month,
}

impl TimeScale {
    pub fn projection_points(self) -> usize {
        match self {
            TimeScale::Day => 7,
            TimeScale::Week => 4,
            TimeScale::Month => 6,
        }
    }

    pub fn interval_days(self) -> i64 {
        match self {
            TimeScale::Day => 1,
            TimeScale::Week => 7,
            TimeScale::Month => 30,
        }
    }

    fn prediction_label(self, at: DateTime<Utc>) -> String {
        let fmt = match self {
            TimeScale::Day => "%a",
            TimeScale::Week => "%b %-d",
            TimeScale::Month => "%b",
        };
        at.format(fmt).to_string()
    }
}

impl FromStr for TimeScale {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeScale::Day),
            "week" => Ok(TimeScale::Week),
            "month" => Ok(TimeScale::Month),
            other => Err(TrendError::InvalidTimeScale(other.to_string())),
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeScale::Day => "day",
            TimeScale::Week => "week",
            TimeScale::Month => "month",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    History,
    Current,
    Prediction,
}

#[derive(Debug, Clone)]
pub struct ChartPoint {
    pub label: String,
    pub at: DateTime<Utc>,
    pub score: i64,
    pub kind: PointKind,
    /// Id of the originating history record, for reload. Absent on the
    /// current anchor (the caller holds the live result) and on predictions.
    pub record_id: Option<String>,
}

/// Synthesize the chart sequence: windowed history, a single "Now" anchor,
/// then a forward projection for the chosen scale. Pure in its inputs plus
/// the injected clock and random source; never emits a partial sequence.
pub fn build_trend_series(
    history: &[HistoryRecord],
    current_score: i64,
    scale: TimeScale,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<Vec<ChartPoint>, TrendError> {
    // Every date must parse before anything is emitted; one bad record
    // rejects the whole build instead of sorting in an undefined position.
    let mut dated: Vec<(DateTime<Utc>, &HistoryRecord)> = Vec::with_capacity(history.len());
    for record in history {
        let at = DateTime::parse_from_rfc3339(&record.recorded_at)
            .map_err(|_| TrendError::InvalidRecord {
                id: record.id.clone(),
                raw: record.recorded_at.clone(),
            })?
            .with_timezone(&Utc);
        dated.push((at, record));
    }
    dated.sort_by_key(|(at, _)| *at);

    let skip = dated.len().saturating_sub(HISTORY_WINDOW);
    let mut points: Vec<ChartPoint> = dated[skip..]
        .iter()
        .map(|(at, record)| ChartPoint {
            label: at.format("%b %-d").to_string(),
            at: *at,
            score: record.score,
            kind: PointKind::History,
            record_id: Some(record.id.clone()),
        })
        .collect();

    points.push(ChartPoint {
        label: "Now".to_string(),
        at: now,
        score: current_score,
        kind: PointKind::Current,
        record_id: None,
    });

    let target = (current_score as f64).max(TARGET_FLOOR);
    let mut predicted = current_score as f64;
    for step in 1..=scale.projection_points() {
        // Asymptotic climb: close 15% of the remaining gap each step. The
        // jitter goes into the displayed score only, so the running value
        // never overshoots the target.
        predicted += (target - predicted) * IMPROVEMENT_RATE;
        let noise: f64 = rng.gen_range(-1.0..=1.0);
        let at = now + Duration::days(step as i64 * scale.interval_days());
        points.push(ChartPoint {
            label: scale.prediction_label(at),
            at,
            score: ((predicted + noise).round() as i64).clamp(0, 100),
            kind: PointKind::Prediction,
            record_id: None,
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::ai;
    use crate::models::{Gender, HistoryRecord, UserProfile};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_profile() -> UserProfile {
        UserProfile {
            gender: Gender::Unspecified,
            age: None,
            chronic_conditions: Vec::new(),
            custom_symptoms: None,
        }
    }

    fn record(id: &str, recorded_at: &str, score: i64) -> HistoryRecord {
        let mut result = ai::fallback_result(&sample_profile(), fixed_now());
        result.id = id.to_string();
        result.health_score = score;
        HistoryRecord {
            id: id.to_string(),
            recorded_at: recorded_at.to_string(),
            score,
            summary: "stable".to_string(),
            full_result: result,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn single_current_point_splits_history_from_predictions() {
        let history = vec![
            record("b", "2024-12-10T09:00:00Z", 68),
            record("a", "2024-12-01T09:00:00Z", 64),
            record("c", "2024-12-20T09:00:00Z", 71),
        ];
        let points =
            build_trend_series(&history, 70, TimeScale::Week, fixed_now(), &mut rng()).unwrap();

        let current_at = points
            .iter()
            .position(|p| p.kind == PointKind::Current)
            .unwrap();
        assert_eq!(
            points.iter().filter(|p| p.kind == PointKind::Current).count(),
            1
        );
        assert!(points[..current_at]
            .iter()
            .all(|p| p.kind == PointKind::History));
        assert!(points[current_at + 1..]
            .iter()
            .all(|p| p.kind == PointKind::Prediction));
    }

    #[test]
    fn projection_count_follows_scale() {
        for (scale, expected) in [
            (TimeScale::Day, 7),
            (TimeScale::Week, 4),
            (TimeScale::Month, 6),
        ] {
            let points = build_trend_series(&[], 70, scale, fixed_now(), &mut rng()).unwrap();
            let predictions = points
                .iter()
                .filter(|p| p.kind == PointKind::Prediction)
                .count();
            assert_eq!(predictions, expected);
        }
    }

    #[test]
    fn keeps_only_latest_five_history_points() {
        let history: Vec<HistoryRecord> = (1..=8)
            .map(|day| {
                record(
                    &format!("r{day}"),
                    &format!("2024-12-{day:02}T09:00:00Z"),
                    60 + day,
                )
            })
            .collect();
        let points =
            build_trend_series(&history, 70, TimeScale::Week, fixed_now(), &mut rng()).unwrap();

        let kept: Vec<&ChartPoint> = points
            .iter()
            .filter(|p| p.kind == PointKind::History)
            .collect();
        assert_eq!(kept.len(), HISTORY_WINDOW);
        let ids: Vec<&str> = kept.iter().map(|p| p.record_id.as_deref().unwrap()).collect();
        assert_eq!(ids, ["r4", "r5", "r6", "r7", "r8"]);
        // history scores pass through unmodified
        let scores: Vec<i64> = kept.iter().map(|p| p.score).collect();
        assert_eq!(scores, [64, 65, 66, 67, 68]);
    }

    #[test]
    fn unsorted_input_comes_out_chronological() {
        let history = vec![
            record("late", "2024-12-25T09:00:00Z", 70),
            record("early", "2024-11-02T09:00:00Z", 62),
            record("mid", "2024-12-05T09:00:00Z", 66),
        ];
        let points =
            build_trend_series(&history, 70, TimeScale::Day, fixed_now(), &mut rng()).unwrap();
        assert!(points.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn empty_history_week_scenario() {
        let points =
            build_trend_series(&[], 72, TimeScale::Week, fixed_now(), &mut rng()).unwrap();

        assert_eq!(points.len(), 5);
        assert_eq!(points[0].label, "Now");
        assert_eq!(points[0].score, 72);
        assert_eq!(points[0].kind, PointKind::Current);
        assert_eq!(
            points.last().unwrap().at.date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 29).unwrap()
        );
    }

    #[test]
    fn high_score_holds_near_target() {
        let points =
            build_trend_series(&[], 95, TimeScale::Day, fixed_now(), &mut rng()).unwrap();
        for p in points.iter().filter(|p| p.kind == PointKind::Prediction) {
            assert!((94..=96).contains(&p.score), "score {} drifted", p.score);
        }
    }

    #[test]
    fn low_score_climbs_toward_target() {
        let points =
            build_trend_series(&[], 40, TimeScale::Month, fixed_now(), &mut rng()).unwrap();

        let mut expected = 40.0_f64;
        for p in points.iter().filter(|p| p.kind == PointKind::Prediction) {
            expected += (95.0 - expected) * 0.15;
            // round-off plus at most 1.0 of jitter
            assert!(
                (p.score as f64 - expected).abs() <= 1.501,
                "step score {} too far from {expected:.2}",
                p.score
            );
        }
        assert!((expected - 74.26).abs() < 0.01);
    }

    #[test]
    fn scores_stay_within_bounds() {
        for current in [0, 100] {
            let points =
                build_trend_series(&[], current, TimeScale::Day, fixed_now(), &mut rng()).unwrap();
            assert!(points.iter().all(|p| (0..=100).contains(&p.score)));
        }
    }

    #[test]
    fn seeded_rng_reproduces_the_sequence() {
        let history = vec![record("a", "2024-12-01T09:00:00Z", 64)];
        let first = build_trend_series(
            &history,
            70,
            TimeScale::Month,
            fixed_now(),
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();
        let second = build_trend_series(
            &history,
            70,
            TimeScale::Month,
            fixed_now(),
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.at, b.at);
            assert_eq!(a.score, b.score);
            assert_eq!(a.kind, b.kind);
        }
    }

    #[test]
    fn history_labels_use_short_month_and_day() {
        let history = vec![record("a", "2024-12-05T09:00:00Z", 64)];
        let points =
            build_trend_series(&history, 70, TimeScale::Week, fixed_now(), &mut rng()).unwrap();
        assert_eq!(points[0].label, "Dec 5");
    }

    #[test]
    fn bad_date_rejects_the_whole_build() {
        let history = vec![
            record("good", "2024-12-01T09:00:00Z", 64),
            record("bad", "not-a-date", 66),
        ];
        let err =
            build_trend_series(&history, 70, TimeScale::Week, fixed_now(), &mut rng()).unwrap_err();
        match err {
            TrendError::InvalidRecord { id, .. } => assert_eq!(id, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn time_scale_parses_only_known_values() {
        assert_eq!("week".parse::<TimeScale>().unwrap(), TimeScale::Week);
        assert!(matches!(
            "fortnight".parse::<TimeScale>(),
            Err(TrendError::InvalidTimeScale(_))
        ));
    }
}
