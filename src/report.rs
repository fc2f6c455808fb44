use std::fmt::Write;

use chrono::DateTime;

use crate::models::{AnalysisResult, DietItem};
use crate::trend::{ChartPoint, PointKind, TimeScale};

fn pretty_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn render_trend_table(points: &[ChartPoint]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Label | Date | Score | Kind | Record |");
    let _ = writeln!(output, "|---|---|---|---|---|");

    for point in points {
        let kind = match point.kind {
            PointKind::History => "history",
            PointKind::Current => "current",
            PointKind::Prediction => "projected",
        };
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            point.label,
            point.at.format("%Y-%m-%d"),
            point.score,
            kind,
            point.record_id.as_deref().unwrap_or("")
        );
    }

    output
}

fn write_meal(output: &mut String, label: &str, item: &DietItem) {
    let _ = writeln!(
        output,
        "- {}: {} ({}, {}) - {}",
        label, item.name, item.tag, item.value, item.description
    );
    let _ = writeln!(output, "  - Ingredients: {}", item.ingredients.join(", "));
    let _ = writeln!(output, "  - Prep: {}", item.recipe);
}

pub fn build_report(result: &AnalysisResult, scale: TimeScale, trend: &[ChartPoint]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# ZenPulse Health Report");
    let _ = writeln!(
        output,
        "Generated {} (assessment {})",
        pretty_date(&result.timestamp),
        result.id
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Profile");
    let _ = writeln!(
        output,
        "- {}, {}yo",
        result.detected_gender, result.predicted_age
    );
    let _ = writeln!(output, "- Body type: {}", result.tcm_body_type);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk");
    let _ = writeln!(output, "- Health score: {}/100", result.health_score);
    if result.chronic_risk_type.is_empty() {
        let _ = writeln!(output, "- Chronic risk: {}", result.chronic_risk_level);
    } else {
        let _ = writeln!(
            output,
            "- Chronic risk: {} ({})",
            result.chronic_risk_level, result.chronic_risk_type
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Visual Findings");
    if result.visual_features.is_empty() {
        let _ = writeln!(output, "No visual findings recorded.");
    } else {
        for feature in result.visual_features.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {}. {}",
                feature.severity, feature.area, feature.finding, feature.implication
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "{}", result.summary.trim());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Plan");
    let _ = writeln!(output, "### Diet");
    write_meal(&mut output, "Breakfast", &result.plan.diet.breakfast);
    write_meal(&mut output, "Lunch", &result.plan.diet.lunch);
    write_meal(&mut output, "Dinner", &result.plan.diet.dinner);
    if let Some(snack) = &result.plan.diet.snack {
        write_meal(&mut output, "Snack", snack);
    }

    let _ = writeln!(output, "### Exercise");
    if result.plan.exercise.is_empty() {
        let _ = writeln!(output, "No exercises suggested.");
    } else {
        for item in result.plan.exercise.iter() {
            let friendly = if item.is_chronic_friendly {
                ", chronic-friendly"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "- {} ({}, {}{}) - {}",
                item.name, item.duration, item.intensity, friendly, item.benefit
            );
            let _ = writeln!(output, "  - How: {}", item.instructions);
        }
    }
    let _ = writeln!(output, "### Advice");
    let _ = writeln!(output, "{}", result.plan.advice);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Trend ({scale} scale)");
    let _ = write!(output, "{}", render_trend_table(trend));
    let _ = writeln!(
        output,
        "\nProjected points are synthesized from the current score, not measured."
    );

    if !result.trends.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Model trajectory notes");
        for hint in result.trends.iter() {
            let _ = writeln!(output, "- {}: {}", hint.date, hint.score);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Suggested next scan: {}.",
        pretty_date(&result.next_prediction_date)
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::ai;
    use crate::models::{Gender, UserProfile};
    use crate::trend;

    #[test]
    fn report_carries_every_section() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let profile = UserProfile {
            gender: Gender::Female,
            age: Some(30),
            chronic_conditions: Vec::new(),
            custom_symptoms: None,
        };
        let result = ai::fallback_result(&profile, now);
        let points = trend::build_trend_series(
            &[],
            result.health_score,
            TimeScale::Week,
            now,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let report = build_report(&result, TimeScale::Week, &points);

        assert!(report.contains("# ZenPulse Health Report"));
        assert!(report.contains("## Score Trend (week scale)"));
        assert!(report.contains("| Now | 2026-08-01 | 72 | current |"));
        assert!(report.contains("### Diet"));
        assert!(report.contains("Suggested next scan: 2026-08-04"));
    }

    #[test]
    fn trend_table_marks_projected_rows() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let points = trend::build_trend_series(
            &[],
            60,
            TimeScale::Day,
            now,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let table = render_trend_table(&points);
        assert_eq!(table.matches("| projected |").count(), 7);
        assert_eq!(table.matches("| current |").count(), 1);
    }
}
