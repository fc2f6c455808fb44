use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum InputMode {
    FaceHand,
    HandOnly,
    DataOnly,
    MedicalReport,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputMode::FaceHand => "FACE_HAND",
            InputMode::HandOnly => "HAND_ONLY",
            InputMode::DataOnly => "DATA_ONLY",
            InputMode::MedicalReport => "MEDICAL_REPORT",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unspecified => "Unspecified",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub gender: Gender,
    pub age: Option<u32>,
    pub chronic_conditions: Vec<String>,
    pub custom_symptoms: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualFeature {
    pub area: String,
    pub finding: String,
    pub implication: String,
    pub severity: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietItem {
    pub name: String,
    pub description: String,
    pub tag: String,   // e.g. "Low GI", "Low Sodium"
    pub value: String, // e.g. "GI: 45", "Na: 50mg"
    pub ingredients: Vec<String>,
    pub recipe: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    #[serde(rename = "Level 1")]
    Level1,
    #[serde(rename = "Level 2")]
    Level2,
    #[serde(rename = "Level 3")]
    Level3,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Intensity::Level1 => "Level 1",
            Intensity::Level2 => "Level 2",
            Intensity::Level3 => "Level 3",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseItem {
    pub name: String,
    pub duration: String,
    pub intensity: Intensity,
    pub benefit: String,
    pub is_chronic_friendly: bool,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    pub breakfast: DietItem,
    pub lunch: DietItem,
    pub dinner: DietItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snack: Option<DietItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPlan {
    pub diet: MealPlan,
    pub exercise: Vec<ExerciseItem>,
    pub advice: String, // one-sentence optimization
}

/// Trajectory hint supplied by the model itself. The chart never reads
/// these; the trend builder is the single source of chart data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendHint {
    pub date: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub timestamp: String, // RFC 3339
    pub next_prediction_date: String,
    pub tcm_body_type: String,
    pub chronic_risk_level: RiskLevel,
    pub chronic_risk_type: String,
    pub health_score: i64, // 0..=100
    pub predicted_age: u32,
    pub detected_gender: String,
    pub visual_features: Vec<VisualFeature>,
    pub summary: String,
    pub plan: DailyPlan,
    #[serde(default)]
    pub trends: Vec<TrendHint>,
}

/// Persisted assessment summary. `recorded_at` is kept as the raw persisted
/// string; the trend builder owns parsing it and rejects bad values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub recorded_at: String,
    pub score: i64,
    pub summary: String,
    pub full_result: AnalysisResult,
}
