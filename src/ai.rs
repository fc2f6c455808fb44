use std::path::Path;

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    AnalysisResult, DailyPlan, DietItem, ExerciseItem, Gender, InputMode, Intensity, MealPlan,
    RiskLevel, TrendHint, UserProfile, VisualFeature,
};
use crate::prompts;

const GEMINI_MODEL: &str = "gemini-3-flash-preview";
const API_KEY_VAR: &str = "GEMINI_API_KEY";
const NEXT_SCAN_DAYS: i64 = 3;

/// Photo or report attachment, ready to inline into the request.
pub struct InlineImage {
    pub mime_type: String,
    pub data: String, // base64
}

impl InlineImage {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading attachment {}", path.display()))?;
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("pdf") => "application/pdf",
            // jpeg when in doubt, matching the upload path's behavior
            _ => "image/jpeg",
        };
        Ok(InlineImage {
            mime_type: mime_type.to_string(),
            data: BASE64.encode(&bytes),
        })
    }
}

/// Analysis fields as the model returns them; id and timestamps are stamped
/// in post-processing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    tcm_body_type: String,
    chronic_risk_level: RiskLevel,
    #[serde(default)]
    chronic_risk_type: String,
    health_score: i64,
    predicted_age: u32,
    detected_gender: String,
    visual_features: Vec<VisualFeature>,
    summary: String,
    plan: DailyPlan,
    #[serde(default)]
    trends: Vec<TrendHint>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

fn diet_item_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {"type": "STRING"},
            "description": {"type": "STRING"},
            "tag": {"type": "STRING"},
            "value": {"type": "STRING"},
            "ingredients": {"type": "ARRAY", "items": {"type": "STRING"}},
            "recipe": {"type": "STRING"}
        }
    })
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tcmBodyType": {"type": "STRING", "description": "TCM body constitution type"},
            "chronicRiskLevel": {"type": "STRING", "enum": ["Low", "Medium", "High"]},
            "chronicRiskType": {"type": "STRING"},
            "healthScore": {"type": "INTEGER"},
            "predictedAge": {"type": "INTEGER"},
            "detectedGender": {"type": "STRING"},
            "visualFeatures": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "area": {"type": "STRING"},
                        "finding": {"type": "STRING"},
                        "implication": {"type": "STRING"},
                        "severity": {"type": "STRING", "enum": ["Low", "Medium", "High"]}
                    },
                    "required": ["area", "finding", "implication", "severity"]
                }
            },
            "summary": {
                "type": "STRING",
                "description": "Detailed, structured health summary of around 300 words"
            },
            "plan": {
                "type": "OBJECT",
                "properties": {
                    "diet": {
                        "type": "OBJECT",
                        "properties": {
                            "breakfast": diet_item_schema(),
                            "lunch": diet_item_schema(),
                            "dinner": diet_item_schema(),
                            "snack": diet_item_schema()
                        }
                    },
                    "exercise": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": {"type": "STRING"},
                                "duration": {"type": "STRING"},
                                "intensity": {"type": "STRING", "enum": ["Level 1", "Level 2", "Level 3"]},
                                "benefit": {"type": "STRING"},
                                "isChronicFriendly": {"type": "BOOLEAN"},
                                "instructions": {"type": "STRING", "description": "Step-by-step instructions"}
                            }
                        }
                    },
                    "advice": {"type": "STRING"}
                }
            },
            "trends": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": {"type": "STRING"},
                        "score": {"type": "INTEGER"}
                    }
                }
            }
        },
        "required": [
            "tcmBodyType", "chronicRiskLevel", "healthScore", "predictedAge",
            "detectedGender", "visualFeatures", "summary", "plan", "trends"
        ]
    })
}

async fn request_analysis(
    client: &Client,
    api_key: &str,
    mode: InputMode,
    profile: &UserProfile,
    images: &[InlineImage],
) -> anyhow::Result<RawAnalysis> {
    let mut parts = vec![json!({"text": prompts::analysis_prompt(mode, profile)})];
    for image in images {
        parts.push(json!({
            "inline_data": {"mime_type": image.mime_type, "data": image.data}
        }));
    }

    let body = json!({
        "contents": [{"parts": parts}],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": analysis_schema(),
            "temperature": 0.4
        }
    });

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{GEMINI_MODEL}:generateContent"
    );

    let start = std::time::Instant::now();
    debug!("analysis request starting - mode={}, images={}", mode, images.len());

    let resp = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .context("analysis request failed")?
        .error_for_status()
        .context("analysis request rejected")?;

    let envelope: GenerateContentResponse =
        resp.json().await.context("decoding analysis response")?;
    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| anyhow!("no text candidate in analysis response"))?;

    let raw: RawAnalysis =
        serde_json::from_str(&text).context("decoding analysis payload")?;

    info!(
        "analysis API call completed - duration={:.2}s, score={}",
        start.elapsed().as_secs_f32(),
        raw.health_score
    );

    Ok(raw)
}

fn finalize(raw: RawAnalysis, now: DateTime<Utc>) -> AnalysisResult {
    AnalysisResult {
        id: Uuid::new_v4().to_string(),
        timestamp: now.to_rfc3339(),
        next_prediction_date: (now + Duration::days(NEXT_SCAN_DAYS)).to_rfc3339(),
        tcm_body_type: raw.tcm_body_type,
        chronic_risk_level: raw.chronic_risk_level,
        chronic_risk_type: raw.chronic_risk_type,
        health_score: raw.health_score,
        predicted_age: raw.predicted_age,
        detected_gender: raw.detected_gender,
        visual_features: raw.visual_features,
        summary: raw.summary,
        plan: raw.plan,
        trends: raw.trends,
    }
}

/// Run an assessment. A failed or rejected API call degrades to the
/// deterministic fallback so the outcome can still be stored; a missing key
/// is a hard error unless `offline` is set.
pub async fn analyze_health(
    client: &Client,
    mode: InputMode,
    profile: &UserProfile,
    images: &[InlineImage],
    offline: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<AnalysisResult> {
    if offline {
        info!("offline mode, using the built-in fallback result");
        return Ok(fallback_result(profile, now));
    }

    let api_key = std::env::var(API_KEY_VAR)
        .with_context(|| format!("{API_KEY_VAR} must be set (or pass --offline)"))?;

    match request_analysis(client, &api_key, mode, profile, images).await {
        Ok(raw) => Ok(finalize(raw, now)),
        Err(err) => {
            warn!("analysis failed, falling back to offline result: {err:#}");
            Ok(fallback_result(profile, now))
        }
    }
}

pub fn fallback_result(profile: &UserProfile, now: DateTime<Utc>) -> AnalysisResult {
    let detected_gender = match profile.gender {
        Gender::Unspecified => "Female".to_string(),
        other => other.to_string(),
    };

    AnalysisResult {
        id: Uuid::new_v4().to_string(),
        timestamp: now.to_rfc3339(),
        next_prediction_date: (now + Duration::days(NEXT_SCAN_DAYS)).to_rfc3339(),
        tcm_body_type: "Qi Deficiency (Fallback)".to_string(),
        chronic_risk_level: RiskLevel::Medium,
        chronic_risk_type: "General Fatigue".to_string(),
        health_score: 72,
        predicted_age: profile.age.unwrap_or(35),
        detected_gender,
        visual_features: vec![VisualFeature {
            area: "Face".to_string(),
            finding: "Pale complexion".to_string(),
            implication: "Potential Qi deficiency".to_string(),
            severity: RiskLevel::Medium,
        }],
        summary: "We detected signs of fatigue. Focus on rest and gentle nutrition. \
                  It is recommended to maintain a regular schedule and avoid overexertion. \
                  Eat more digestible and Qi-replenishing foods. For exercise, gentle \
                  stretching is recommended to promote blood circulation. Please scan \
                  every three days to monitor changes in your health status."
            .to_string(),
        plan: DailyPlan {
            diet: MealPlan {
                breakfast: DietItem {
                    name: "Oats & Berries".to_string(),
                    description: "Warm oatmeal".to_string(),
                    tag: "Low GI".to_string(),
                    value: "GI: 55".to_string(),
                    ingredients: vec![
                        "Oats".to_string(),
                        "Blueberries".to_string(),
                        "Milk".to_string(),
                    ],
                    recipe: "Boil oats with milk, add blueberries.".to_string(),
                },
                lunch: DietItem {
                    name: "Steamed Chicken".to_string(),
                    description: "With spinach".to_string(),
                    tag: "High Protein".to_string(),
                    value: "300kcal".to_string(),
                    ingredients: vec![
                        "Chicken Breast".to_string(),
                        "Spinach".to_string(),
                        "Ginger".to_string(),
                    ],
                    recipe: "Steam chicken slices, blanch spinach.".to_string(),
                },
                dinner: DietItem {
                    name: "Vegetable Soup".to_string(),
                    description: "Easy to digest".to_string(),
                    tag: "Light".to_string(),
                    value: "Low Sodium".to_string(),
                    ingredients: vec![
                        "Carrot".to_string(),
                        "Tomato".to_string(),
                        "Onion".to_string(),
                    ],
                    recipe: "Chop all vegetables and boil into soup.".to_string(),
                },
                snack: None,
            },
            exercise: vec![ExerciseItem {
                name: "Gentle Stretching".to_string(),
                duration: "10 min".to_string(),
                intensity: Intensity::Level1,
                benefit: "Circulation".to_string(),
                is_chronic_friendly: true,
                instructions: "Stand straight, raise hands, hold for 10s.".to_string(),
            }],
            advice: "Try to sleep 30 minutes earlier today.".to_string(),
        },
        trends: vec![
            TrendHint { date: "Wk 1".to_string(), score: 65 },
            TrendHint { date: "Wk 2".to_string(), score: 68 },
            TrendHint { date: "Current".to_string(), score: 72 },
            TrendHint { date: "Proj".to_string(), score: 78 },
        ],
    }
}
