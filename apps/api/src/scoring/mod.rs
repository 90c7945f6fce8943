//! Candidate score normalization.
//!
//! The upstream scoring payload is loose: each score may be a fraction, a
//! percentage, a numeric string, or missing. Every raw shape is handled here and
//! nowhere else; the rest of the crate only sees `NormalizedScore`.

pub mod handlers;
pub mod provider;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Raw score payload as returned by the scoring service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    #[serde(default)]
    pub resume_score: Option<Value>,
    #[serde(default)]
    pub overall_score: Option<Value>,
    /// Legacy field, consulted last.
    #[serde(default)]
    pub match_score: Option<Value>,
    #[serde(default)]
    pub skills_match: Option<Value>,
    #[serde(default)]
    pub experience_match: Option<Value>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub ai_insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NormalizedScore {
    /// `fraction` is always within (0, 1]. `raw` is the value as received.
    Scored { raw: Value, fraction: f64 },
    /// No score yet, or a score of exactly zero.
    Processing,
    /// The score exists but cannot be read as a number.
    Unavailable,
}

impl NormalizedScore {
    pub fn fraction(&self) -> Option<f64> {
        match self {
            NormalizedScore::Scored { fraction, .. } => Some(*fraction),
            _ => None,
        }
    }

    /// Whole-number percentage for display. A real score never shows as 0.
    pub fn percent(&self) -> Option<u8> {
        self.fraction().map(|f| ((f * 100.0).round() as u8).max(1))
    }

    pub fn badge(&self) -> &'static str {
        match self.fraction() {
            Some(f) if f >= 0.8 => "Excellent",
            Some(f) if f >= 0.65 => "Good",
            Some(f) if f >= 0.5 => "Fair",
            Some(_) => "Low",
            None if *self == NormalizedScore::Processing => "Processing",
            None => "N/A",
        }
    }
}

/// Picks the headline score: `resumeScore`, then `overallScore`, then
/// `matchScore`. The first field that is present and non-null wins, even if it
/// later normalizes to `Processing` or `Unavailable`.
pub fn normalize(record: &ScoreRecord) -> NormalizedScore {
    [
        &record.resume_score,
        &record.overall_score,
        &record.match_score,
    ]
    .into_iter()
    .find_map(Option::as_ref)
    .map(normalize_value)
    .unwrap_or(NormalizedScore::Processing)
}

/// Normalizes a single score value. Values above 1 are read as percentages.
pub fn normalize_value(value: &Value) -> NormalizedScore {
    let number = match value {
        Value::Null => return NormalizedScore::Processing,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(v) = number.filter(|v| v.is_finite()) else {
        return NormalizedScore::Unavailable;
    };

    let fraction = if v > 1.0 { v / 100.0 } else { v }.clamp(0.0, 1.0);
    if fraction == 0.0 {
        return NormalizedScore::Processing;
    }
    NormalizedScore::Scored {
        raw: value.clone(),
        fraction,
    }
}

fn normalize_optional(value: &Option<Value>) -> NormalizedScore {
    value
        .as_ref()
        .map(normalize_value)
        .unwrap_or(NormalizedScore::Processing)
}

/// Response body for `GET /api/v1/candidates/:id/ai-score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreView {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub score: NormalizedScore,
    pub percent: Option<u8>,
    pub badge: String,
    pub skills_match: NormalizedScore,
    pub experience_match: NormalizedScore,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub ai_insights: Vec<String>,
}

impl ScoreView {
    /// `None` means the scoring service could not be reached.
    pub fn build(candidate_id: Uuid, candidate_name: &str, record: Option<&ScoreRecord>) -> Self {
        let Some(record) = record else {
            return ScoreView {
                candidate_id,
                candidate_name: candidate_name.to_string(),
                score: NormalizedScore::Unavailable,
                percent: None,
                badge: NormalizedScore::Unavailable.badge().to_string(),
                skills_match: NormalizedScore::Unavailable,
                experience_match: NormalizedScore::Unavailable,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                ai_insights: Vec::new(),
            };
        };

        let score = normalize(record);
        ScoreView {
            candidate_id,
            candidate_name: candidate_name.to_string(),
            percent: score.percent(),
            badge: score.badge().to_string(),
            score,
            skills_match: normalize_optional(&record.skills_match),
            experience_match: normalize_optional(&record.experience_match),
            strengths: record.strengths.clone(),
            weaknesses: record.weaknesses.clone(),
            ai_insights: record.ai_insights.clone(),
        }
    }
}
