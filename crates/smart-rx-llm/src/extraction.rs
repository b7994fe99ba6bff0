//! Recommendation extraction from generative service output.

use serde_json::{Map, Value};
use smart_rx_core::models::{MedicationEntry, Recommendation, RecommendationSource};
use thiserror::Error;

/// Confidence reported when the reply carried no JSON object.
pub const NO_JSON_CONFIDENCE: f64 = 0.6;

/// Confidence reported when the JSON object failed to parse.
pub const PARSE_FAILURE_CONFIDENCE: f64 = 0.3;

/// Characters of raw reply kept in the notes of a degraded result.
pub const RAW_NOTES_LIMIT: usize = 500;

/// Confidence assumed when a parsed reply omits it.
const DEFAULT_PARSED_CONFIDENCE: f64 = 0.5;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No JSON object found in response")]
    NoJsonObject,

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Outcome of interpreting one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub recommendation: Recommendation,
    /// `Ai` when the reply parsed, `InterpreterFallback` otherwise
    pub source: RecommendationSource,
}

/// Parse the greedy `{ ... }` slice of a reply.
///
/// The slice runs from the first `{` to the last `}`, so surrounding prose is
/// ignored but two separate objects in one reply fail to parse.
pub fn extract_json_object(text: &str) -> ExtractionResult<Value> {
    let start = text.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
    if end < start {
        return Err(ExtractionError::NoJsonObject);
    }

    Ok(serde_json::from_str(&text[start..=end])?)
}

/// Interpret a reply, degrading to a canned recommendation on failure.
pub fn interpret(text: &str) -> Interpretation {
    match extract_json_object(text) {
        Ok(Value::Object(fields)) => Interpretation {
            recommendation: recommendation_from_fields(&fields),
            source: RecommendationSource::Ai,
        },
        // A greedy brace slice that parses is always an object.
        Ok(_) => Interpretation {
            recommendation: degraded_recommendation(text, &ExtractionError::NoJsonObject),
            source: RecommendationSource::InterpreterFallback,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Could not interpret generative reply");
            Interpretation {
                recommendation: degraded_recommendation(text, &e),
                source: RecommendationSource::InterpreterFallback,
            }
        }
    }
}

/// Interpret a reply into a recommendation. Never fails.
pub fn interpret_response(text: &str) -> Recommendation {
    interpret(text).recommendation
}

/// Normalize a parsed reply. Missing or wrong-typed fields take defaults.
pub fn recommendation_from_fields(fields: &Map<String, Value>) -> Recommendation {
    let confidence = fields
        .get("confidence")
        .and_then(number_value)
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_PARSED_CONFIDENCE)
        .clamp(0.0, 1.0);

    let medications = fields
        .get("medications")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(medication_from_value).collect())
        .unwrap_or_default();

    let mut recommendation = Recommendation {
        diagnosis: string_field(fields, "finalDiagnosis"),
        confidence,
        reasoning: string_field(fields, "reasoning"),
        medications,
        conflict_warnings: string_list(fields.get("conflictWarnings")),
        recommendations: string_list(fields.get("recommendations")),
        notes: string_field(fields, "notes"),
        history_insights: string_field(fields, "historyInsights"),
    };
    recommendation.cap_medications();
    recommendation
}

/// Canned low-confidence recommendation carrying the raw reply in its notes.
pub fn degraded_recommendation(text: &str, error: &ExtractionError) -> Recommendation {
    let (confidence, reasoning) = match error {
        ExtractionError::NoJsonObject => (
            NO_JSON_CONFIDENCE,
            "AI response did not contain a structured JSON recommendation. \
             The raw response is included in the notes for manual review."
                .to_string(),
        ),
        ExtractionError::JsonParse(e) => (
            PARSE_FAILURE_CONFIDENCE,
            format!(
                "AI response contained malformed JSON ({}). \
                 The raw response is included in the notes for manual review.",
                e
            ),
        ),
    };

    Recommendation {
        diagnosis: "Requires clinical review".to_string(),
        confidence,
        reasoning,
        medications: Vec::new(),
        conflict_warnings: vec![
            "AI analysis incomplete - verify diagnosis and medications manually".to_string(),
        ],
        recommendations: vec!["Review the AI response before prescribing".to_string()],
        notes: text.chars().take(RAW_NOTES_LIMIT).collect(),
        history_insights: String::new(),
    }
}

/// Medication line as given. Entries that are neither a string nor an object
/// are skipped.
fn medication_from_value(value: &Value) -> Option<MedicationEntry> {
    match value {
        Value::String(name) => Some(MedicationEntry::named(name)),
        Value::Object(fields) => Some(MedicationEntry {
            name: string_field(fields, "name"),
            strength: string_field(fields, "strength"),
            frequency: string_field(fields, "frequency"),
            duration: string_field(fields, "duration"),
            instructions: fields
                .get("instructions")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        _ => None,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String field; numbers are rendered, anything else is empty.
fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// List of strings; a bare string becomes a one-element list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
