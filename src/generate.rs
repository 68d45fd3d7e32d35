//! Structured artifact generation.
//!
//! Turns free-form model output into schema-shaped records. Each artifact
//! kind (flashcard, quiz, lesson plan) declares a static [`FieldSpec`] list;
//! the prompt embeds machine-readable formatting instructions derived from
//! it, and the response is parsed back against it.
//!
//! One completion call per [`generate`] invocation — retry and skip policy
//! belong to the orchestration loops, not here. A response that cannot be
//! parsed yields [`GenerationError::MalformedResponse`]; fields the model
//! omitted are filled with empty defaults rather than failing.

use serde_json::{Map, Value};

use crate::completion::ChatModel;

/// One field of a structured response schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Error from a single structured generation call.
#[derive(Debug)]
pub enum GenerationError {
    /// The model's output could not be parsed against the schema.
    MalformedResponse(String),
    /// The completion capability itself failed (network, provider).
    Capability(anyhow::Error),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::MalformedResponse(reason) => {
                write!(f, "malformed model response: {}", reason)
            }
            GenerationError::Capability(e) => write!(f, "completion capability failed: {}", e),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Render the formatting instructions for `schema`: a fenced JSON snippet
/// with one commented line per field.
pub fn format_instructions(schema: &[FieldSpec]) -> String {
    let mut fields = String::new();
    for spec in schema {
        fields.push_str(&format!(
            "\t\"{}\": string  // {}\n",
            spec.name, spec.description
        ));
    }
    format!(
        "The output should be a markdown code snippet formatted in the following schema, \
         including the leading and trailing \"```json\" and \"```\":\n\n```json\n{{\n{}}}\n```",
        fields
    )
}

/// Run one structured generation call: prompt the model once and parse its
/// response against `schema`.
pub async fn generate(
    model: &dyn ChatModel,
    content: &str,
    instruction: &str,
    schema: &[FieldSpec],
) -> Result<Map<String, Value>, GenerationError> {
    let prompt = format!(
        "{}\n\nContent:\n{}\n\n{}",
        instruction,
        content,
        format_instructions(schema)
    );
    let response = model
        .complete(&prompt)
        .await
        .map_err(GenerationError::Capability)?;
    parse_structured(&response, schema)
}

/// Parse a model response against `schema`.
///
/// Every schema field is present in the result; fields missing from the
/// response become empty strings.
pub fn parse_structured(
    response: &str,
    schema: &[FieldSpec],
) -> Result<Map<String, Value>, GenerationError> {
    let body = extract_json_payload(response).ok_or_else(|| {
        GenerationError::MalformedResponse("no JSON object found in response".to_string())
    })?;

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| GenerationError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let object = value.as_object().ok_or_else(|| {
        GenerationError::MalformedResponse("top-level JSON is not an object".to_string())
    })?;

    let mut record = Map::new();
    for spec in schema {
        let field = object
            .get(spec.name)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        record.insert(spec.name.to_string(), field);
    }
    Ok(record)
}

/// Locate the JSON payload in a response: prefer a closed ```json fence,
/// fall back to the outermost brace pair.
fn extract_json_payload(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last > first {
        Some(text[first..=last].to_string())
    } else {
        None
    }
}

/// Read a string field from a parsed record, flattening non-strings to text.
pub fn field_str(record: &Map<String, Value>, name: &str) -> String {
    match record.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Read a list-of-strings field; a bare non-empty string becomes a
/// one-element list.
pub fn field_list(record: &Map<String, Value>, name: &str) -> Vec<String> {
    match record.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
