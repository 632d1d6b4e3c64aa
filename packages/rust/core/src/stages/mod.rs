//! Extraction stages: one per top-level project field.
//!
//! Each stage owns its guidance text, the fields it may see as context
//! (its read-set), the output mode it requests, and the boundary coercion
//! that turns a raw completion into a typed [`FieldValue`].

mod basic_info;
mod costs;
mod lists;
mod narrative;
mod past_projects;
mod prompt;
mod team;
mod timeline;

use proposalgen_reference::ReferenceData;
use proposalgen_shared::{FieldKey, FieldValue};
use serde_json::Value;

use crate::completion::{Completion, CompletionError, OutputMode, parse_json_content};

pub use basic_info::BasicInfoStage;
pub use costs::BudgetStage;
pub use lists::ListStage;
pub use narrative::NarrativeStage;
pub use past_projects::PastProjectsStage;
pub use prompt::build_messages;
pub use team::DeliveryTeamStage;
pub use timeline::TimelineStage;

/// Guideline appended to every stage's instructions.
pub(crate) const LOCALE_GUIDELINE: &str = "- Use Australian English spelling and grammar.";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read-only inputs shared by every stage.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub reference: &'a ReferenceData,
}

/// Why a stage could not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// One extraction step producing exactly one top-level field.
pub trait Stage: Send + Sync {
    /// Field this stage writes.
    fn key(&self) -> FieldKey;

    /// Fields this stage may see as prompt context.
    fn reads(&self) -> &'static [FieldKey];

    fn output_mode(&self) -> OutputMode {
        OutputMode::Json
    }

    /// Schema description and extraction rules (the system prompt body).
    fn guidance(&self, ctx: &StageContext<'_>) -> String;

    /// Coerce a completion into this stage's field value.
    fn interpret(
        &self,
        completion: Completion,
        ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError>;

    /// Value written when the completion fails or cannot be interpreted.
    fn fallback(&self, _ctx: &StageContext<'_>) -> FieldValue {
        FieldValue::default_for(self.key())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds the stages in execution order.
pub struct StageRegistry {
    stages: Vec<Box<dyn Stage>>,
}

impl StageRegistry {
    /// All ten built-in stages in extraction order.
    pub fn new() -> Self {
        Self {
            stages: vec![
                Box::new(BasicInfoStage),
                Box::new(NarrativeStage::plan()),
                Box::new(NarrativeStage::scope()),
                Box::new(NarrativeStage::contract_structure()),
                Box::new(ListStage::key_deliverables()),
                Box::new(ListStage::assumptions()),
                Box::new(TimelineStage),
                Box::new(BudgetStage),
                Box::new(DeliveryTeamStage),
                Box::new(PastProjectsStage),
            ],
        }
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    pub fn get(&self, key: FieldKey) -> Option<&dyn Stage> {
        self.stages
            .iter()
            .find(|s| s.key() == key)
            .map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Completion helpers
// ---------------------------------------------------------------------------

/// The completion as a JSON value; text output is parsed.
pub(crate) fn into_json(completion: Completion) -> Result<Value, StageError> {
    match completion {
        Completion::Json(value) => Ok(value),
        Completion::Text(text) => Ok(parse_json_content(&text)?),
    }
}

/// The JSON object for an object-shaped field. A lone `{"<KEY>": {...}}`
/// wrapper is unwrapped.
pub(crate) fn field_object(
    completion: Completion,
    key: FieldKey,
) -> Result<serde_json::Map<String, Value>, StageError> {
    match into_json(completion)? {
        Value::Object(mut map) => {
            if map.len() == 1 && matches!(map.get(key.as_str()), Some(Value::Object(_))) {
                if let Some(Value::Object(inner)) = map.remove(key.as_str()) {
                    return Ok(inner);
                }
            }
            Ok(map)
        }
        other => Err(StageError::Shape(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// The value under `key` inside the response object.
pub(crate) fn keyed_value(completion: Completion, key: FieldKey) -> Result<Value, StageError> {
    match into_json(completion)? {
        Value::Object(mut map) => map
            .remove(key.as_str())
            .ok_or_else(|| StageError::Shape(format!("missing {key}"))),
        other => Err(StageError::Shape(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_runs_every_field_in_order() {
        let registry = StageRegistry::new();
        let keys: Vec<FieldKey> = registry.stages().iter().map(|s| s.key()).collect();
        assert_eq!(keys, FieldKey::ALL);
    }

    #[test]
    fn read_sets_only_reference_earlier_stages() {
        let registry = StageRegistry::new();
        for stage in registry.stages() {
            for read in stage.reads() {
                assert!(
                    read.position() < stage.key().position(),
                    "{} reads {} which runs later",
                    stage.key(),
                    read
                );
            }
        }
    }

    #[test]
    fn declared_read_sets() {
        let registry = StageRegistry::new();
        let reads = |k| registry.get(k).unwrap().reads().to_vec();
        assert!(reads(FieldKey::BasicInfo).is_empty());
        assert_eq!(reads(FieldKey::Plan), [FieldKey::BasicInfo]);
        assert_eq!(
            reads(FieldKey::Assumptions),
            [
                FieldKey::BasicInfo,
                FieldKey::Plan,
                FieldKey::Scope,
                FieldKey::KeyDeliverables
            ]
        );
        assert_eq!(reads(FieldKey::Budget), [FieldKey::BasicInfo, FieldKey::Timeline]);
        assert_eq!(reads(FieldKey::PastProjects), [FieldKey::BasicInfo, FieldKey::Scope]);
    }

    #[test]
    fn only_plan_requests_free_text() {
        let registry = StageRegistry::new();
        for stage in registry.stages() {
            let expected = if stage.key() == FieldKey::Plan {
                OutputMode::Text
            } else {
                OutputMode::Json
            };
            assert_eq!(stage.output_mode(), expected, "{}", stage.key());
        }
    }

    #[test]
    fn field_object_unwraps_single_key_wrapper() {
        let wrapped = Completion::Json(json!({"TIMELINE": {"TOTAL_DURATION": "3"}}));
        let obj = field_object(wrapped, FieldKey::Timeline).unwrap();
        assert_eq!(obj["TOTAL_DURATION"], "3");

        let text = Completion::Text(r#"{"TOTAL_DURATION": "4", "MILESTONES": []}"#.into());
        let obj = field_object(text, FieldKey::Timeline).unwrap();
        assert_eq!(obj["TOTAL_DURATION"], "4");

        assert!(field_object(Completion::Json(json!([1])), FieldKey::Timeline).is_err());
    }

    #[test]
    fn keyed_value_requires_key() {
        let ok = keyed_value(Completion::Json(json!({"SCOPE": "x"})), FieldKey::Scope).unwrap();
        assert_eq!(ok, json!("x"));
        assert!(keyed_value(Completion::Json(json!({})), FieldKey::Scope).is_err());
    }
}
