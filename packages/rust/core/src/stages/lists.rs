use proposalgen_shared::{FieldKey, FieldValue, NOT_SPECIFIED, is_specified};
use serde_json::Value;

use super::{LOCALE_GUIDELINE, Stage, StageContext, StageError, keyed_value};
use crate::completion::Completion;

/// A short-list field: KEY_DELIVERABLES or ASSUMPTIONS.
pub struct ListStage {
    key: FieldKey,
    reads: &'static [FieldKey],
    guidance: &'static str,
}

impl ListStage {
    pub fn key_deliverables() -> Self {
        Self {
            key: FieldKey::KeyDeliverables,
            reads: &[FieldKey::BasicInfo, FieldKey::Plan, FieldKey::Scope],
            guidance: DELIVERABLES_GUIDANCE,
        }
    }

    pub fn assumptions() -> Self {
        Self {
            key: FieldKey::Assumptions,
            reads: &[
                FieldKey::BasicInfo,
                FieldKey::Plan,
                FieldKey::Scope,
                FieldKey::KeyDeliverables,
            ],
            guidance: ASSUMPTIONS_GUIDANCE,
        }
    }
}

/// Trim items, drop blanks and sentinels; an empty result is `["Not specified"]`.
pub(crate) fn clean_items(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| is_specified(s))
        .collect();
    if cleaned.is_empty() {
        vec![NOT_SPECIFIED.to_string()]
    } else {
        cleaned
    }
}

impl Stage for ListStage {
    fn key(&self) -> FieldKey {
        self.key
    }

    fn reads(&self) -> &'static [FieldKey] {
        self.reads
    }

    fn guidance(&self, _ctx: &StageContext<'_>) -> String {
        format!(
            "Extract the {label} from the input text and format it as a JSON object with the following structure:\n\n\
             {{\n  \"{key}\": [\"string\"]\n}}\n\n\
             Guidelines:\n{body}\n\
             - Each item must be a short, clear sentence or phrase.\n\
             - If none are mentioned in the text, return: {{ \"{key}\": [\"{NOT_SPECIFIED}\"] }}\n\
             {LOCALE_GUIDELINE}",
            label = self.key.as_str().replace('_', " ").to_lowercase(),
            key = self.key,
            body = self.guidance.trim_end(),
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        _ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let items: Vec<String> = match keyed_value(completion, self.key)? {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect(),
            Value::String(single) => vec![single],
            Value::Null => Vec::new(),
            other => {
                return Err(StageError::Shape(format!(
                    "{} should be a list, got {other}",
                    self.key
                )));
            }
        };

        let items = clean_items(items);
        Ok(match self.key {
            FieldKey::KeyDeliverables => FieldValue::KeyDeliverables(items),
            _ => FieldValue::Assumptions(items),
        })
    }
}

const DELIVERABLES_GUIDANCE: &str = "\
- A key deliverable is a tangible output the consultancy commits to deliver to the client.
- Only include final outputs handed over to the client, presented in a report, or considered a completed product (e.g. MVP application, feasibility report, training session).
- There should be around 3-5 key deliverables; adjust for the project size.";

const ASSUMPTIONS_GUIDANCE: &str = "\
- An assumption is a condition believed to be true for the project to succeed, but which is not confirmed or controlled by the project team: external dependencies, client responsibilities, or preconditions the team cannot guarantee.
- Only include unverified conditions that affect feasibility, planning or delivery.
- Examples: the client will provide API keys, data or system access; the hosting environment is set up and accessible; stakeholders will be available for scheduled meetings.
- Aim for around 3-5 assumptions.";

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_reference::ReferenceData;
    use serde_json::json;

    fn run(stage: &ListStage, value: Value) -> Result<FieldValue, StageError> {
        let reference = ReferenceData::default();
        stage.interpret(
            Completion::Json(value),
            &StageContext {
                reference: &reference,
            },
        )
    }

    #[test]
    fn blank_items_are_dropped() {
        let value = run(
            &ListStage::key_deliverables(),
            json!({"KEY_DELIVERABLES": ["MVP chatbot", "  ", "Handover session", null]}),
        );
        assert_eq!(
            value.unwrap(),
            FieldValue::KeyDeliverables(vec!["MVP chatbot".into(), "Handover session".into()])
        );
    }

    #[test]
    fn empty_list_becomes_sentinel() {
        let value = run(&ListStage::assumptions(), json!({"ASSUMPTIONS": []}));
        assert_eq!(
            value.unwrap(),
            FieldValue::Assumptions(vec![NOT_SPECIFIED.into()])
        );
    }

    #[test]
    fn single_string_is_accepted() {
        let value = run(
            &ListStage::assumptions(),
            json!({"ASSUMPTIONS": "Client provides data access"}),
        );
        assert_eq!(
            value.unwrap(),
            FieldValue::Assumptions(vec!["Client provides data access".into()])
        );
    }

    #[test]
    fn guidance_names_the_key() {
        let reference = ReferenceData::default();
        let text = ListStage::key_deliverables().guidance(&StageContext {
            reference: &reference,
        });
        assert!(text.contains("\"KEY_DELIVERABLES\": [\"string\"]"));
        assert!(text.contains("key deliverables"));
    }
}
