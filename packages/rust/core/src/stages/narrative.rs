use proposalgen_shared::{FieldKey, FieldValue, NOT_SPECIFIED, or_not_specified};
use serde_json::Value;

use super::{LOCALE_GUIDELINE, Stage, StageContext, StageError, keyed_value};
use crate::completion::{Completion, OutputMode};

/// A prose field: PLAN (free text), SCOPE or CONTRACT_STRUCTURE (JSON string).
pub struct NarrativeStage {
    key: FieldKey,
    reads: &'static [FieldKey],
    mode: OutputMode,
    guidance: &'static str,
}

impl NarrativeStage {
    pub fn plan() -> Self {
        Self {
            key: FieldKey::Plan,
            reads: &[FieldKey::BasicInfo],
            mode: OutputMode::Text,
            guidance: PLAN_GUIDANCE,
        }
    }

    pub fn scope() -> Self {
        Self {
            key: FieldKey::Scope,
            reads: &[FieldKey::BasicInfo, FieldKey::Plan],
            mode: OutputMode::Json,
            guidance: SCOPE_GUIDANCE,
        }
    }

    pub fn contract_structure() -> Self {
        Self {
            key: FieldKey::ContractStructure,
            reads: &[FieldKey::BasicInfo, FieldKey::Scope],
            mode: OutputMode::Json,
            guidance: CONTRACT_GUIDANCE,
        }
    }

    fn wrap(&self, text: String) -> FieldValue {
        let text = or_not_specified(text);
        match self.key {
            FieldKey::Plan => FieldValue::Plan(text),
            FieldKey::Scope => FieldValue::Scope(text),
            _ => FieldValue::ContractStructure(text),
        }
    }
}

impl Stage for NarrativeStage {
    fn key(&self) -> FieldKey {
        self.key
    }

    fn reads(&self) -> &'static [FieldKey] {
        self.reads
    }

    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn guidance(&self, _ctx: &StageContext<'_>) -> String {
        format!(
            "{}\n- If no relevant information is found, return \"{NOT_SPECIFIED}\" by itself.\n{LOCALE_GUIDELINE}",
            self.guidance.trim_end()
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        _ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let text = match (self.mode, completion) {
            (OutputMode::Text, Completion::Text(text)) => text,
            (OutputMode::Text, Completion::Json(Value::String(text))) => text,
            (OutputMode::Text, Completion::Json(other)) => other.to_string(),
            (OutputMode::Json, completion) => match keyed_value(completion, self.key)? {
                Value::String(text) => text,
                Value::Null => String::new(),
                Value::Array(parts) => parts
                    .into_iter()
                    .map(|p| match p {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                other => {
                    return Err(StageError::Shape(format!(
                        "{} should be a string, got {other}",
                        self.key
                    )));
                }
            },
        };
        Ok(self.wrap(text))
    }
}

const PLAN_GUIDANCE: &str = "\
Generate the PLAN section for a proposal document prepared by an AI consulting company, using the provided meeting notes and information. Output only the plan as plain text.

Guidelines:
- Only output the project plan. Do not include timeline, budget, deliverables, or any extra commentary.
- Use plain text, no markdown formatting. Do not include a title.
- Structure the plan into clearly titled sections (e.g. Frontend, Backend, Hosting, AI Integration) if relevant.
- Within each section, use lines starting with \"- \" for points, indented for sub-points.
- Be specific about tasks, technologies and approaches given in the input text, but keep points short and easy to read.
- Keep language simple and focused on outcomes, readable by non-technical stakeholders.
- Do not invent or infer information that is not in the input.
- Only look at the plan section of the example proposals provided, ignore all other sections.
- Do not include content already covered in other parts of the proposal (scope, contract structure, key deliverables, assumptions, timeline, budget, delivery team, past projects).";

const SCOPE_GUIDANCE: &str = r#"Extract the project scope information from the input text and format it as a JSON object with the following structure:

{
  "SCOPE": "string"
}

Important extraction guidelines:
- Do not infer data, only use what is given in the text.
- If relevant information is found, structure it in two short paragraphs:
   - Paragraph 1: what this project is creating, using which AI models and how.
   - Paragraph 2: the consultancy's role in the project.
- Use similar sentence structure and total length to the example proposals."#;

const CONTRACT_GUIDANCE: &str = r#"Extract the contract structure information from the input text and format it as a JSON object with the following structure:

{
  "CONTRACT_STRUCTURE": "string"
}

Important extraction guidelines:
- Do not infer data, only use what is given in the text.
- If relevant information is found, structure it in three short paragraphs:
   - Paragraph 1: the contract type (for example a fixed fee cost).
   - Paragraph 2: when payment is due and how invoicing works.
   - Paragraph 3: what happens to intellectual property, and when handover happens once both parties agree the deliverables are met.
- Use similar sentence structure to the example proposals."#;
