use proposalgen_reference::{KNOWN_LEADS, resolve_lead};
use proposalgen_shared::{
    BasicInfo, BasicInfoField, FieldKey, FieldValue, NOT_SPECIFIED, is_specified,
    or_not_specified,
};
use serde_json::Value;

use super::{LOCALE_GUIDELINE, Stage, StageContext, StageError, field_object};
use crate::completion::Completion;

/// Cover-page facts: title, parties, leads, dates, one-line description.
pub struct BasicInfoStage;

impl BasicInfoStage {
    /// Blank values become the sentinel; leads outside the known set are dropped.
    pub fn coerce(mut info: BasicInfo) -> BasicInfo {
        for field in BasicInfoField::ALL {
            let value = or_not_specified(info.get(field));
            info.set(field, value);
        }
        for field in [BasicInfoField::Author, BasicInfoField::ProjectManager] {
            let value = info.get(field);
            let resolved = if is_specified(value) {
                resolve_lead(value).unwrap_or(NOT_SPECIFIED)
            } else {
                NOT_SPECIFIED
            };
            info.set(field, resolved);
        }
        info
    }
}

impl Stage for BasicInfoStage {
    fn key(&self) -> FieldKey {
        FieldKey::BasicInfo
    }

    fn reads(&self) -> &'static [FieldKey] {
        &[]
    }

    fn guidance(&self, _ctx: &StageContext<'_>) -> String {
        format!(
            r#"Extract basic project information from the input text and format it as a JSON object with the following structure:

{{
  "PROJECT TITLE": "string",
  "COMPANY NAME": "string",
  "CLIENT": "string",
  "PROJECT MANAGER": "string",
  "AUTHOR": "string",
  "START DATE": "string",
  "END DATE": "string",
  "PROJECT DESCRIPTION": "string"
}}

Important extraction guidelines:
- The title should not be lengthy, just a few words.
- For any field where information is not available in the input text, use "{NOT_SPECIFIED}".
- The author and project manager is either {}.
- Keep dates short.
- The project description should be a one sentence summary of the project.
{LOCALE_GUIDELINE}"#,
            KNOWN_LEADS.join(" or ")
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        _ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let obj = field_object(completion, self.key())?;
        let info: BasicInfo = serde_json::from_value(Value::Object(obj))
            .map_err(|e| StageError::Shape(e.to_string()))?;
        Ok(FieldValue::BasicInfo(Self::coerce(info)))
    }
}
