use proposalgen_shared::{FieldKey, FieldValue, NOT_SPECIFIED, Timeline, is_specified};
use serde_json::Value;

use super::{LOCALE_GUIDELINE, Stage, StageContext, StageError, field_object};
use crate::completion::Completion;
use crate::duration::{format_days, parse_duration};

/// Milestones with day estimates, plus their total.
pub struct TimelineStage;

impl TimelineStage {
    /// Drop undescribed milestones; the total is the sum of the estimates
    /// whenever every estimate parses.
    pub fn coerce(mut timeline: Timeline) -> Timeline {
        timeline
            .milestones
            .retain(|m| !m.description.trim().is_empty());
        for milestone in &mut timeline.milestones {
            milestone.description = milestone.description.trim().to_string();
            milestone.estimated_time = milestone.estimated_time.trim().to_string();
        }

        if !timeline.milestones.is_empty() {
            let estimates: Option<Vec<f64>> = timeline
                .milestones
                .iter()
                .map(|m| parse_duration(&m.estimated_time).map(|d| d.value))
                .collect();
            if let Some(estimates) = estimates {
                timeline.total_duration = format_days(estimates.iter().sum());
            }
        }

        if !is_specified(&timeline.total_duration) {
            timeline.total_duration = NOT_SPECIFIED.to_string();
        }
        timeline
    }
}

impl Stage for TimelineStage {
    fn key(&self) -> FieldKey {
        FieldKey::Timeline
    }

    fn reads(&self) -> &'static [FieldKey] {
        &[FieldKey::BasicInfo, FieldKey::Plan, FieldKey::KeyDeliverables]
    }

    fn guidance(&self, _ctx: &StageContext<'_>) -> String {
        format!(
            r#"Extract the timeline information from the input text and format it as a JSON object with the following structure:

{{
  "TOTAL_DURATION": "string",
  "MILESTONES": [
    {{
      "DESCRIPTION": "string",
      "ESTIMATED_TIME": "string"
    }}
  ]
}}

Important extraction guidelines:
- Extract 2-5 major milestones or tasks based directly on the input text. Each must be a distinct phase or deliverable the team is responsible for.
- Use short milestone descriptions (max 6 words) in the project's own language.
- ESTIMATED_TIME must be a whole number string giving the duration in working days. Do not include "days" or decimals.
- Use explicit durations if provided.
- If durations are not provided, assign realistic defaults by task type:
  - Simple or one-time tasks: 1-2 days
  - Design/development stages: 3-5 days
  - Testing, deployment or reviews: 2-3 days
- For long multi-phase projects, base durations on context but keep them proportional.
- TOTAL_DURATION is the sum of all ESTIMATED_TIME values, as a string.
{LOCALE_GUIDELINE}"#
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        _ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let obj = field_object(completion, self.key())?;
        let timeline: Timeline = serde_json::from_value(Value::Object(obj))
            .map_err(|e| StageError::Shape(e.to_string()))?;
        Ok(FieldValue::Timeline(Self::coerce(timeline)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_reference::ReferenceData;
    use serde_json::json;

    fn run(value: Value) -> Timeline {
        let reference = ReferenceData::default();
        let ctx = StageContext {
            reference: &reference,
        };
        match TimelineStage.interpret(Completion::Json(value), &ctx).unwrap() {
            FieldValue::Timeline(t) => t,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn total_is_summed_when_missing() {
        let timeline = run(json!({
            "MILESTONES": [
                {"DESCRIPTION": "Design", "ESTIMATED_TIME": "3"},
                {"DESCRIPTION": "Build", "ESTIMATED_TIME": "5 days"},
                {"DESCRIPTION": "Deploy", "ESTIMATED_TIME": 2}
            ]
        }));
        assert_eq!(timeline.total_duration, "10");
        assert_eq!(timeline.milestones[1].estimated_time, "5 days");
    }

    #[test]
    fn mismatched_total_is_replaced_by_milestone_sum() {
        let timeline = run(json!({
            "TOTAL_DURATION": "12",
            "MILESTONES": [
                {"DESCRIPTION": "Design", "ESTIMATED_TIME": "2"},
                {"DESCRIPTION": "Build", "ESTIMATED_TIME": "3"}
            ]
        }));
        assert_eq!(timeline.total_duration, "5");
    }

    #[test]
    fn stated_total_is_kept_when_an_estimate_is_unparsable() {
        let timeline = run(json!({
            "TOTAL_DURATION": "12",
            "MILESTONES": [
                {"DESCRIPTION": "Design", "ESTIMATED_TIME": "2"},
                {"DESCRIPTION": "Build", "ESTIMATED_TIME": "TBC"}
            ]
        }));
        assert_eq!(timeline.total_duration, "12");
    }

    #[test]
    fn undescribed_milestones_are_dropped() {
        let timeline = run(json!({
            "TOTAL_DURATION": "abc",
            "MILESTONES": [
                {"DESCRIPTION": "", "ESTIMATED_TIME": "4"},
                {"DESCRIPTION": "Review", "ESTIMATED_TIME": "2"}
            ]
        }));
        assert_eq!(timeline.milestones.len(), 1);
        assert_eq!(timeline.total_duration, "2");
    }

    #[test]
    fn unparsable_estimate_keeps_total() {
        let timeline = run(json!({
            "TOTAL_DURATION": "",
            "MILESTONES": [{"DESCRIPTION": "Build", "ESTIMATED_TIME": "TBC"}]
        }));
        assert_eq!(timeline.total_duration, NOT_SPECIFIED);
        assert_eq!(timeline.milestones[0].estimated_time, "TBC");
    }
}
