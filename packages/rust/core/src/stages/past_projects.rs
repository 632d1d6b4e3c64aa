use proposalgen_reference::ProjectCatalogue;
use proposalgen_shared::{FieldKey, FieldValue, PastProjects};
use serde_json::Value;

use super::{Stage, StageContext, StageError, field_object};
use crate::completion::Completion;

/// Most references a proposal cites.
pub const MAX_PAST_PROJECTS: usize = 5;

/// Similar past work, chosen only from the catalogue.
pub struct PastProjectsStage;

impl PastProjectsStage {
    /// Drop references the catalogue cannot match and cap the list.
    pub fn coerce(projects: PastProjects, catalogue: &ProjectCatalogue) -> PastProjects {
        let mut kept = Vec::new();
        for reference in projects.past_projects {
            if kept.len() == MAX_PAST_PROJECTS {
                break;
            }
            if catalogue.find(&reference.project_name).is_some() {
                kept.push(reference);
            }
        }
        PastProjects { past_projects: kept }
    }
}

impl Stage for PastProjectsStage {
    fn key(&self) -> FieldKey {
        FieldKey::PastProjects
    }

    fn reads(&self) -> &'static [FieldKey] {
        &[FieldKey::BasicInfo, FieldKey::Scope]
    }

    fn guidance(&self, ctx: &StageContext<'_>) -> String {
        format!(
            r#"Extract similar past projects from the input text and format it as a JSON object with the following structure:

{{
  "PAST_PROJECTS": [
    {{
      "PROJECT_NAME": "string"
    }}
  ]
}}

Important extraction guidelines:
- Pick 3-{MAX_PAST_PROJECTS} previous projects that are most similar to the current project based on its description.
- Choose from these available projects only: {}
- Consider similarities in project type, technology used, or client sector.
- If no similar projects are found, return an empty array."#,
            ctx.reference.projects.names().join(", ")
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let obj = field_object(completion, self.key())?;
        let projects: PastProjects = serde_json::from_value(Value::Object(obj))
            .map_err(|e| StageError::Shape(e.to_string()))?;
        Ok(FieldValue::PastProjects(Self::coerce(
            projects,
            &ctx.reference.projects,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_reference::{ProjectEntry, ReferenceData};
    use serde_json::json;

    fn reference() -> ReferenceData {
        let entries = ["Knowledge Hub", "CFIGS", "Legal Intake", "Tender Bot", "Ops Copilot", "HR Helper"]
            .iter()
            .map(|n| ProjectEntry {
                name: n.to_string(),
                description: format!("{n} description"),
                proposal: None,
            })
            .collect();
        ReferenceData {
            projects: ProjectCatalogue::new(entries),
            ..ReferenceData::default()
        }
    }

    fn run(value: serde_json::Value) -> Vec<String> {
        let reference = reference();
        let ctx = StageContext {
            reference: &reference,
        };
        match PastProjectsStage
            .interpret(Completion::Json(value), &ctx)
            .unwrap()
        {
            FieldValue::PastProjects(p) => {
                p.past_projects.into_iter().map(|r| r.project_name).collect()
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unmatched_references_are_dropped() {
        let names = run(json!({"PAST_PROJECTS": [
            {"PROJECT_NAME": "Knowledge Hub Chatbot"},
            {"PROJECT_NAME": "Warehouse Robots"}
        ]}));
        assert_eq!(names, ["Knowledge Hub Chatbot"]);
    }

    #[test]
    fn list_is_capped() {
        let names = run(json!({"PAST_PROJECTS": [
            "Knowledge Hub", "CFIGS", "Legal Intake", "Tender Bot", "Ops Copilot", "HR Helper"
        ]}));
        assert_eq!(names.len(), MAX_PAST_PROJECTS);
        assert_eq!(names[4], "Ops Copilot");
    }

    #[test]
    fn guidance_lists_catalogue_names() {
        let reference = reference();
        let text = PastProjectsStage.guidance(&StageContext {
            reference: &reference,
        });
        assert!(text.contains("Knowledge Hub, CFIGS, Legal Intake"));
    }
}
