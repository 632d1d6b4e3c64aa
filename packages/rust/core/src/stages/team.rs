use proposalgen_reference::{DEFAULT_TEAM, Roster};
use proposalgen_shared::{DeliveryTeam, FieldKey, FieldValue, TeamMember};
use serde_json::Value;

use super::{Stage, StageContext, StageError, field_object};
use crate::completion::Completion;

/// Named delivery-team members, restricted to the roster.
pub struct DeliveryTeamStage;

impl DeliveryTeamStage {
    /// Canonicalize, keep roster names only, de-duplicate; empty becomes the default team.
    pub fn coerce(team: DeliveryTeam, roster: &Roster) -> DeliveryTeam {
        let allowed = roster.allowed_names();
        let mut names: Vec<String> = Vec::new();
        for member in team.team_members {
            let canonical = roster.canonicalize(&member.name);
            if allowed.contains(&canonical) && !names.contains(&canonical) {
                names.push(canonical);
            }
        }
        if names.is_empty() {
            return default_team();
        }
        DeliveryTeam {
            team_members: names.into_iter().map(TeamMember::new).collect(),
        }
    }
}

fn default_team() -> DeliveryTeam {
    DeliveryTeam {
        team_members: DEFAULT_TEAM.iter().map(|n| TeamMember::new(*n)).collect(),
    }
}

impl Stage for DeliveryTeamStage {
    fn key(&self) -> FieldKey {
        FieldKey::DeliveryTeam
    }

    fn reads(&self) -> &'static [FieldKey] {
        &[FieldKey::BasicInfo]
    }

    fn guidance(&self, ctx: &StageContext<'_>) -> String {
        let roster = ctx
            .reference
            .roster
            .allowed_names()
            .iter()
            .map(|n| format!("  * {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"Extract the delivery team information from the input text and format it as a JSON object with the following structure:

{{
  "TEAM_MEMBERS": [
    {{
      "NAME": "string"
    }}
  ]
}}

Important extraction guidelines:
- Only look for these team members by name; if one of them is mentioned, output them:
{roster}
- Match full names or first names (e.g. Sam or Samuel, Sean).
- If no team members are found, use {} as the default team members."#,
            DEFAULT_TEAM.join(" and ")
        )
    }

    fn interpret(
        &self,
        completion: Completion,
        ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let obj = field_object(completion, self.key())?;
        let team: DeliveryTeam = serde_json::from_value(Value::Object(obj))
            .map_err(|e| StageError::Shape(e.to_string()))?;
        Ok(FieldValue::DeliveryTeam(Self::coerce(
            team,
            &ctx.reference.roster,
        )))
    }

    fn fallback(&self, _ctx: &StageContext<'_>) -> FieldValue {
        FieldValue::DeliveryTeam(default_team())
    }
}
