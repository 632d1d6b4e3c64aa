use proposalgen_shared::{Budget, FieldKey, FieldValue, or_not_specified};
use serde_json::Value;

use super::{Stage, StageContext, StageError, field_object};
use crate::budget::is_valid_cost_item;
use crate::completion::Completion;

/// Quoted total and additional cost line items.
pub struct BudgetStage;

impl Stage for BudgetStage {
    fn key(&self) -> FieldKey {
        FieldKey::Budget
    }

    fn reads(&self) -> &'static [FieldKey] {
        &[FieldKey::BasicInfo, FieldKey::Timeline]
    }

    fn guidance(&self, _ctx: &StageContext<'_>) -> String {
        r#"Extract the budget information from the input text and format it as a JSON object with the following structure:

{
  "TOTAL_COST": "string",
  "ADDITIONAL_COST": [
    {
      "CATEGORY": "string",
      "TIME": "",
      "DAY_RATE": "",
      "COST": "string"
    }
  ]
}

Important extraction guidelines:
- Extract the total cost of the project if mentioned.
- If any additional costs are explicitly mentioned (hosting, licences, hardware), extract each with a category and a numeric cost. TIME and DAY_RATE are empty strings.
- If no additional costs are found, return an empty array."#
            .to_string()
    }

    fn interpret(
        &self,
        completion: Completion,
        _ctx: &StageContext<'_>,
    ) -> Result<FieldValue, StageError> {
        let obj = field_object(completion, self.key())?;
        let mut budget: Budget = serde_json::from_value(Value::Object(obj))
            .map_err(|e| StageError::Shape(e.to_string()))?;
        budget.total_cost = or_not_specified(budget.total_cost);
        budget.additional_cost.retain(is_valid_cost_item);
        Ok(FieldValue::Budget(budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_reference::ReferenceData;
    use proposalgen_shared::NOT_SPECIFIED;
    use serde_json::json;

    #[test]
    fn invalid_items_are_dropped() {
        let reference = ReferenceData::default();
        let ctx = StageContext {
            reference: &reference,
        };
        let value = BudgetStage
            .interpret(
                Completion::Json(json!({
                    "TOTAL_COST": "",
                    "ADDITIONAL_COST": [
                        {"CATEGORY": "Hosting", "COST": "$40"},
                        {"CATEGORY": "Licences", "COST": "TBC"},
                        {"CATEGORY": "", "COST": "100"},
                        {"CATEGORY": "Hardware", "AMOUNT": 900}
                    ]
                })),
                &ctx,
            )
            .unwrap();

        let FieldValue::Budget(budget) = value else {
            panic!("expected budget");
        };
        assert_eq!(budget.total_cost, NOT_SPECIFIED);
        let categories: Vec<_> = budget
            .additional_cost
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(categories, ["Hosting", "Hardware"]);
        assert_eq!(budget.additional_cost[1].cost, "900");
    }
}
