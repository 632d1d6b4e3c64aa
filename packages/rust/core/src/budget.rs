//! Budget derivation: developer effort, extra cost items, total and tax.

use proposalgen_shared::{Budget, CostItem};

use crate::duration::{days_or_minimum, format_days};

/// Column headers of the budget table.
pub const BUDGET_HEADERS: [&str; 4] = ["Category", "Time (Days)", "Day Rate", "Cost ($)"];

/// Parse a money amount such as "250", "$1,200.50" or "1200 AUD".
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a cost item carries both a category and a numeric amount.
pub fn is_valid_cost_item(item: &CostItem) -> bool {
    !item.category.trim().is_empty() && parse_amount(&item.cost).is_some()
}

/// Two-decimal money rendering.
pub fn format_money(value: f64) -> String {
    format!("{value:.2}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computed budget figures for one proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub days: f64,
    pub day_rate: f64,
    pub effort: f64,
    /// Valid additional items as `(category, amount)`.
    pub extras: Vec<(String, f64)>,
    pub total: f64,
    pub tax_rate: f64,
    pub total_with_tax: f64,
}

impl BudgetSummary {
    /// Derive the budget from the timeline's total duration and the extracted items.
    pub fn compute(total_duration: &str, budget: &Budget, day_rate: f64, tax_rate: f64) -> Self {
        let days = days_or_minimum(total_duration);
        let effort = days * day_rate;
        let extras: Vec<(String, f64)> = budget
            .additional_cost
            .iter()
            .filter_map(|item| {
                let category = item.category.trim();
                let amount = parse_amount(&item.cost)?;
                (!category.is_empty()).then(|| (category.to_string(), amount))
            })
            .collect();
        let total = effort + extras.iter().map(|(_, amount)| amount).sum::<f64>();

        Self {
            days,
            day_rate,
            effort,
            extras,
            total,
            tax_rate,
            total_with_tax: round2(total * (1.0 + tax_rate)),
        }
    }

    /// Label of the tax row, e.g. "+ 10% GST".
    pub fn tax_label(&self) -> String {
        let percent = self.tax_rate * 100.0;
        format!("+ {}% GST", format_days(round2(percent)))
    }

    /// Table rows in display order.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec![
            "Developer Effort".to_string(),
            format_days(self.days),
            format_money(self.day_rate),
            format_money(self.effort),
        ]];
        for (category, amount) in &self.extras {
            rows.push(vec![
                category.clone(),
                String::new(),
                String::new(),
                format_money(*amount),
            ]);
        }
        rows.push(vec![
            String::new(),
            String::new(),
            "Total Cost".to_string(),
            format_money(self.total),
        ]);
        rows.push(vec![
            String::new(),
            String::new(),
            self.tax_label(),
            format_money(self.total_with_tax),
        ]);
        rows
    }
}
