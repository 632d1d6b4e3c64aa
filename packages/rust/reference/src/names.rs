//! Person-name normalization and the alias table.

/// Names accepted as proposal author / project manager.
pub const KNOWN_LEADS: [&str; 2] = ["Samuel Cunningham", "Sean Oldenburger"];

/// Team used when no roster member is mentioned in the source text.
pub const DEFAULT_TEAM: [&str; 2] = ["Samuel Cunningham", "Sean Oldenburger"];

/// Short or partial names mapped to canonical full names.
/// Keys are matched after [`normalize`].
const ALIASES: &[(&str, &str)] = &[
    ("Sam", "Samuel Cunningham"),
    ("Sam Cunningham:", "Samuel Cunningham"),
    ("Samuel", "Samuel Cunningham"),
    ("Sean", "Sean Oldenburger"),
    ("Lindsey", "Lindsey Hershman"),
];

/// Lowercase, trim, collapse inner whitespace and strip trailing punctuation.
pub fn normalize(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase()
}

/// Resolve `name` through the alias table. Returns `None` when no alias applies.
pub fn resolve_alias(name: &str) -> Option<&'static str> {
    let key = normalize(name);
    if key.is_empty() {
        return None;
    }
    ALIASES
        .iter()
        .find(|(alias, _)| normalize(alias) == key)
        .map(|(_, full)| *full)
}

/// Every canonical name reachable through the alias table, in table order.
pub fn alias_targets() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for (_, full) in ALIASES {
        if !out.contains(full) {
            out.push(full);
        }
    }
    out
}

/// Canonicalize an author / project-manager value against [`KNOWN_LEADS`].
pub fn resolve_lead(name: &str) -> Option<&'static str> {
    let key = normalize(name);
    if let Some(full) = resolve_alias(name) {
        return KNOWN_LEADS.iter().copied().find(|lead| *lead == full);
    }
    KNOWN_LEADS
        .iter()
        .copied()
        .find(|lead| normalize(lead) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_space_and_punctuation() {
        assert_eq!(normalize("  Sam Cunningham: "), "sam cunningham");
        assert_eq!(normalize("SEAN."), "sean");
        assert_eq!(normalize("Lindsey\t Hershman"), "lindsey hershman");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(resolve_alias("sam"), Some("Samuel Cunningham"));
        assert_eq!(resolve_alias("Sam Cunningham"), Some("Samuel Cunningham"));
        assert_eq!(resolve_alias("Samuel!"), Some("Samuel Cunningham"));
        assert_eq!(resolve_alias("Lindsey"), Some("Lindsey Hershman"));
        assert_eq!(resolve_alias("Samuel Cunningham"), None);
        assert_eq!(resolve_alias("Greg"), None);
    }

    #[test]
    fn leads_are_a_closed_set() {
        assert_eq!(resolve_lead("Sean"), Some("Sean Oldenburger"));
        assert_eq!(resolve_lead("samuel cunningham"), Some("Samuel Cunningham"));
        assert_eq!(resolve_lead("Lindsey"), None);
        assert_eq!(resolve_lead("Jane Doe"), None);
        assert_eq!(resolve_lead(""), None);
    }

    #[test]
    fn alias_targets_are_unique() {
        assert_eq!(
            alias_targets(),
            vec!["Samuel Cunningham", "Sean Oldenburger", "Lindsey Hershman"]
        );
    }
}
