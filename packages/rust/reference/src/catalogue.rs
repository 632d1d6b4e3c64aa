//! Keyed catalogues loaded from the data directory.
//!
//! Each file is an object of `{"<name>": {...}}` entries under a single
//! top-level key. Entry order is file order.

use std::path::Path;

use proposalgen_shared::{ProposalError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::names::{alias_targets, normalize, resolve_alias};

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A delivery-team member.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    pub description: String,
    /// Image file name, relative to the images directory.
    pub image: Option<String>,
}

#[derive(Deserialize)]
struct RosterRecord {
    #[serde(rename = "DESCRIPTION", default)]
    description: String,
    #[serde(rename = "IMAGE", default)]
    image: Option<String>,
}

/// The team roster (`deliveryteam.json`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Parse `{"TEAM_MEMBERS": {...}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries = parse_keyed(json, "TEAM_MEMBERS", |name, r: RosterRecord| RosterEntry {
            name,
            description: r.description,
            image: r.image.filter(|i| !i.trim().is_empty()),
        })?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Exact canonical-name lookup.
    pub fn get(&self, name: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Canonical form of a mentioned name: alias table first, then a
    /// normalized match against roster names, else the trimmed input.
    pub fn canonicalize(&self, mention: &str) -> String {
        if let Some(full) = resolve_alias(mention) {
            return full.to_string();
        }
        let key = normalize(mention);
        self.entries
            .iter()
            .find(|e| normalize(&e.name) == key)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| mention.trim().to_string())
    }

    /// Names a team mention may resolve to: roster names plus alias targets.
    pub fn allowed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.name.clone()).collect();
        for target in alias_targets() {
            if !names.iter().any(|n| n == target) {
                names.push(target.to_string());
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Past projects
// ---------------------------------------------------------------------------

/// A past project that may be cited as similar work.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub proposal: Option<String>,
}

#[derive(Deserialize)]
struct ProjectRecord {
    #[serde(rename = "DESCRIPTION", default)]
    description: String,
    #[serde(rename = "PROPOSAL", default)]
    proposal: Option<String>,
}

/// The past-project catalogue (`pastprojects.json`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectCatalogue {
    entries: Vec<ProjectEntry>,
}

impl ProjectCatalogue {
    pub fn new(entries: Vec<ProjectEntry>) -> Self {
        Self { entries }
    }

    /// Parse `{"PROJECTS": {...}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries = parse_keyed(json, "PROJECTS", |name, r: ProjectRecord| ProjectEntry {
            name,
            description: r.description,
            proposal: r.proposal,
        })?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    pub fn entries(&self) -> &[ProjectEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match an extracted project name against the catalogue.
    ///
    /// Normalized exact match wins; otherwise the first entry (in file order)
    /// whose normalized name contains, or is contained in, the normalized
    /// query.
    pub fn find(&self, extracted: &str) -> Option<&ProjectEntry> {
        let query = normalize(extracted);
        if query.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| normalize(&e.name) == query)
            .or_else(|| {
                self.entries.iter().find(|e| {
                    let key = normalize(&e.name);
                    !key.is_empty() && (query.contains(&key) || key.contains(&query))
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Example proposals
// ---------------------------------------------------------------------------

/// A previously written proposal used as a style reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleProposal {
    pub name: String,
    pub proposal: String,
}

#[derive(Deserialize)]
struct ExampleRecord {
    #[serde(rename = "PROPOSAL", default)]
    proposal: Option<String>,
}

/// The example-proposal catalogue (`exampleproposals.json`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleCatalogue {
    entries: Vec<ExampleProposal>,
}

impl ExampleCatalogue {
    pub fn new(entries: Vec<ExampleProposal>) -> Self {
        Self { entries }
    }

    /// Parse `{"PROJECTS": {...}}`; entries without a proposal are skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries = parse_keyed(json, "PROJECTS", |name, r: ExampleRecord| {
            r.proposal.map(|proposal| ExampleProposal { name, proposal })
        })?
        .into_iter()
        .flatten()
        .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read(path)?)
    }

    pub fn entries(&self) -> &[ExampleProposal] {
        &self.entries
    }

    /// `Example <name>:\n<proposal>` blocks joined by blank lines.
    pub fn formatted(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("Example {}:\n{}", e.name, e.proposal))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ProposalError::io(path, e))
}

/// Decode `{ "<root>": { "<name>": <record>, ... } }` in file order.
fn parse_keyed<R, T>(json: &str, root: &str, build: impl Fn(String, R) -> T) -> Result<Vec<T>>
where
    R: DeserializeOwned,
{
    let mut doc: Map<String, Value> = serde_json::from_str(json)
        .map_err(|e| ProposalError::parse(format!("invalid catalogue JSON: {e}")))?;
    let Some(Value::Object(items)) = doc.remove(root) else {
        return Err(ProposalError::parse(format!(
            "catalogue is missing the '{root}' object"
        )));
    };

    items
        .into_iter()
        .map(|(name, value)| {
            let record: R = serde_json::from_value(value)
                .map_err(|e| ProposalError::parse(format!("entry '{name}': {e}")))?;
            Ok(build(name, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/json/{name}")).expect("read fixture")
    }

    #[test]
    fn roster_fixture_keeps_file_order() {
        let roster = Roster::from_json(&fixture("deliveryteam.json")).unwrap();
        let names: Vec<_> = roster.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Samuel Cunningham", "Sean Oldenburger", "Lindsey Hershman"]);
        assert_eq!(roster.get("Sean Oldenburger").unwrap().image.as_deref(), Some("sean.png"));
        assert!(roster.get("Lindsey Hershman").unwrap().image.is_none());
    }

    #[test]
    fn roster_canonicalizes_aliases_and_case() {
        let roster = Roster::from_json(&fixture("deliveryteam.json")).unwrap();
        assert_eq!(roster.canonicalize("Sam"), "Samuel Cunningham");
        assert_eq!(roster.canonicalize("sean oldenburger"), "Sean Oldenburger");
        assert_eq!(roster.canonicalize(" Jane Doe "), "Jane Doe");
    }

    #[test]
    fn allowed_names_include_alias_targets() {
        let roster = Roster::default();
        assert_eq!(
            roster.allowed_names(),
            vec!["Samuel Cunningham", "Sean Oldenburger", "Lindsey Hershman"]
        );
    }

    #[test]
    fn project_find_prefers_exact_then_containment() {
        let catalogue = ProjectCatalogue::from_json(&fixture("pastprojects.json")).unwrap();
        assert_eq!(
            catalogue.find("Knowledge Hub Chatbot").unwrap().name,
            "Knowledge Hub"
        );
        assert_eq!(catalogue.find("knowledge hub.").unwrap().name, "Knowledge Hub");
        assert_eq!(catalogue.find("CFIGS").unwrap().name, "CFIGS Research Pipeline");
        assert!(catalogue.find("Warehouse Robotics").is_none());
        assert!(catalogue.find("  ").is_none());
    }

    #[test]
    fn exact_match_beats_earlier_containment() {
        let catalogue = ProjectCatalogue::new(vec![
            ProjectEntry {
                name: "Hub".into(),
                description: "short".into(),
                proposal: None,
            },
            ProjectEntry {
                name: "Knowledge Hub".into(),
                description: "full".into(),
                proposal: None,
            },
        ]);
        assert_eq!(catalogue.find("Knowledge Hub").unwrap().description, "full");
        assert_eq!(catalogue.find("Hub Chatbot").unwrap().description, "short");
    }

    #[test]
    fn examples_skip_entries_without_proposal() {
        let examples = ExampleCatalogue::from_json(&fixture("exampleproposals.json")).unwrap();
        assert_eq!(examples.entries().len(), 2);
        let text = examples.formatted();
        assert!(text.starts_with("Example Knowledge Hub:\n1.0 Scope"));
        assert!(text.contains("\n\nExample CFIGS Research Pipeline:\n"));
        assert!(!text.contains("Draft Only"));
    }

    #[test]
    fn missing_root_key_is_parse_error() {
        let err = ProjectCatalogue::from_json(r#"{"OTHER": {}}"#).unwrap_err();
        assert!(err.to_string().contains("PROJECTS"));
    }
}
