//! Core domain types: the project-state record and its ten fields.
//!
//! The record serializes to the flat JSON layout used by the state store:
//! upper-snake top-level keys (`BASIC_INFO`, `TIMELINE`, ...) with the nested
//! shapes the extraction stages produce. Every field has a skeleton default,
//! so a key missing from persisted JSON reads back as "Not specified".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Sentinel written into any field the source text did not cover.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Returns `true` when `value` carries real content (not blank, not the sentinel).
pub fn is_specified(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NOT_SPECIFIED)
}

/// Replace blank text with the sentinel.
pub fn or_not_specified(value: impl Into<String>) -> String {
    let value = value.into();
    if value.trim().is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        value.trim().to_string()
    }
}

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

fn not_specified_list() -> Vec<String> {
    vec![NOT_SPECIFIED.to_string()]
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one extraction run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// FieldKey
// ---------------------------------------------------------------------------

/// The ten top-level keys of [`ProjectState`], declared in extraction order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKey {
    BasicInfo,
    Plan,
    Scope,
    ContractStructure,
    KeyDeliverables,
    Assumptions,
    Timeline,
    Budget,
    DeliveryTeam,
    PastProjects,
}

impl FieldKey {
    /// Every key, in the order the extraction stages run.
    pub const ALL: [FieldKey; 10] = [
        Self::BasicInfo,
        Self::Plan,
        Self::Scope,
        Self::ContractStructure,
        Self::KeyDeliverables,
        Self::Assumptions,
        Self::Timeline,
        Self::Budget,
        Self::DeliveryTeam,
        Self::PastProjects,
    ];

    /// Persisted JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicInfo => "BASIC_INFO",
            Self::Plan => "PLAN",
            Self::Scope => "SCOPE",
            Self::ContractStructure => "CONTRACT_STRUCTURE",
            Self::KeyDeliverables => "KEY_DELIVERABLES",
            Self::Assumptions => "ASSUMPTIONS",
            Self::Timeline => "TIMELINE",
            Self::Budget => "BUDGET",
            Self::DeliveryTeam => "DELIVERY_TEAM",
            Self::PastProjects => "PAST_PROJECTS",
        }
    }

    /// Position of this key in the extraction order.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown project field '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Field shapes
// ---------------------------------------------------------------------------

/// `BASIC_INFO`: the eight cover-page facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(rename = "PROJECT TITLE", default = "not_specified", deserialize_with = "lenient::string")]
    pub project_title: String,
    #[serde(rename = "COMPANY NAME", default = "not_specified", deserialize_with = "lenient::string")]
    pub company_name: String,
    #[serde(rename = "CLIENT", default = "not_specified", deserialize_with = "lenient::string")]
    pub client: String,
    #[serde(rename = "PROJECT MANAGER", default = "not_specified", deserialize_with = "lenient::string")]
    pub project_manager: String,
    #[serde(rename = "AUTHOR", default = "not_specified", deserialize_with = "lenient::string")]
    pub author: String,
    #[serde(rename = "START DATE", default = "not_specified", deserialize_with = "lenient::string")]
    pub start_date: String,
    #[serde(rename = "END DATE", default = "not_specified", deserialize_with = "lenient::string")]
    pub end_date: String,
    #[serde(rename = "PROJECT DESCRIPTION", default = "not_specified", deserialize_with = "lenient::string")]
    pub project_description: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            project_title: not_specified(),
            company_name: not_specified(),
            client: not_specified(),
            project_manager: not_specified(),
            author: not_specified(),
            start_date: not_specified(),
            end_date: not_specified(),
            project_description: not_specified(),
        }
    }
}

/// Addressable sub-fields of [`BasicInfo`], in cover-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicInfoField {
    ProjectTitle,
    CompanyName,
    Client,
    ProjectManager,
    Author,
    StartDate,
    EndDate,
    ProjectDescription,
}

impl BasicInfoField {
    /// All sub-fields in cover-table order.
    pub const ALL: [BasicInfoField; 8] = [
        Self::ProjectTitle,
        Self::CompanyName,
        Self::Client,
        Self::ProjectManager,
        Self::Author,
        Self::StartDate,
        Self::EndDate,
        Self::ProjectDescription,
    ];

    /// Label used both as the JSON key and the cover-table header.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectTitle => "PROJECT TITLE",
            Self::CompanyName => "COMPANY NAME",
            Self::Client => "CLIENT",
            Self::ProjectManager => "PROJECT MANAGER",
            Self::Author => "AUTHOR",
            Self::StartDate => "START DATE",
            Self::EndDate => "END DATE",
            Self::ProjectDescription => "PROJECT DESCRIPTION",
        }
    }
}

impl BasicInfo {
    /// Read one sub-field.
    pub fn get(&self, field: BasicInfoField) -> &str {
        match field {
            BasicInfoField::ProjectTitle => &self.project_title,
            BasicInfoField::CompanyName => &self.company_name,
            BasicInfoField::Client => &self.client,
            BasicInfoField::ProjectManager => &self.project_manager,
            BasicInfoField::Author => &self.author,
            BasicInfoField::StartDate => &self.start_date,
            BasicInfoField::EndDate => &self.end_date,
            BasicInfoField::ProjectDescription => &self.project_description,
        }
    }

    /// Replace one sub-field.
    pub fn set(&mut self, field: BasicInfoField, value: impl Into<String>) {
        let slot = match field {
            BasicInfoField::ProjectTitle => &mut self.project_title,
            BasicInfoField::CompanyName => &mut self.company_name,
            BasicInfoField::Client => &mut self.client,
            BasicInfoField::ProjectManager => &mut self.project_manager,
            BasicInfoField::Author => &mut self.author,
            BasicInfoField::StartDate => &mut self.start_date,
            BasicInfoField::EndDate => &mut self.end_date,
            BasicInfoField::ProjectDescription => &mut self.project_description,
        };
        *slot = value.into();
    }

    /// `(label, value)` pairs in cover-table order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        BasicInfoField::ALL
            .iter()
            .map(|f| (f.label(), self.get(*f)))
            .collect()
    }
}

/// One row of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(rename = "DESCRIPTION", default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Day count as provided; may carry a unit suffix ("3 days").
    #[serde(rename = "ESTIMATED_TIME", default, deserialize_with = "lenient::string")]
    pub estimated_time: String,
}

/// `TIMELINE`: milestones plus their summed duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(rename = "TOTAL_DURATION", default = "not_specified", deserialize_with = "lenient::string")]
    pub total_duration: String,
    #[serde(rename = "MILESTONES", default)]
    pub milestones: Vec<Milestone>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            total_duration: not_specified(),
            milestones: Vec::new(),
        }
    }
}

/// A budget line item beyond developer effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostItem {
    #[serde(rename = "CATEGORY", default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(rename = "TIME", default, deserialize_with = "lenient::string")]
    pub time: String,
    #[serde(rename = "DAY_RATE", default, deserialize_with = "lenient::string")]
    pub day_rate: String,
    #[serde(rename = "COST", alias = "AMOUNT", default, deserialize_with = "lenient::string")]
    pub cost: String,
}

/// `BUDGET`: quoted total plus additional cost items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(rename = "TOTAL_COST", default = "not_specified", deserialize_with = "lenient::string")]
    pub total_cost: String,
    #[serde(rename = "ADDITIONAL_COST", alias = "ADDITIONAL_COSTS", default)]
    pub additional_cost: Vec<CostItem>,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            total_cost: not_specified(),
            additional_cost: Vec::new(),
        }
    }
}

/// A named delivery-team mention. Accepts `"Sam"` or `{"NAME": "Sam"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    #[serde(rename = "NAME")]
    pub name: String,
}

impl TeamMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<'de> Deserialize<'de> for TeamMember {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Object {
                #[serde(rename = "NAME", default)]
                name: String,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(name) | Repr::Object { name } => Self { name },
        })
    }
}

/// `DELIVERY_TEAM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTeam {
    #[serde(rename = "TEAM_MEMBERS", default)]
    pub team_members: Vec<TeamMember>,
}

/// A past-project reference. Accepts `"Name"` or `{"PROJECT_NAME": "Name"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PastProjectRef {
    #[serde(rename = "PROJECT_NAME")]
    pub project_name: String,
}

impl PastProjectRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project_name: name.into(),
        }
    }
}

impl<'de> Deserialize<'de> for PastProjectRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Object {
                #[serde(rename = "PROJECT_NAME", default)]
                project_name: String,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(project_name) | Repr::Object { project_name } => Self { project_name },
        })
    }
}

/// `PAST_PROJECTS` (the nested key mirrors the top-level one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastProjects {
    #[serde(rename = "PAST_PROJECTS", default)]
    pub past_projects: Vec<PastProjectRef>,
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A value for exactly one top-level field. The variant determines the key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    BasicInfo(BasicInfo),
    Plan(String),
    Scope(String),
    ContractStructure(String),
    KeyDeliverables(Vec<String>),
    Assumptions(Vec<String>),
    Timeline(Timeline),
    Budget(Budget),
    DeliveryTeam(DeliveryTeam),
    PastProjects(PastProjects),
}

impl FieldValue {
    /// The key this value is stored under.
    pub fn key(&self) -> FieldKey {
        match self {
            Self::BasicInfo(_) => FieldKey::BasicInfo,
            Self::Plan(_) => FieldKey::Plan,
            Self::Scope(_) => FieldKey::Scope,
            Self::ContractStructure(_) => FieldKey::ContractStructure,
            Self::KeyDeliverables(_) => FieldKey::KeyDeliverables,
            Self::Assumptions(_) => FieldKey::Assumptions,
            Self::Timeline(_) => FieldKey::Timeline,
            Self::Budget(_) => FieldKey::Budget,
            Self::DeliveryTeam(_) => FieldKey::DeliveryTeam,
            Self::PastProjects(_) => FieldKey::PastProjects,
        }
    }

    /// Skeleton default for `key`.
    pub fn default_for(key: FieldKey) -> Self {
        match key {
            FieldKey::BasicInfo => Self::BasicInfo(BasicInfo::default()),
            FieldKey::Plan => Self::Plan(not_specified()),
            FieldKey::Scope => Self::Scope(not_specified()),
            FieldKey::ContractStructure => Self::ContractStructure(not_specified()),
            FieldKey::KeyDeliverables => Self::KeyDeliverables(not_specified_list()),
            FieldKey::Assumptions => Self::Assumptions(not_specified_list()),
            FieldKey::Timeline => Self::Timeline(Timeline::default()),
            FieldKey::Budget => Self::Budget(Budget::default()),
            FieldKey::DeliveryTeam => Self::DeliveryTeam(DeliveryTeam::default()),
            FieldKey::PastProjects => Self::PastProjects(PastProjects::default()),
        }
    }

    /// Decode the persisted JSON for `key`.
    pub fn from_json(key: FieldKey, value: Value) -> serde_json::Result<Self> {
        Ok(match key {
            FieldKey::BasicInfo => Self::BasicInfo(serde_json::from_value(value)?),
            FieldKey::Plan => Self::Plan(lenient::string_from_value(value)),
            FieldKey::Scope => Self::Scope(lenient::string_from_value(value)),
            FieldKey::ContractStructure => {
                Self::ContractStructure(lenient::string_from_value(value))
            }
            FieldKey::KeyDeliverables => {
                Self::KeyDeliverables(lenient::list_from_value(value))
            }
            FieldKey::Assumptions => Self::Assumptions(lenient::list_from_value(value)),
            FieldKey::Timeline => Self::Timeline(serde_json::from_value(value)?),
            FieldKey::Budget => Self::Budget(serde_json::from_value(value)?),
            FieldKey::DeliveryTeam => Self::DeliveryTeam(serde_json::from_value(value)?),
            FieldKey::PastProjects => Self::PastProjects(serde_json::from_value(value)?),
        })
    }

    /// Encode as persisted JSON.
    pub fn to_json(&self) -> Value {
        let encoded = match self {
            Self::BasicInfo(v) => serde_json::to_value(v),
            Self::Plan(v) | Self::Scope(v) | Self::ContractStructure(v) => {
                Ok(Value::String(v.clone()))
            }
            Self::KeyDeliverables(v) | Self::Assumptions(v) => serde_json::to_value(v),
            Self::Timeline(v) => serde_json::to_value(v),
            Self::Budget(v) => serde_json::to_value(v),
            Self::DeliveryTeam(v) => serde_json::to_value(v),
            Self::PastProjects(v) => serde_json::to_value(v),
        };
        // Plain data structs with string keys always serialize.
        encoded.unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

/// The single record accumulating all extracted/overridden proposal fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(rename = "BASIC_INFO", default)]
    pub basic_info: BasicInfo,
    #[serde(rename = "PLAN", default = "not_specified", deserialize_with = "lenient::string")]
    pub plan: String,
    #[serde(rename = "SCOPE", default = "not_specified", deserialize_with = "lenient::string")]
    pub scope: String,
    #[serde(rename = "CONTRACT_STRUCTURE", default = "not_specified", deserialize_with = "lenient::string")]
    pub contract_structure: String,
    #[serde(rename = "KEY_DELIVERABLES", default = "not_specified_list", deserialize_with = "lenient::string_list")]
    pub key_deliverables: Vec<String>,
    #[serde(rename = "ASSUMPTIONS", default = "not_specified_list", deserialize_with = "lenient::string_list")]
    pub assumptions: Vec<String>,
    #[serde(rename = "TIMELINE", default)]
    pub timeline: Timeline,
    #[serde(rename = "BUDGET", default)]
    pub budget: Budget,
    #[serde(rename = "DELIVERY_TEAM", default)]
    pub delivery_team: DeliveryTeam,
    #[serde(rename = "PAST_PROJECTS", default)]
    pub past_projects: PastProjects,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            basic_info: BasicInfo::default(),
            plan: not_specified(),
            scope: not_specified(),
            contract_structure: not_specified(),
            key_deliverables: not_specified_list(),
            assumptions: not_specified_list(),
            timeline: Timeline::default(),
            budget: Budget::default(),
            delivery_team: DeliveryTeam::default(),
            past_projects: PastProjects::default(),
        }
    }
}

impl ProjectState {
    /// The all-default skeleton written by a reset.
    pub fn skeleton() -> Self {
        Self::default()
    }

    /// Clone out the value stored under `key`.
    pub fn get(&self, key: FieldKey) -> FieldValue {
        match key {
            FieldKey::BasicInfo => FieldValue::BasicInfo(self.basic_info.clone()),
            FieldKey::Plan => FieldValue::Plan(self.plan.clone()),
            FieldKey::Scope => FieldValue::Scope(self.scope.clone()),
            FieldKey::ContractStructure => {
                FieldValue::ContractStructure(self.contract_structure.clone())
            }
            FieldKey::KeyDeliverables => {
                FieldValue::KeyDeliverables(self.key_deliverables.clone())
            }
            FieldKey::Assumptions => FieldValue::Assumptions(self.assumptions.clone()),
            FieldKey::Timeline => FieldValue::Timeline(self.timeline.clone()),
            FieldKey::Budget => FieldValue::Budget(self.budget.clone()),
            FieldKey::DeliveryTeam => FieldValue::DeliveryTeam(self.delivery_team.clone()),
            FieldKey::PastProjects => FieldValue::PastProjects(self.past_projects.clone()),
        }
    }

    /// Replace the whole value of one field.
    pub fn set(&mut self, value: FieldValue) {
        match value {
            FieldValue::BasicInfo(v) => self.basic_info = v,
            FieldValue::Plan(v) => self.plan = v,
            FieldValue::Scope(v) => self.scope = v,
            FieldValue::ContractStructure(v) => self.contract_structure = v,
            FieldValue::KeyDeliverables(v) => self.key_deliverables = v,
            FieldValue::Assumptions(v) => self.assumptions = v,
            FieldValue::Timeline(v) => self.timeline = v,
            FieldValue::Budget(v) => self.budget = v,
            FieldValue::DeliveryTeam(v) => self.delivery_team = v,
            FieldValue::PastProjects(v) => self.past_projects = v,
        }
    }

    /// JSON object holding only `keys`, in extraction order.
    pub fn snapshot(&self, keys: &[FieldKey]) -> Value {
        let mut map = serde_json::Map::new();
        for key in FieldKey::ALL.iter().filter(|k| keys.contains(k)) {
            map.insert(key.as_str().to_string(), self.get(*key).to_json());
        }
        Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

/// Decoders that coerce scalar JSON into strings instead of failing.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn string_from_value(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    pub(super) fn list_from_value(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.into_iter().map(string_from_value).collect(),
            Value::Null => Vec::new(),
            other => vec![string_from_value(other)],
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(string_from_value(Value::deserialize(d)?))
    }

    pub(super) fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(list_from_value(Value::deserialize(d)?))
    }
}
