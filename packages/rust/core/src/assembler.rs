//! Document assembly.
//!
//! Turns a [`ProjectState`] into the format-neutral [`Document`]: letterhead,
//! cover, contents, change log, then the nine numbered sections. Assembly is
//! deterministic; the only I/O is checking whether image files exist.
//!
//! Any field still at its default renders a placeholder instead of an empty
//! region, so a freshly reset record assembles into a complete document.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, instrument};

use proposalgen_reference::{ProjectCatalogue, ReferenceData, Roster};
use proposalgen_shared::{
    AppConfig, Block, Document, Letterhead, ProjectState, Section, SectionKind, Table, Timeline,
    expand_home, is_specified, or_not_specified,
};

use crate::budget::{BUDGET_HEADERS, BudgetSummary};

/// Title used when the project title is not specified.
pub const DEFAULT_TITLE: &str = "Project Proposal";

/// Format of the change-log approval date.
pub const CHANGE_LOG_DATE_FORMAT: &str = "%d/%m/%Y";

const SIGN_OFF_PARTIES: [&str; 2] = [
    "Client Approval and Sign-Off",
    "Contractor Approval and Sign-Off",
];

const SIGN_OFF_LINES: [&str; 3] = ["Name:", "Date:", "Signature:"];

const TIMELINE_HEADERS: [&str; 3] = ["Milestone", "Description", "Estimated Time (Days)"];

const TIMELINE_PLACEHOLDERS: [&str; 3] = [
    "Development Phase",
    "Implementation Phase",
    "Support & Maintenance",
];

const CHANGE_LOG_HEADERS: [&str; 4] = ["Revision", "Change Description", "Approval Date", "Author"];

const NO_TEAM_INFO: &str = "No additional information available.";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Inputs to assembly that do not come from the project record.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Date stamped into the change log.
    pub date: NaiveDate,
    /// Letterhead company name.
    pub company_name: String,
    /// Letterhead logo; omitted when the file does not exist.
    pub logo: PathBuf,
    /// Directory holding team-member photos.
    pub images_dir: PathBuf,
    pub day_rate: f64,
    pub tax_rate: f64,
}

impl AssembleOptions {
    pub fn from_config(config: &AppConfig, date: NaiveDate) -> Self {
        let images_dir = expand_home(&config.defaults.images_dir);
        Self {
            date,
            company_name: config.branding.company_name.clone(),
            logo: images_dir.join(&config.branding.logo),
            images_dir,
            day_rate: config.pricing.day_rate,
            tax_rate: config.pricing.tax_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Section table
// ---------------------------------------------------------------------------

/// Numbered content sections: kind, heading, placeholder.
const CONTENT_SECTIONS: [(SectionKind, &str, &str); 9] = [
    (SectionKind::Scope, "1.0 Scope", "Scope information not found."),
    (
        SectionKind::ContractStructure,
        "2.0 Contract Structure",
        "Contract structure information not found.",
    ),
    (
        SectionKind::KeyDeliverables,
        "3.0 Key Deliverables",
        "Key deliverables information not found.",
    ),
    (SectionKind::Plan, "4.0 Plan", "Plan information not found."),
    (SectionKind::Assumptions, "5.0 Assumptions", "Assumptions not found."),
    (SectionKind::Timeline, "6.0 Timeline", ""),
    (SectionKind::Budget, "7.0 Budget", ""),
    (
        SectionKind::DeliveryTeam,
        "8.0 Delivery Team",
        "No delivery team members were specified.",
    ),
    (
        SectionKind::PastProjects,
        "9.0 Past Projects",
        "No similar past projects were identified for the current requirements.",
    ),
];

/// Contents entries in document order.
pub fn contents_entries() -> Vec<&'static str> {
    std::iter::once("Change Logs")
        .chain(CONTENT_SECTIONS.iter().map(|(_, heading, _)| *heading))
        .collect()
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build the full proposal document from the record.
#[instrument(skip_all, fields(date = %options.date))]
pub fn assemble(
    state: &ProjectState,
    reference: &ReferenceData,
    options: &AssembleOptions,
) -> Document {
    let logo = options.logo.is_file().then(|| options.logo.clone());
    if logo.is_none() {
        debug!(path = %options.logo.display(), "logo not found, letterhead without image");
    }

    let mut sections = vec![
        cover(state),
        contents(),
        change_log(state, options.date),
    ];

    for (kind, heading, placeholder) in CONTENT_SECTIONS {
        let mut section = Section::new(kind, Some(heading.to_string()));
        let blocks = match kind {
            SectionKind::Scope => prose(&state.scope, placeholder),
            SectionKind::ContractStructure => prose(&state.contract_structure, placeholder),
            SectionKind::KeyDeliverables => list(&state.key_deliverables, placeholder),
            SectionKind::Plan => prose(&state.plan, placeholder),
            SectionKind::Assumptions => list(&state.assumptions, placeholder),
            SectionKind::Timeline => timeline(&state.timeline),
            SectionKind::Budget => budget(state, options),
            SectionKind::DeliveryTeam => {
                team(state, &reference.roster, &options.images_dir, placeholder)
            }
            SectionKind::PastProjects => past_projects(state, &reference.projects, placeholder),
            _ => Vec::new(),
        };
        section.blocks = blocks;
        sections.push(section);
    }

    Document {
        letterhead: Some(Letterhead {
            company_name: options.company_name.clone(),
            logo,
        }),
        sections,
    }
}

fn cover(state: &ProjectState) -> Section {
    let info = &state.basic_info;
    let title = if is_specified(&info.project_title) {
        info.project_title.trim().to_string()
    } else {
        DEFAULT_TITLE.to_string()
    };

    let mut section = Section::new(SectionKind::Cover, None);
    section.push(Block::Title(title));
    section.push(Block::Table(Table::key_value(
        info.entries()
            .into_iter()
            .map(|(label, value)| (label.to_string(), or_not_specified(value)))
            .collect(),
    )));

    for party in SIGN_OFF_PARTIES {
        section.push(Block::Spacer);
        section.push(Block::Subheading(party.to_string()));
        for line in SIGN_OFF_LINES {
            section.push(Block::paragraph(line));
        }
    }
    section
}

fn contents() -> Section {
    let mut section = Section::new(SectionKind::Contents, Some("Contents".into())).on_new_page();
    for entry in contents_entries() {
        section.push(Block::bold(entry));
    }
    section
}

fn change_log(state: &ProjectState, date: NaiveDate) -> Section {
    let mut section =
        Section::new(SectionKind::ChangeLog, Some("Change Logs".into())).on_new_page();
    section.push(Block::Table(Table::grid(
        &CHANGE_LOG_HEADERS,
        vec![vec![
            "1.0".into(),
            "Initial Draft".into(),
            date.format(CHANGE_LOG_DATE_FORMAT).to_string(),
            or_not_specified(state.basic_info.author.as_str()),
        ]],
    )));
    section
}

/// Split prose into paragraphs and `- ` bullets; indentation sets the level.
pub fn prose_blocks(text: &str) -> Vec<Block> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix("- ") {
                Some(item) => {
                    let indent = line.len() - trimmed.len();
                    Block::bullet(item.trim(), indent / 2)
                }
                None => Block::paragraph(trimmed.trim_end()),
            }
        })
        .collect()
}

fn prose(text: &str, placeholder: &str) -> Vec<Block> {
    if !is_specified(text) {
        return vec![Block::paragraph(placeholder)];
    }
    prose_blocks(text)
}

fn list(items: &[String], placeholder: &str) -> Vec<Block> {
    let blocks: Vec<Block> = items
        .iter()
        .filter(|item| is_specified(item))
        .map(|item| Block::bullet(item.trim(), 0))
        .collect();
    if blocks.is_empty() {
        vec![Block::paragraph(placeholder)]
    } else {
        blocks
    }
}

fn timeline(timeline: &Timeline) -> Vec<Block> {
    let rows: Vec<Vec<String>> = if timeline.milestones.is_empty() {
        TIMELINE_PLACEHOLDERS
            .iter()
            .enumerate()
            .map(|(i, phase)| vec![(i + 1).to_string(), phase.to_string(), String::new()])
            .collect()
    } else {
        timeline
            .milestones
            .iter()
            .enumerate()
            .map(|(i, m)| {
                vec![
                    (i + 1).to_string(),
                    m.description.clone(),
                    m.estimated_time.clone(),
                ]
            })
            .collect()
    };

    vec![
        Block::Table(Table::grid(&TIMELINE_HEADERS, rows)),
        Block::paragraph(format!(
            "Total Duration: {}",
            or_not_specified(timeline.total_duration.as_str())
        )),
    ]
}

fn budget(state: &ProjectState, options: &AssembleOptions) -> Vec<Block> {
    let summary = BudgetSummary::compute(
        &state.timeline.total_duration,
        &state.budget,
        options.day_rate,
        options.tax_rate,
    );
    vec![Block::Table(Table::grid(&BUDGET_HEADERS, summary.rows()))]
}

fn team(
    state: &ProjectState,
    roster: &Roster,
    images_dir: &Path,
    placeholder: &str,
) -> Vec<Block> {
    let mut seen: Vec<String> = Vec::new();
    let mut blocks = Vec::new();

    for member in &state.delivery_team.team_members {
        if !is_specified(&member.name) {
            continue;
        }
        let name = roster.canonicalize(&member.name);
        if seen.contains(&name) {
            continue;
        }
        seen.push(name.clone());

        match roster.get(&name) {
            Some(entry) => blocks.push(Block::Profile {
                name: entry.name.clone(),
                description: entry.description.clone(),
                image: entry.image.as_ref().map(|file| images_dir.join(file)),
            }),
            None => {
                blocks.push(Block::Subheading(name));
                blocks.push(Block::paragraph(NO_TEAM_INFO));
            }
        }
        blocks.push(Block::Spacer);
    }

    if blocks.is_empty() {
        vec![Block::paragraph(placeholder)]
    } else {
        blocks
    }
}

fn past_projects(
    state: &ProjectState,
    catalogue: &ProjectCatalogue,
    placeholder: &str,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    for reference in &state.past_projects.past_projects {
        let Some(entry) = catalogue.find(&reference.project_name) else {
            debug!(project = %reference.project_name, "no catalogue match, skipping");
            continue;
        };
        blocks.push(Block::Bullet {
            text: reference.project_name.trim().to_string(),
            level: 0,
            bold: true,
        });
        blocks.push(Block::bullet(entry.description.trim(), 1));
    }

    if blocks.is_empty() {
        vec![Block::paragraph(placeholder)]
    } else {
        blocks
    }
}

/// Cells of the cover info table, in order.
pub fn cover_values(document: &Document) -> Vec<String> {
    document
        .section(SectionKind::Cover)
        .and_then(|s| {
            s.blocks.iter().find_map(|b| match b {
                Block::Table(t) => Some(t.rows.iter().filter_map(|r| r.get(1).cloned()).collect()),
                _ => None,
            })
        })
        .unwrap_or_default()
}

/// Placeholder shown for a section whose field is unset.
pub fn placeholder_for(kind: SectionKind) -> Option<&'static str> {
    CONTENT_SECTIONS
        .iter()
        .find(|(k, _, p)| *k == kind && !p.is_empty())
        .map(|(_, _, p)| *p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_reference::ProjectEntry;
    use proposalgen_shared::{
        BasicInfo, Budget, CostItem, DeliveryTeam, FieldValue, Milestone, NOT_SPECIFIED,
        PastProjectRef, PastProjects, TeamMember,
    };

    fn options() -> AssembleOptions {
        AssembleOptions {
            date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            company_name: "AI Advancements".into(),
            logo: PathBuf::from("/nonexistent/Logo.png"),
            images_dir: PathBuf::from("/nonexistent/images"),
            day_rate: 1600.0,
            tax_rate: 0.10,
        }
    }

    fn fixtures() -> ReferenceData {
        ReferenceData::load(Path::new("../../../fixtures/json"))
    }

    fn section_text(document: &Document, kind: SectionKind) -> String {
        document.section(kind).map(Section::text).unwrap_or_default()
    }

    #[test]
    fn reset_record_renders_placeholders_everywhere() {
        let document = assemble(&ProjectState::skeleton(), &ReferenceData::default(), &options());

        assert_eq!(cover_values(&document), vec![NOT_SPECIFIED.to_string(); 8]);
        for kind in [
            SectionKind::Scope,
            SectionKind::ContractStructure,
            SectionKind::KeyDeliverables,
            SectionKind::Plan,
            SectionKind::Assumptions,
            SectionKind::DeliveryTeam,
            SectionKind::PastProjects,
        ] {
            let placeholder = placeholder_for(kind).unwrap();
            assert!(
                section_text(&document, kind).contains(placeholder),
                "{kind:?} missing placeholder"
            );
        }

        let timeline = section_text(&document, SectionKind::Timeline);
        for phase in TIMELINE_PLACEHOLDERS {
            assert!(timeline.contains(phase));
        }
        assert!(timeline.contains("Total Duration: Not specified"));
    }

    #[test]
    fn document_order_is_fixed() {
        let document = assemble(&ProjectState::skeleton(), &ReferenceData::default(), &options());
        let kinds: Vec<_> = document.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds[..3], [SectionKind::Cover, SectionKind::Contents, SectionKind::ChangeLog]);
        assert_eq!(kinds.len(), 12);
        assert!(document.sections[1].starts_new_page);
        assert!(document.sections[2].starts_new_page);

        let cover = document.section(SectionKind::Cover).unwrap();
        assert_eq!(cover.blocks[0], Block::Title(DEFAULT_TITLE.into()));
        assert!(cover.text().contains("Contractor Approval and Sign-Off"));
    }

    #[test]
    fn change_log_is_dated_and_attributed() {
        let mut state = ProjectState::skeleton();
        let mut info = BasicInfo::default();
        info.author = "Sean Oldenburger".into();
        state.set(FieldValue::BasicInfo(info));

        let document = assemble(&state, &ReferenceData::default(), &options());
        assert!(
            section_text(&document, SectionKind::ChangeLog)
                .contains("1.0 | Initial Draft | 09/03/2026 | Sean Oldenburger")
        );
    }

    #[test]
    fn prose_lines_become_paragraphs_and_bullets() {
        let blocks = prose_blocks("Overview\n- Discovery\n    - Interviews\n\n- Build");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("Overview"),
                Block::bullet("Discovery", 0),
                Block::bullet("Interviews", 2),
                Block::bullet("Build", 0),
            ]
        );
    }

    #[test]
    fn list_skips_sentinel_items() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::KeyDeliverables(vec![
            "MVP chatbot".into(),
            NOT_SPECIFIED.into(),
            " ".into(),
        ]));
        let document = assemble(&state, &ReferenceData::default(), &options());
        let section = document.section(SectionKind::KeyDeliverables).unwrap();
        assert_eq!(section.blocks, vec![Block::bullet("MVP chatbot", 0)]);
    }

    #[test]
    fn timeline_estimates_are_shown_verbatim() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::Timeline(Timeline {
            total_duration: "3 days".into(),
            milestones: vec![Milestone {
                description: "Build".into(),
                estimated_time: "3 days".into(),
            }],
        }));
        let document = assemble(&state, &ReferenceData::default(), &options());
        let text = section_text(&document, SectionKind::Timeline);
        assert!(text.contains("1 | Build | 3 days"));
        assert!(text.contains("Total Duration: 3 days"));
        assert!(section_text(&document, SectionKind::Budget).contains("Total Cost | 4800.00"));
    }

    #[test]
    fn budget_applies_day_rate_and_tax() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::Timeline(Timeline {
            total_duration: "10".into(),
            milestones: Vec::new(),
        }));
        let document = assemble(&state, &ReferenceData::default(), &options());
        let text = section_text(&document, SectionKind::Budget);
        assert!(text.contains("Developer Effort | 10 | 1600.00 | 16000.00"));
        assert!(text.contains("Total Cost | 16000.00"));
        assert!(text.contains("+ 10% GST | 17600.00"));
    }

    #[test]
    fn budget_includes_additional_items() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::Timeline(Timeline {
            total_duration: "2".into(),
            milestones: Vec::new(),
        }));
        state.set(FieldValue::Budget(Budget {
            total_cost: NOT_SPECIFIED.into(),
            additional_cost: vec![CostItem {
                category: "Hosting".into(),
                cost: "$200".into(),
                ..CostItem::default()
            }],
        }));
        let document = assemble(&state, &ReferenceData::default(), &options());
        let text = section_text(&document, SectionKind::Budget);
        assert!(text.contains("Hosting |  |  | 200.00"));
        assert!(text.contains("Total Cost | 3400.00"));
        assert!(text.contains("+ 10% GST | 3740.00"));
    }

    #[test]
    fn team_aliases_resolve_to_one_profile() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::DeliveryTeam(DeliveryTeam {
            team_members: vec![
                TeamMember::new("Sam"),
                TeamMember::new("Samuel"),
                TeamMember::new("Jane Doe"),
            ],
        }));
        let document = assemble(&state, &fixtures(), &options());
        let section = document.section(SectionKind::DeliveryTeam).unwrap();

        let profiles: Vec<_> = section
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Profile { name, image, .. } => Some((name.clone(), image.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].0, "Samuel Cunningham");
        assert_eq!(
            profiles[0].1,
            Some(PathBuf::from("/nonexistent/images/samuel.png"))
        );

        assert!(section.blocks.contains(&Block::Subheading("Jane Doe".into())));
        assert!(section.blocks.contains(&Block::paragraph(NO_TEAM_INFO)));
    }

    #[test]
    fn past_projects_show_extracted_name_with_catalogue_description() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::PastProjects(PastProjects {
            past_projects: vec![
                PastProjectRef::new("Knowledge Hub Chatbot"),
                PastProjectRef::new("Warehouse Robots"),
            ],
        }));
        let reference = ReferenceData {
            projects: ProjectCatalogue::new(vec![ProjectEntry {
                name: "Knowledge Hub".into(),
                description: "Internal search assistant.".into(),
                proposal: None,
            }]),
            ..ReferenceData::default()
        };
        let document = assemble(&state, &reference, &options());
        let section = document.section(SectionKind::PastProjects).unwrap();
        assert_eq!(
            section.blocks,
            vec![
                Block::Bullet {
                    text: "Knowledge Hub Chatbot".into(),
                    level: 0,
                    bold: true
                },
                Block::bullet("Internal search assistant.", 1),
            ]
        );
    }

    #[test]
    fn unmatched_past_projects_show_notice() {
        let mut state = ProjectState::skeleton();
        state.set(FieldValue::PastProjects(PastProjects {
            past_projects: vec![PastProjectRef::new("Warehouse Robots")],
        }));
        let document = assemble(&state, &fixtures(), &options());
        assert!(
            section_text(&document, SectionKind::PastProjects)
                .contains(placeholder_for(SectionKind::PastProjects).unwrap())
        );
    }

    #[test]
    fn missing_logo_is_omitted() {
        let document = assemble(&ProjectState::skeleton(), &ReferenceData::default(), &options());
        let letterhead = document.letterhead.unwrap();
        assert_eq!(letterhead.company_name, "AI Advancements");
        assert!(letterhead.logo.is_none());
    }
}
