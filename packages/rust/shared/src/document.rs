//! Format-neutral document model produced by assembly and consumed by writers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A fully assembled proposal, ready for serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Branding shown at the top of the first page.
    pub letterhead: Option<Letterhead>,
    /// Sections in output order.
    pub sections: Vec<Section>,
}

impl Document {
    /// First section of the given kind, if present.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// All visible text in document order, one block per line.
    pub fn text(&self) -> String {
        let mut out = Vec::new();
        if let Some(letterhead) = &self.letterhead {
            out.push(letterhead.company_name.clone());
        }
        for section in &self.sections {
            out.push(section.text());
        }
        out.join("\n")
    }
}

/// Company branding: optional logo plus company name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Letterhead {
    pub company_name: String,
    /// Logo path; `None` when the file was not found at assembly time.
    pub logo: Option<PathBuf>,
}

/// Identifies which part of the proposal a section renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Cover,
    Contents,
    ChangeLog,
    Scope,
    ContractStructure,
    KeyDeliverables,
    Plan,
    Assumptions,
    Timeline,
    Budget,
    DeliveryTeam,
    PastProjects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    /// Level-1 heading; the cover section has none.
    pub heading: Option<String>,
    pub starts_new_page: bool,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(kind: SectionKind, heading: Option<String>) -> Self {
        Self {
            kind,
            heading,
            starts_new_page: false,
            blocks: Vec::new(),
        }
    }

    /// Start this section on a fresh page.
    pub fn on_new_page(mut self) -> Self {
        self.starts_new_page = true;
        self
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Heading and block text, one entry per line.
    pub fn text(&self) -> String {
        let mut out = Vec::new();
        if let Some(heading) = &self.heading {
            out.push(heading.clone());
        }
        out.extend(self.blocks.iter().map(Block::text));
        out.join("\n")
    }
}

/// A content block inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Large centred document title.
    Title(String),
    Subheading(String),
    Paragraph { text: String, bold: bool },
    Bullet { text: String, level: usize, bold: bool },
    Table(Table),
    /// Team-member profile: optional photo, description, name.
    Profile {
        name: String,
        description: String,
        image: Option<PathBuf>,
    },
    Spacer,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::Paragraph {
            text: text.into(),
            bold: true,
        }
    }

    pub fn bullet(text: impl Into<String>, level: usize) -> Self {
        Self::Bullet {
            text: text.into(),
            level,
            bold: false,
        }
    }

    /// Plain text of the block; tables flatten to ` | `-joined rows.
    pub fn text(&self) -> String {
        match self {
            Self::Title(t) | Self::Subheading(t) => t.clone(),
            Self::Paragraph { text, .. } | Self::Bullet { text, .. } => text.clone(),
            Self::Table(table) => table.text(),
            Self::Profile {
                name, description, ..
            } => format!("{description}\n{name}"),
            Self::Spacer => String::new(),
        }
    }
}

/// How a table is laid out by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Two columns: shaded label cell, value cell.
    KeyValue,
    /// Header row followed by data rows.
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub kind: TableKind,
    /// Column headers; empty for key/value tables.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn grid(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            kind: TableKind::Grid,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn key_value(rows: Vec<(String, String)>) -> Self {
        Self {
            kind: TableKind::KeyValue,
            headers: Vec::new(),
            rows: rows.into_iter().map(|(k, v)| vec![k, v]).collect(),
        }
    }

    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        if !self.headers.is_empty() {
            lines.push(self.headers.join(" | "));
        }
        lines.extend(self.rows.iter().map(|r| r.join(" | ")));
        lines.join("\n")
    }
}
