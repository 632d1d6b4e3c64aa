//! `.docx` writer for assembled proposals.
//!
//! Renders a [`Document`] with `docx-rs`: Calibri text, shaded tables,
//! bullet numbering, page breaks and embedded pictures. The package is built
//! in memory, written to a hidden temp file beside the target and renamed
//! into place.

mod picture;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run, RunFonts, Shading, ShdType,
    SpecialIndentType, Start, TableCell, TableRow, WidthType,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use proposalgen_shared::{
    Block, Document, Letterhead, ProposalError, Result, Section, SectionKind, Table, TableKind,
};

pub use picture::{EMU_PER_INCH, Picture};

// ---------------------------------------------------------------------------
// Styling
// ---------------------------------------------------------------------------

const FONT: &str = "Calibri";

// Sizes are in half-points.
const TITLE_SIZE: usize = 96;
const COMPANY_SIZE: usize = 56;
const CONTENTS_HEADING_SIZE: usize = 40;
const HEADING_SIZE: usize = 32;
const SUBHEADING_SIZE: usize = 28;
const MEMBER_SUBHEADING_SIZE: usize = 24;
const SIGN_OFF_SUBHEADING_SIZE: usize = 22;
const BODY_SIZE: usize = 22;

const HEADER_FILL: &str = "595959";
const HEADER_TEXT: &str = "FFFFFF";
const DATA_FILL: &str = "D9D9D9";
const VALUE_FILLS: [&str; 2] = ["CCCCCC", "D9D9D9"];

/// Grid tables always show at least this many data rows.
pub const MIN_DATA_ROWS: usize = 2;

const LOGO_WIDTH_IN: f64 = 2.0;
const PROFILE_WIDTH_IN: f64 = 1.3;

// Profile table columns in twips: 1.5in photo, 5.5in description.
const PROFILE_GRID: [usize; 2] = [2160, 7920];

const BULLET_NUMBERING: usize = 1;
const BULLET_LEVELS: usize = 4;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A document written to disk.
#[derive(Debug, Clone)]
pub struct WrittenDocument {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Render `document` and write it atomically to `path`.
#[instrument(skip_all, fields(path = %path.display(), sections = document.sections.len()))]
pub fn write_document(document: &Document, path: &Path) -> Result<WrittenDocument> {
    let bytes = render(document)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| ProposalError::io(dir, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ProposalError::Render(format!("invalid output path {}", path.display())))?;
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, &bytes).map_err(|e| ProposalError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ProposalError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    info!(size = bytes.len(), "proposal written");
    Ok(WrittenDocument {
        path: path.to_path_buf(),
        sha256,
        size_bytes: bytes.len() as u64,
    })
}

/// Render `document` to `.docx` bytes.
pub fn render(document: &Document) -> Result<Vec<u8>> {
    let mut docx = Docx::new()
        .add_abstract_numbering(bullet_numbering())
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

    if let Some(letterhead) = &document.letterhead {
        for paragraph in letterhead_paragraphs(letterhead) {
            docx = docx.add_paragraph(paragraph);
        }
    }

    for section in &document.sections {
        docx = add_section(docx, section);
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ProposalError::Render(e.to_string()))?;
    Ok(buf.into_inner())
}

// ---------------------------------------------------------------------------
// Sections and blocks
// ---------------------------------------------------------------------------

fn add_section(mut docx: Docx, section: &Section) -> Docx {
    if section.starts_new_page {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
    }

    if let Some(heading) = &section.heading {
        let size = if section.kind == SectionKind::Contents {
            CONTENTS_HEADING_SIZE
        } else {
            HEADING_SIZE
        };
        docx = docx.add_paragraph(Paragraph::new().add_run(text_run(heading, size).bold()));
    }

    let subheading_size = match section.kind {
        SectionKind::Cover => SIGN_OFF_SUBHEADING_SIZE,
        SectionKind::DeliveryTeam => MEMBER_SUBHEADING_SIZE,
        _ => SUBHEADING_SIZE,
    };

    for block in &section.blocks {
        docx = match block {
            Block::Title(text) => docx.add_paragraph(
                Paragraph::new()
                    .align(AlignmentType::Center)
                    .add_run(text_run(text, TITLE_SIZE).bold()),
            ),
            Block::Subheading(text) => docx
                .add_paragraph(Paragraph::new().add_run(text_run(text, subheading_size).bold())),
            Block::Paragraph { text, bold } => {
                let run = text_run(text, BODY_SIZE);
                docx.add_paragraph(Paragraph::new().add_run(if *bold { run.bold() } else { run }))
            }
            Block::Bullet { text, level, bold } => {
                let run = text_run(text, BODY_SIZE);
                docx.add_paragraph(
                    Paragraph::new()
                        .numbering(
                            NumberingId::new(BULLET_NUMBERING),
                            IndentLevel::new((*level).min(BULLET_LEVELS - 1)),
                        )
                        .add_run(if *bold { run.bold() } else { run }),
                )
            }
            Block::Table(table) => docx.add_table(render_table(table)),
            Block::Profile {
                name,
                description,
                image,
            } => docx
                .add_table(profile_table(name, description, image.as_deref()))
                .add_paragraph(Paragraph::new().add_run(text_run(name, BODY_SIZE).bold())),
            Block::Spacer => docx.add_paragraph(Paragraph::new()),
        };
    }
    docx
}

fn letterhead_paragraphs(letterhead: &Letterhead) -> Vec<Paragraph> {
    let mut out = Vec::new();
    if let Some(logo) = &letterhead.logo {
        let label = logo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| logo.display().to_string());
        out.push(picture_paragraph(logo, LOGO_WIDTH_IN, &label));
    }
    out.push(Paragraph::new().add_run(text_run(&letterhead.company_name, COMPANY_SIZE).bold()));
    out
}

/// A Calibri run; embedded newlines become line breaks.
fn text_run(text: &str, size: usize) -> Run {
    let mut run = Run::new().fonts(calibri()).size(size);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}

fn calibri() -> RunFonts {
    RunFonts::new()
        .ascii(FONT)
        .hi_ansi(FONT)
        .east_asia(FONT)
        .cs(FONT)
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn render_table(table: &Table) -> docx_rs::Table {
    let rows = match table.kind {
        TableKind::Grid => grid_rows(table),
        TableKind::KeyValue => key_value_rows(table),
    };
    docx_rs::Table::new(rows)
}

/// Photo beside description in a single borderless-style row.
fn profile_table(name: &str, description: &str, image: Option<&Path>) -> docx_rs::Table {
    let picture = match image {
        Some(path) => picture_paragraph(path, PROFILE_WIDTH_IN, name),
        None => missing_image(name),
    };
    let row = TableRow::new(vec![
        TableCell::new()
            .width(PROFILE_GRID[0], WidthType::Dxa)
            .add_paragraph(picture),
        TableCell::new()
            .width(PROFILE_GRID[1], WidthType::Dxa)
            .add_paragraph(Paragraph::new().add_run(text_run(description, BODY_SIZE))),
    ]);
    docx_rs::Table::new(vec![row]).set_grid(PROFILE_GRID.to_vec())
}

fn grid_rows(table: &Table) -> Vec<TableRow> {
    let mut rows = Vec::new();
    if !table.headers.is_empty() {
        rows.push(TableRow::new(
            table
                .headers
                .iter()
                .map(|h| shaded_cell(h, HEADER_FILL, true))
                .collect(),
        ));
    }
    for row in padded_rows(table) {
        rows.push(TableRow::new(
            row.iter().map(|c| shaded_cell(c, DATA_FILL, false)).collect(),
        ));
    }
    rows
}

fn key_value_rows(table: &Table) -> Vec<TableRow> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let label = row.first().map(String::as_str).unwrap_or_default();
            let value = row.get(1).map(String::as_str).unwrap_or_default();
            TableRow::new(vec![
                shaded_cell(label, HEADER_FILL, true),
                shaded_cell(value, VALUE_FILLS[i % VALUE_FILLS.len()], false),
            ])
        })
        .collect()
}

/// Grid data rows padded with blank rows up to [`MIN_DATA_ROWS`], each as
/// wide as the header.
pub fn padded_rows(table: &Table) -> Vec<Vec<String>> {
    let width = table
        .headers
        .len()
        .max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            let mut r = r.clone();
            r.resize(width, String::new());
            r
        })
        .collect();
    while rows.len() < MIN_DATA_ROWS {
        rows.push(vec![String::new(); width]);
    }
    rows
}

fn shaded_cell(text: &str, fill: &str, header: bool) -> TableCell {
    let run = text_run(text, BODY_SIZE);
    let run = if header {
        run.bold().color(HEADER_TEXT)
    } else {
        run
    };
    TableCell::new()
        .add_paragraph(Paragraph::new().add_run(run))
        .shading(Shading::new().shd_type(ShdType::Clear).color("auto").fill(fill))
}

// ---------------------------------------------------------------------------
// Pictures and numbering
// ---------------------------------------------------------------------------

fn picture_paragraph(path: &Path, width_in: f64, label: &str) -> Paragraph {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image unreadable");
            return missing_image(label);
        }
    };
    let picture = match Picture::decode(bytes) {
        Ok(picture) => picture,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "image could not be decoded");
            return missing_image(label);
        }
    };

    let (w, h) = picture.scaled_emu(width_in);
    debug!(
        path = %path.display(),
        width_px = picture.width_px,
        height_px = picture.height_px,
        "embedding image"
    );
    let pic =
        Pic::new_with_dimensions(picture.png, picture.width_px, picture.height_px).size(w, h);
    Paragraph::new().add_run(Run::new().add_image(pic))
}

fn missing_image(label: &str) -> Paragraph {
    Paragraph::new().add_run(text_run(&format!("[Image not found: {label}]"), BODY_SIZE))
}

fn bullet_numbering() -> AbstractNumbering {
    const GLYPHS: [&str; 2] = ["\u{2022}", "\u{25E6}"];
    (0..BULLET_LEVELS).fold(AbstractNumbering::new(BULLET_NUMBERING), |num, level| {
        let left = 720 * (level as i32 + 1);
        num.add_level(
            Level::new(
                level,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new(GLYPHS[level % GLYPHS.len()]),
                LevelJc::new("left"),
            )
            .indent(Some(left), Some(SpecialIndentType::Hanging(360)), None, None),
        )
    })
}
