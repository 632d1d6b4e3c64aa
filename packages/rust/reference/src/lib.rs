//! Static reference data: team roster, past-project catalogue, example
//! proposals and the person-name alias table.
//!
//! Catalogues are loaded once per process from the configured data
//! directory. A catalogue that cannot be read degrades to empty with a
//! warning; extraction and assembly carry on without it.

mod catalogue;
pub mod names;

use std::path::Path;

use proposalgen_shared::Result;
use tracing::{info, warn};

pub use catalogue::{
    ExampleCatalogue, ExampleProposal, ProjectCatalogue, ProjectEntry, Roster, RosterEntry,
};
pub use names::{DEFAULT_TEAM, KNOWN_LEADS, normalize, resolve_alias, resolve_lead};

/// Roster file name under the data directory.
pub const ROSTER_FILE: &str = "deliveryteam.json";

/// Past-project catalogue file name under the data directory.
pub const PROJECTS_FILE: &str = "pastprojects.json";

/// Example-proposal catalogue file name under the data directory.
pub const EXAMPLES_FILE: &str = "exampleproposals.json";

/// All reference catalogues, immutable for the lifetime of a run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub roster: Roster,
    pub projects: ProjectCatalogue,
    pub examples: ExampleCatalogue,
}

impl ReferenceData {
    /// Load every catalogue from `data_dir`, substituting an empty catalogue
    /// for any file that is missing or malformed.
    pub fn load(data_dir: &Path) -> Self {
        let data = Self {
            roster: or_empty(Roster::load(&data_dir.join(ROSTER_FILE)), ROSTER_FILE),
            projects: or_empty(
                ProjectCatalogue::load(&data_dir.join(PROJECTS_FILE)),
                PROJECTS_FILE,
            ),
            examples: or_empty(
                ExampleCatalogue::load(&data_dir.join(EXAMPLES_FILE)),
                EXAMPLES_FILE,
            ),
        };
        info!(
            data_dir = %data_dir.display(),
            team = data.roster.entries().len(),
            projects = data.projects.entries().len(),
            examples = data.examples.entries().len(),
            "reference data loaded"
        );
        data
    }
}

fn or_empty<T: Default>(loaded: Result<T>, file: &str) -> T {
    loaded.unwrap_or_else(|e| {
        warn!(file, error = %e, "reference catalogue unavailable, using empty catalogue");
        T::default()
    })
}
