//! Shared types, error model, and configuration for the proposal generator.
//!
//! This crate is the foundation depended on by all other proposalgen crates.
//! It provides:
//! - [`ProposalError`] — the unified error type
//! - Domain types ([`ProjectState`], [`FieldKey`], [`FieldValue`], [`RunId`])
//! - The format-neutral [`Document`] model
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod document;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrandingConfig, DefaultsConfig, OpenRouterConfig, PricingConfig, PublishConfig,
    StateBackend, StateConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, read_api_key, validate_api_key,
};
pub use document::{Block, Document, Letterhead, Section, SectionKind, Table, TableKind};
pub use error::{ProposalError, Result};
pub use types::{
    BasicInfo, BasicInfoField, Budget, CostItem, DeliveryTeam, FieldKey, FieldValue, Milestone,
    NOT_SPECIFIED, PastProjectRef, PastProjects, ProjectState, RunId, TeamMember, Timeline,
    is_specified, or_not_specified,
};
