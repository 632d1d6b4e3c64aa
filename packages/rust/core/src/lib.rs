//! Core pipeline orchestration and domain logic for the proposal generator.
//!
//! This crate ties together completion calls, the ten extraction stages,
//! document assembly, `.docx` writing and publication into the end-to-end
//! `generate` workflow.

pub mod assembler;
pub mod budget;
pub mod completion;
pub mod duration;
pub mod extraction;
pub mod pipeline;
pub mod publish;
pub mod stages;
