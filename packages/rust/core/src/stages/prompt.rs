//! Message assembly for a single stage call.

use proposalgen_shared::ProjectState;

use super::{Stage, StageContext};
use crate::completion::{ChatMessage, FIELD_MARKER};

const EXAMPLES_PREAMBLE: &str = "Here are a series of example proposals written in the past for \
different clients. Their content does not relate to this project in any way; only the structure \
and tone of voice matter. Do not reuse any of their content.";

/// System message (field marker + guidance) and user message (state
/// snapshot restricted to the read-set, style examples, input text).
pub fn build_messages(
    stage: &dyn Stage,
    ctx: &StageContext<'_>,
    state: &ProjectState,
    input: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        "{FIELD_MARKER}{}\n\n{}",
        stage.key(),
        stage.guidance(ctx).trim()
    );

    let mut user = Vec::new();
    if !stage.reads().is_empty() {
        let snapshot = state.snapshot(stage.reads());
        let pretty = serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| snapshot.to_string());
        user.push(format!("Current Project State:\n{pretty}"));
    }

    let examples = ctx.reference.examples.formatted();
    if !examples.is_empty() {
        user.push(format!("Example Proposals:\n{EXAMPLES_PREAMBLE}\n\n{examples}"));
    }

    user.push(format!("Input text:\n{}", input.trim()));

    vec![ChatMessage::system(system), ChatMessage::user(user.join("\n\n"))]
}
