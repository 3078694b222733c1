//! System and document prompts for the S2 assistant.
//!
//! Prompt texts live under `config/prompts/` and are compiled in with
//! `include_str!`; composing a prompt never touches the filesystem.
//!
//! ## System prompt layers
//!
//! ```text
//! 0. s2_domain.md       — identity and S2 product knowledge
//! 1. behavior.md        — disclaimer protocol and response guidelines
//! 2. request_origin.md  — geo hints of the incoming request
//! 3. artifacts.md       — when and how to use document tools
//! ```

mod artifact;
mod builder;

pub use artifact::{ArtifactKind, UnknownArtifactKind};
pub use builder::{PromptBuilder, SEPARATOR, render};

use serde::{Deserialize, Serialize};

pub const DOMAIN_PROMPT: &str = include_str!("../../config/prompts/s2_domain.md");
pub const BEHAVIOR_PROMPT: &str = include_str!("../../config/prompts/behavior.md");
pub const ARTIFACTS_PROMPT: &str = include_str!("../../config/prompts/artifacts.md");
pub const CODE_PROMPT: &str = include_str!("../../config/prompts/code.md");
pub const SHEET_PROMPT: &str = include_str!("../../config/prompts/sheet.md");

const REQUEST_ORIGIN_TEMPLATE: &str = include_str!("../../config/prompts/request_origin.md");
const UPDATE_TEXT_TEMPLATE: &str = include_str!("../../config/prompts/update_text.md");
const UPDATE_CODE_TEMPLATE: &str = include_str!("../../config/prompts/update_code.md");
const UPDATE_SHEET_TEMPLATE: &str = include_str!("../../config/prompts/update_sheet.md");

/// Geographic metadata about where a request came from.
///
/// Every field is optional; the edge runtime fills in what it knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHints {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Render the request-origin block. Absent fields keep their label with an
/// empty value.
pub fn request_prompt_from_hints(hints: &RequestHints) -> String {
    PromptBuilder::new()
        .layer(REQUEST_ORIGIN_TEMPLATE)
        .with_vars(hint_vars(hints))
        .build()
}

fn hint_vars(hints: &RequestHints) -> [(&str, &str); 4] {
    [
        ("latitude", hints.latitude.as_deref().unwrap_or_default()),
        ("longitude", hints.longitude.as_deref().unwrap_or_default()),
        ("city", hints.city.as_deref().unwrap_or_default()),
        ("country", hints.country.as_deref().unwrap_or_default()),
    ]
}

/// Full system prompt for a chat request.
///
/// `_selected_model` does not influence the output; every logical model gets
/// the same instructions. Hints are substituted after the layers are joined
/// so an empty trailing field keeps its `"- country: "` shape.
pub fn system_prompt(_selected_model: &str, hints: &RequestHints) -> String {
    PromptBuilder::new()
        .layer(DOMAIN_PROMPT)
        .layer(BEHAVIOR_PROMPT)
        .layer(REQUEST_ORIGIN_TEMPLATE)
        .layer(ARTIFACTS_PROMPT)
        .with_vars(hint_vars(hints))
        .build()
}

/// Instruction for rewriting an existing document of `kind`.
///
/// Returns an empty string for kinds without an update template.
pub fn update_document_prompt(current_content: Option<&str>, kind: ArtifactKind) -> String {
    let template = match kind {
        ArtifactKind::Text => UPDATE_TEXT_TEMPLATE,
        ArtifactKind::Code => UPDATE_CODE_TEMPLATE,
        ArtifactKind::Sheet => UPDATE_SHEET_TEMPLATE,
        ArtifactKind::Image => return String::new(),
    };

    let mut prompt = PromptBuilder::new()
        .layer(template)
        .var("content", current_content.unwrap_or_default())
        .build();
    prompt.push('\n');
    prompt
}

/// Same as [`update_document_prompt`] for a raw kind tag; unknown tags
/// produce an empty string.
pub fn update_document_prompt_for_tag(current_content: Option<&str>, kind: &str) -> String {
    match ArtifactKind::parse_lossy(kind) {
        Some(kind) => update_document_prompt(current_content, kind),
        None => {
            tracing::debug!(kind, "no update template for artifact kind");
            String::new()
        }
    }
}
