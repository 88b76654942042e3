//! Core update-check logic for storegate.
//!
//! This crate is independent of any concrete UI or bridge:
//! - Dotted-numeric version comparison.
//! - Catalog lookup of the latest published version.
//! - The update decision and the blocking prompt it triggers.
//! - The UI thread that owns the prompt surface.

pub mod catalog;
pub mod decision;
pub mod prompt;
mod version;

/// Catalog identifiers, lookup errors, and the iTunes lookup client.
pub use catalog::{AppId, CatalogError, CatalogSource, ItunesCatalog, parse_lookup_response};
/// Update decision service and its outcome types.
pub use decision::{
    CheckError, DecisionConfig, OutcomeCode, PresentationOverrides, UpdateDecision,
    UpdateDecisionService,
};
/// Prompt content, presentation seams, and the UI thread handle.
pub use prompt::{BlockingPrompt, PROMPT_TAG, PresentationGateway, PromptSurface, UiThread};
/// Version comparison helpers.
pub use version::{
    VersionParseError, compare_versions, has_dropped_segments, is_older, parse_segments_strict,
};
