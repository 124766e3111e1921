//! Prompt construction and versioning (C6/C7)
//!
//! The system prompt is fixed per taxonomy; the user prompt embeds a
//! file's path context and extracted text. The prompt version hash lets
//! a label row record exactly which prompt shape produced it without
//! storing the whole prompt text in every row.

use crate::core::config::TaxonomyConfig;
use crate::core::constants::{
    PROMPT_TEXT_MAX_LENGTH, PROMPT_TRUNCATION_HEAD_RATIO, PROMPT_TRUNCATION_MARKER,
    PROMPT_VERSION_HASH_LEN,
};
use crate::utils::crypto::sha256_hex;

use super::context::LabelingContext;

pub fn system_prompt(taxonomy: &TaxonomyConfig) -> String {
    format!(
        "You are a document classification assistant for a personal archive. \
        Classify each document using exactly one of these document types: {}. \
        Top-level groups are: {}. Available tags: {}. \
        Respond with a single JSON object only, no markdown fences, no commentary, \
        with the fields: doc_type, title, canonical_filename, suggested_tags (array), \
        target_group_path, date (YYYY-MM-DD or null), issuer, confidence (0.0-1.0), \
        explanation.",
        taxonomy.doc_types.join(", "),
        taxonomy.top_level.join(", "),
        taxonomy.tags.join(", "),
    )
}

pub fn user_prompt(context: &LabelingContext, text: &str) -> String {
    format!(
        "File path: {}\nParent directories: {}\n\nExtracted text:\n{}",
        context.path,
        context.parent_dirs.join(" / "),
        truncate_for_prompt(text),
    )
}

/// Truncate embedded text to `PROMPT_TEXT_MAX_LENGTH`, keeping the head
/// and tail and marking the cut the same way the extraction store marks
/// its own truncation.
fn truncate_for_prompt(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= PROMPT_TEXT_MAX_LENGTH {
        return text.to_string();
    }

    let head_len = ((PROMPT_TEXT_MAX_LENGTH as f64) * PROMPT_TRUNCATION_HEAD_RATIO) as usize;
    let tail_len = PROMPT_TEXT_MAX_LENGTH.saturating_sub(head_len);

    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();

    format!("{head}{PROMPT_TRUNCATION_MARKER}{tail}")
}

/// Hash of the system prompt plus the *structure* of the user prompt
/// (not a specific file's content), truncated to `PROMPT_VERSION_HASH_LEN`
/// hex characters. Changes only when the prompt shape changes, so labels
/// produced under the same taxonomy share one prompt_version.
pub fn prompt_version(taxonomy: &TaxonomyConfig) -> String {
    let system = system_prompt(taxonomy);
    let structural_user = "File path: {path}\nParent directories: {parents}\n\nExtracted text:\n{text}";
    let combined = format!("{system}\n---\n{structural_user}");
    let full = sha256_hex(&combined);
    full[..PROMPT_VERSION_HASH_LEN].to_string()
}
