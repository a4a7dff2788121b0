//! Prompt context assembled from retrieved chunks.

use tutor_core::types::ScoredResult;

pub const NO_CONTEXT_PLACEHOLDER: &str = "(no particularly relevant course material was found)";

/// One `[Source n]: filename (page p)` block per result, numbered from 1.
/// The page is omitted for unpaginated sources.
pub fn build_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let filename = if r.meta.filename.is_empty() { "unknown" } else { r.meta.filename.as_str() };
            let header = if r.meta.page_number > 0 {
                format!("[Source {}]: {} (page {})", i + 1, filename, r.meta.page_number)
            } else {
                format!("[Source {}]: {}", i + 1, filename)
            };
            format!("{}\n{}\n", header, r.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn context_or_placeholder(results: &[ScoredResult]) -> String {
    if results.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        build_context(results)
    }
}
