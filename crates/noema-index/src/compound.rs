//! Compound text builder — one canonical string per note.
//!
//! The ordering here is a contract: the annotated-note line (if any) comes
//! first, then the reference fragments in reference order, then the note's
//! own raw text last. Downstream summarization quality and test fixtures
//! depend on fragments preceding the raw note text.

use crate::references::{FragmentKind, ReferenceFragment};

/// Assemble the compound text for a note.
///
/// `annotated` carries the summary-or-text of the mentioned note, when this
/// note annotates another one. Fragments are joined with a blank line.
pub fn build_compound_text(
    note_text: &str,
    annotated: Option<&str>,
    fragments: &[ReferenceFragment],
) -> String {
    let mut parts = Vec::with_capacity(fragments.len() + 2);

    if let Some(context) = annotated.filter(|c| !c.trim().is_empty()) {
        parts.push(format!("[Annotated Note: {}]", context));
    }

    for fragment in fragments {
        let wrapped = match fragment.kind {
            FragmentKind::Image => format!("[Image: {}]", fragment.text),
            FragmentKind::Url => format!("[URL Reference: {}]", fragment.text),
        };
        parts.push(wrapped);
    }

    if !note_text.is_empty() {
        parts.push(note_text.to_string());
    }

    parts.join("\n\n")
}
