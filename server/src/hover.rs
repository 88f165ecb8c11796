//! Tag-based hover and the analyzer/local merge rule.

use crate::analysis;
use crate::lang;

/// Hover markdown for a word from the static tables or the document's
/// own symbols.
#[must_use]
pub fn local_hover(word: &str, text: &str) -> Option<String> {
    if let Some(builtin) = lang::builtin(word) {
        return Some(format!(
            "```crag\n{}\n```\n\n{}",
            builtin.signature, builtin.doc
        ));
    }
    if let Some(description) = lang::constant(word) {
        return Some(format!("`{word}` — {description}"));
    }
    if lang::is_keyword(word) {
        return Some(format!("`{word}` — Crag keyword"));
    }
    analysis::index_document(text)
        .into_iter()
        .find(|symbol| symbol.name == word)
        .map(|symbol| format!("```crag\n{}\n```", symbol.detail))
}

/// Merge rule: non-empty sides joined by a rule; one empty side yields
/// the other unchanged.
#[must_use]
pub fn merge_hover(analyzer: Option<String>, local: Option<String>) -> Option<String> {
    match (analyzer, local) {
        (Some(a), Some(l)) => Some(format!("{a}\n\n---\n\n{l}")),
        (Some(a), None) => Some(a),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_hover_shows_signature() {
        let hover = local_hover("vlen", "").unwrap();
        assert!(hover.contains("float vlen(vec v)"));
        assert!(hover.contains("Euclidean length"));
    }

    #[test]
    fn constant_and_keyword_hover() {
        assert!(local_hover("VEC_UP", "").unwrap().contains("VEC_UP"));
        assert!(local_hover("entity", "").unwrap().contains("keyword"));
    }

    #[test]
    fn document_symbol_hover_shows_declaration() {
        let text = "float health = 100;\n";
        let hover = local_hover("health", text).unwrap();
        assert!(hover.contains("float health = 100;"));
    }

    #[test]
    fn unknown_word_has_no_hover() {
        assert!(local_hover("mystery", "int x;\n").is_none());
    }

    #[test]
    fn merge_prefers_both_with_separator() {
        let merged = merge_hover(Some("A".into()), Some("B".into())).unwrap();
        assert!(merged.starts_with("A"));
        assert!(merged.contains("---"));
        assert!(merged.ends_with("B"));
    }

    #[test]
    fn merge_passes_through_single_side() {
        assert_eq!(merge_hover(Some("A".into()), None), Some("A".into()));
        assert_eq!(merge_hover(None, Some("B".into())), Some("B".into()));
        assert_eq!(merge_hover(None, None), None);
    }
}
