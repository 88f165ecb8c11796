//! Tag-based completion: context detection, the static item set, and the
//! analyzer/local merge rule.

use std::sync::OnceLock;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind,
};

use crate::analysis::{self, SymbolKind};
use crate::lang;

/// What the cursor position asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionContext {
    /// Inside an `#include` directive: offer headers only.
    Include,
    /// After a trailing dot on an identifier: offer vec components only.
    ComponentAccess,
    /// Anywhere else: the full static set plus document symbols.
    General,
}

/// Classify the text before the cursor on the current line.
#[must_use]
pub fn completion_context(line_prefix: &str) -> CompletionContext {
    if line_prefix.trim_start().starts_with("#include") {
        return CompletionContext::Include;
    }

    // `ident.` or `expr).` — component access on a vec value. A numeric
    // token before the dot is a float literal, not a receiver.
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let trimmed = line_prefix.trim_end_matches(is_word);
    if let Some(before_dot) = trimmed.strip_suffix('.') {
        let token: String = before_dot.chars().rev().take_while(|&c| is_word(c)).collect();
        if !token.is_empty() && !token.chars().all(|c| c.is_ascii_digit()) {
            return CompletionContext::ComponentAccess;
        }
        if token.is_empty() && before_dot.ends_with([')', ']']) {
            return CompletionContext::ComponentAccess;
        }
    }
    CompletionContext::General
}

fn doc(markdown: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: markdown,
    })
}

/// The full static item set: keywords, builtins, constants. Built once,
/// cached for the life of the process.
pub fn static_items() -> &'static [CompletionItem] {
    static ITEMS: OnceLock<Vec<CompletionItem>> = OnceLock::new();
    ITEMS.get_or_init(|| {
        let mut items = Vec::new();
        for kw in lang::KEYWORDS {
            items.push(CompletionItem {
                label: (*kw).to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..CompletionItem::default()
            });
        }
        for builtin in lang::BUILTINS {
            items.push(CompletionItem {
                label: builtin.name.to_string(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(builtin.signature.to_string()),
                documentation: Some(doc(builtin.doc.to_string())),
                ..CompletionItem::default()
            });
        }
        for (name, description) in lang::CONSTANTS {
            items.push(CompletionItem {
                label: (*name).to_string(),
                kind: Some(CompletionItemKind::CONSTANT),
                documentation: Some(doc((*description).to_string())),
                ..CompletionItem::default()
            });
        }
        items
    })
}

#[must_use]
pub fn header_items() -> Vec<CompletionItem> {
    lang::HEADERS
        .iter()
        .map(|header| CompletionItem {
            label: (*header).to_string(),
            kind: Some(CompletionItemKind::FILE),
            ..CompletionItem::default()
        })
        .collect()
}

#[must_use]
pub fn component_items() -> Vec<CompletionItem> {
    lang::COMPONENT_ACCESSORS
        .iter()
        .map(|(name, description)| CompletionItem {
            label: (*name).to_string(),
            kind: Some(CompletionItemKind::FIELD),
            documentation: Some(doc((*description).to_string())),
            ..CompletionItem::default()
        })
        .collect()
}

/// Items for the symbols defined in the open document.
#[must_use]
pub fn document_items(text: &str) -> Vec<CompletionItem> {
    analysis::index_document(text)
        .into_iter()
        .map(|symbol| CompletionItem {
            label: symbol.name,
            kind: Some(match symbol.kind {
                SymbolKind::Function => CompletionItemKind::FUNCTION,
                SymbolKind::Variable => CompletionItemKind::VARIABLE,
                SymbolKind::Macro => CompletionItemKind::CONSTANT,
            }),
            detail: Some(symbol.detail),
            ..CompletionItem::default()
        })
        .collect()
}

/// Local items for a context.
#[must_use]
pub fn local_items(context: CompletionContext, text: &str) -> Vec<CompletionItem> {
    match context {
        CompletionContext::Include => header_items(),
        CompletionContext::ComponentAccess => component_items(),
        CompletionContext::General => {
            let mut items = static_items().to_vec();
            items.extend(document_items(text));
            items
        }
    }
}

/// Merge rule: analyzer items lead, local items follow, first label wins.
#[must_use]
pub fn merge_items(
    analyzer: Vec<CompletionItem>,
    local: Vec<CompletionItem>,
) -> Vec<CompletionItem> {
    let mut seen = std::collections::HashSet::new();
    analyzer
        .into_iter()
        .chain(local)
        .filter(|item| seen.insert(item.label.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> CompletionItem {
        CompletionItem {
            label: label.to_string(),
            ..CompletionItem::default()
        }
    }

    #[test]
    fn include_context() {
        assert_eq!(completion_context("#include \""), CompletionContext::Include);
        assert_eq!(
            completion_context("  #include <cr"),
            CompletionContext::Include
        );
    }

    #[test]
    fn component_access_context() {
        assert_eq!(completion_context("dir."), CompletionContext::ComponentAccess);
        assert_eq!(
            completion_context("    v = origin."),
            CompletionContext::ComponentAccess
        );
        assert_eq!(
            completion_context("aim_at(e)."),
            CompletionContext::ComponentAccess
        );
        // Partially-typed component still counts.
        assert_eq!(completion_context("dir.x"), CompletionContext::ComponentAccess);
    }

    #[test]
    fn general_context() {
        assert_eq!(completion_context("local vec "), CompletionContext::General);
        assert_eq!(completion_context(""), CompletionContext::General);
        // A bare number's decimal point is not component access.
        assert_eq!(completion_context("x = 1."), CompletionContext::General);
    }

    #[test]
    fn static_items_cover_all_tables() {
        let items = static_items();
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"vec"));
        assert!(labels.contains(&"vlen"));
        assert!(labels.contains(&"VEC_ZERO"));
        assert_eq!(
            items.len(),
            lang::KEYWORDS.len() + lang::BUILTINS.len() + lang::CONSTANTS.len()
        );
    }

    #[test]
    fn static_items_are_cached() {
        assert!(std::ptr::eq(static_items(), static_items()));
    }

    #[test]
    fn include_context_yields_only_headers() {
        let items = local_items(CompletionContext::Include, "");
        assert_eq!(items.len(), lang::HEADERS.len());
        assert!(items.iter().all(|i| i.label.ends_with(".h")));
    }

    #[test]
    fn component_context_yields_xyz() {
        let items = local_items(CompletionContext::ComponentAccess, "");
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["x", "y", "z"]);
    }

    #[test]
    fn general_context_includes_document_symbols() {
        let items = local_items(CompletionContext::General, "void my_fn() {}\n");
        assert!(items.iter().any(|i| i.label == "my_fn"));
    }

    #[test]
    fn merge_puts_analyzer_first_and_dedups_by_label() {
        let merged = merge_items(
            vec![item("alpha"), item("beta")],
            vec![item("beta"), item("gamma")],
        );
        let labels: Vec<&str> = merged.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "beta", "gamma"]);
    }
}
