//! Lightweight in-document symbol index.
//!
//! Regex-shaped, line-oriented recognition of function definitions,
//! file-scope variables, and macros. Backs the local fallbacks for
//! definition, references, and document/workspace symbols.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Variable,
    Macro,
}

#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: String,
    pub kind: SymbolKind,
    /// 0-based line of the definition.
    pub line: u32,
    /// 0-based column of the name within the line.
    pub col: u32,
    /// The declaration line, trimmed, for hover/detail display.
    pub detail: String,
}

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:static\s+)?(?:void|int|float|string|vec|entity)\s+([A-Za-z_]\w*)\s*\(")
            .expect("valid regex")
    })
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:local\s+|const\s+|static\s+)?(?:int|float|string|vec|entity)\s+([A-Za-z_]\w*)\s*[=;]")
            .expect("valid regex")
    })
}

fn macro_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#define\s+([A-Za-z_]\w*)").expect("valid regex"))
}

/// Index a document's symbols in one pass over its lines.
#[must_use]
pub fn index_document(text: &str) -> Vec<SymbolDef> {
    let mut symbols = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let matched = function_re()
            .captures(line)
            .map(|c| (c, SymbolKind::Function))
            .or_else(|| macro_re().captures(line).map(|c| (c, SymbolKind::Macro)))
            .or_else(|| {
                variable_re()
                    .captures(line)
                    .map(|c| (c, SymbolKind::Variable))
            });
        if let Some((captures, kind)) = matched {
            let name_match = captures.get(1).expect("group 1 always present");
            symbols.push(SymbolDef {
                name: name_match.as_str().to_string(),
                kind,
                line: line_no as u32,
                col: name_match.start() as u32,
                detail: line.trim().to_string(),
            });
        }
    }
    symbols
}

/// The identifier under a 0-based (line, character) position.
#[must_use]
pub fn word_at(text: &str, line: u32, character: u32) -> Option<String> {
    let line = text.lines().nth(line as usize)?;
    let chars: Vec<char> = line.chars().collect();
    let at = (character as usize).min(chars.len().saturating_sub(1));

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    if chars.is_empty() || !is_word(chars[at]) {
        return None;
    }
    let mut start = at;
    while start > 0 && is_word(chars[start - 1]) {
        start -= 1;
    }
    let mut end = at;
    while end + 1 < chars.len() && is_word(chars[end + 1]) {
        end += 1;
    }
    Some(chars[start..=end].iter().collect())
}

/// Every whole-word occurrence of `word`, as 0-based (line, column) pairs.
#[must_use]
pub fn occurrences(text: &str, word: &str) -> Vec<(u32, u32)> {
    let mut found = Vec::new();
    if word.is_empty() {
        return found;
    }
    for (line_no, line) in text.lines().enumerate() {
        let mut from = 0;
        while let Some(at) = line[from..].find(word) {
            let col = from + at;
            let before_ok = col == 0
                || !line[..col]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            let after = col + word.len();
            let after_ok = after >= line.len()
                || !line[after..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_');
            if before_ok && after_ok {
                found.push((line_no as u32, col as u32));
            }
            from = col + word.len();
        }
    }
    found
}
