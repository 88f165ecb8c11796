//! Semantic tokens from a line-based lexical scan over the static tables.

use tower_lsp::lsp_types::{SemanticToken, SemanticTokenType};

use crate::lang;

/// Token types advertised in the legend; indexes below must match.
#[must_use]
pub fn legend() -> Vec<SemanticTokenType> {
    vec![
        SemanticTokenType::KEYWORD,
        SemanticTokenType::TYPE,
        SemanticTokenType::FUNCTION,
        SemanticTokenType::VARIABLE,
        SemanticTokenType::STRING,
        SemanticTokenType::NUMBER,
        SemanticTokenType::COMMENT,
    ]
}

const KEYWORD: u32 = 0;
const TYPE: u32 = 1;
const FUNCTION: u32 = 2;
const VARIABLE: u32 = 3;
const STRING: u32 = 4;
const NUMBER: u32 = 5;
const COMMENT: u32 = 6;

struct RawToken {
    line: u32,
    start: u32,
    length: u32,
    token_type: u32,
}

/// Scan a document and return delta-encoded semantic tokens.
#[must_use]
pub fn scan(text: &str) -> Vec<SemanticToken> {
    let mut raw = Vec::new();
    let mut in_block_comment = false;

    for (line_no, line) in text.lines().enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0usize;

        if in_block_comment {
            let close = find_close_comment(&chars, 0);
            let end = close.unwrap_or(chars.len());
            push(&mut raw, line_no, 0, end, COMMENT);
            if close.is_none() {
                continue;
            }
            in_block_comment = false;
            i = end;
        }

        while i < chars.len() {
            let c = chars[i];
            if c == '/' && chars.get(i + 1) == Some(&'/') {
                push(&mut raw, line_no, i, chars.len(), COMMENT);
                break;
            }
            if c == '/' && chars.get(i + 1) == Some(&'*') {
                match find_close_comment(&chars, i + 2) {
                    Some(end) => {
                        push(&mut raw, line_no, i, end, COMMENT);
                        i = end;
                    }
                    None => {
                        push(&mut raw, line_no, i, chars.len(), COMMENT);
                        in_block_comment = true;
                        i = chars.len();
                    }
                }
                continue;
            }
            if c == '"' {
                let end = find_string_end(&chars, i + 1);
                push(&mut raw, line_no, i, end, STRING);
                i = end;
                continue;
            }
            if c == '\'' {
                // Vector literal: highlight as a numeric token.
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '\'')
                    .map_or(chars.len(), |at| i + 2 + at);
                push(&mut raw, line_no, i, end, NUMBER);
                i = end;
                continue;
            }
            if c == '#' {
                let end = word_end(&chars, i + 1);
                push(&mut raw, line_no, i, end, KEYWORD);
                i = end;
                continue;
            }
            if c.is_ascii_digit() {
                let mut end = i + 1;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '.')
                {
                    end += 1;
                }
                push(&mut raw, line_no, i, end, NUMBER);
                i = end;
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                let end = word_end(&chars, i);
                let word: String = chars[i..end].iter().collect();
                if let Some(token_type) = classify_word(&word) {
                    push(&mut raw, line_no, i, end, token_type);
                }
                i = end;
                continue;
            }
            i += 1;
        }
    }

    delta_encode(&raw)
}

fn classify_word(word: &str) -> Option<u32> {
    if lang::TYPE_KEYWORDS.contains(&word) {
        Some(TYPE)
    } else if lang::is_keyword(word) {
        Some(KEYWORD)
    } else if lang::builtin(word).is_some() {
        Some(FUNCTION)
    } else if lang::constant(word).is_some() {
        Some(VARIABLE)
    } else {
        None
    }
}

fn word_end(chars: &[char], from: usize) -> usize {
    let mut end = from;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

fn find_close_comment(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1))
        .find(|&i| chars[i] == '*' && chars[i + 1] == '/')
        .map(|i| i + 2)
}

fn find_string_end(chars: &[char], mut from: usize) -> usize {
    while from < chars.len() {
        match chars[from] {
            '\\' => from += 2,
            '"' => return from + 1,
            _ => from += 1,
        }
    }
    chars.len()
}

fn push(raw: &mut Vec<RawToken>, line: usize, start: usize, end: usize, token_type: u32) {
    if end > start {
        raw.push(RawToken {
            line: line as u32,
            start: start as u32,
            length: (end - start) as u32,
            token_type,
        });
    }
}

fn delta_encode(raw: &[RawToken]) -> Vec<SemanticToken> {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut prev_line = 0;
    let mut prev_start = 0;
    for token in raw {
        let delta_line = token.line - prev_line;
        let delta_start = if delta_line == 0 {
            token.start - prev_start
        } else {
            token.start
        };
        tokens.push(SemanticToken {
            delta_line,
            delta_start,
            length: token.length,
            token_type: token.token_type,
            token_modifiers_bitset: 0,
        });
        prev_line = token.line;
        prev_start = token.start;
    }
    tokens
}
