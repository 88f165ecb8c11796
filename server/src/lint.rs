//! Fast in-process heuristic checks.
//!
//! This is not a parser. It catches the handful of structural mistakes
//! worth flagging before the compiler gets a turn: unbalanced braces and
//! parentheses, unterminated strings and block comments, and malformed
//! vector literals. It also recognizes which lines use Crag dialect
//! syntax, which the reconciler's `filtered` mode needs.

use crag_types::{Diagnostic, DiagnosticOrigin, Severity};

use crate::lang;

/// Vector literals are quoted component triples: `'0 0 1'`.
fn vector_literal_components(body: &str) -> usize {
    body.split_whitespace()
        .filter(|part| part.parse::<f64>().is_ok())
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    StringLit,
    VectorLit,
}

/// Run the heuristic checks over a full document.
#[must_use]
pub fn check(text: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    let mut state = ScanState::Code;
    // Open delimiter stack: (char, line, col).
    let mut stack: Vec<(char, u32, u32)> = Vec::new();
    let mut token_start: (u32, u32) = (0, 0);
    let mut vector_body = String::new();

    let mut line: u32 = 0;
    let mut col: u32 = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScanState::Code => match c {
                '/' if chars.peek() == Some(&'/') => state = ScanState::LineComment,
                '/' if chars.peek() == Some(&'*') => {
                    token_start = (line, col);
                    state = ScanState::BlockComment;
                }
                '"' => {
                    token_start = (line, col);
                    state = ScanState::StringLit;
                }
                '\'' => {
                    token_start = (line, col);
                    vector_body.clear();
                    state = ScanState::VectorLit;
                }
                '{' | '(' | '[' => stack.push((c, line, col)),
                '}' | ')' | ']' => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match stack.pop() {
                        Some((open, ..)) if open == expected => {}
                        Some((open, open_line, open_col)) => {
                            diags.push(Diagnostic::new(
                                Severity::Error,
                                format!("mismatched '{c}'; last open delimiter is '{open}'"),
                                line,
                                col,
                                DiagnosticOrigin::Lint,
                            ));
                            // Restore so the opener still reports if never closed.
                            stack.push((open, open_line, open_col));
                        }
                        None => diags.push(Diagnostic::new(
                            Severity::Error,
                            format!("unmatched '{c}'"),
                            line,
                            col,
                            DiagnosticOrigin::Lint,
                        )),
                    }
                }
                _ => {}
            },
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    col += 1;
                    state = ScanState::Code;
                }
            }
            ScanState::StringLit => match c {
                '\\' => {
                    // Skip the escaped character.
                    if chars.next().is_some() {
                        col += 1;
                    }
                }
                '"' => state = ScanState::Code,
                '\n' => {
                    diags.push(Diagnostic::new(
                        Severity::Error,
                        "unterminated string literal".to_string(),
                        token_start.0,
                        token_start.1,
                        DiagnosticOrigin::Lint,
                    ));
                    state = ScanState::Code;
                }
                _ => {}
            },
            ScanState::VectorLit => match c {
                '\'' => {
                    let count = vector_literal_components(&vector_body);
                    if count != 3 {
                        diags.push(Diagnostic::new(
                            Severity::Warning,
                            format!("vector literal has {count} components; expected 3"),
                            token_start.0,
                            token_start.1,
                            DiagnosticOrigin::Lint,
                        ));
                    }
                    state = ScanState::Code;
                }
                '\n' => {
                    diags.push(Diagnostic::new(
                        Severity::Error,
                        "unterminated vector literal".to_string(),
                        token_start.0,
                        token_start.1,
                        DiagnosticOrigin::Lint,
                    ));
                    state = ScanState::Code;
                }
                _ => vector_body.push(c),
            },
        }

        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }

    match state {
        ScanState::BlockComment => diags.push(Diagnostic::new(
            Severity::Error,
            "unterminated block comment".to_string(),
            token_start.0,
            token_start.1,
            DiagnosticOrigin::Lint,
        )),
        ScanState::StringLit => diags.push(Diagnostic::new(
            Severity::Error,
            "unterminated string literal".to_string(),
            token_start.0,
            token_start.1,
            DiagnosticOrigin::Lint,
        )),
        ScanState::VectorLit => diags.push(Diagnostic::new(
            Severity::Error,
            "unterminated vector literal".to_string(),
            token_start.0,
            token_start.1,
            DiagnosticOrigin::Lint,
        )),
        ScanState::Code | ScanState::LineComment => {}
    }

    for (open, open_line, open_col) in stack {
        diags.push(Diagnostic::new(
            Severity::Error,
            format!("unclosed '{open}'"),
            open_line,
            open_col,
            DiagnosticOrigin::Lint,
        ));
    }

    diags
}

/// Whether a source line uses Crag dialect syntax a plain C analyzer
/// would not understand: a vector literal, a component accessor, or a
/// dialect keyword/builtin.
#[must_use]
pub fn is_dialect_line(line: &str) -> bool {
    if line.contains('\'') {
        return true;
    }
    words(line).any(|word| {
        lang::DIALECT_KEYWORDS.contains(&word)
            || lang::builtin(word).is_some()
            || lang::constant(word).is_some()
    })
}

fn words(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}
