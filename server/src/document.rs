//! Open-document store with incremental change application.
//!
//! Documents live in ropes; the editor's incremental `didChange` events
//! are applied by range. Positions arriving from the editor are clamped
//! rather than trusted — a malformed range must never panic the server.

use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};

#[derive(Debug, Clone)]
pub struct Document {
    pub rope: Rope,
    pub version: i32,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: DashMap<Url, Document>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, text: &str, version: i32) {
        self.docs.insert(
            uri,
            Document {
                rope: Rope::from_str(text),
                version,
            },
        );
    }

    /// Apply a `didChange` batch and return the resulting full text.
    /// Returns `None` for documents we never saw open.
    pub fn apply_changes(
        &self,
        uri: &Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Option<String> {
        let mut entry = self.docs.get_mut(uri)?;
        for change in changes {
            match change.range {
                Some(range) => apply_incremental(&mut entry.rope, range, &change.text),
                None => entry.rope = Rope::from_str(&change.text),
            }
        }
        entry.version = version;
        Some(entry.rope.to_string())
    }

    pub fn close(&self, uri: &Url) {
        self.docs.remove(uri);
    }

    #[must_use]
    pub fn text(&self, uri: &Url) -> Option<String> {
        self.docs.get(uri).map(|d| d.rope.to_string())
    }

    #[must_use]
    pub fn version(&self, uri: &Url) -> Option<i32> {
        self.docs.get(uri).map(|d| d.version)
    }

    #[must_use]
    pub fn open_uris(&self) -> Vec<Url> {
        self.docs.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn apply_incremental(rope: &mut Rope, range: Range, text: &str) {
    let start = position_to_char(rope, range.start);
    let end = position_to_char(rope, range.end).max(start);
    rope.remove(start..end);
    rope.insert(start, text);
}

/// Clamp an LSP position to a char index in the rope.
fn position_to_char(rope: &Rope, pos: Position) -> usize {
    let line = (pos.line as usize).min(rope.len_lines().saturating_sub(1));
    let line_start = rope.line_to_char(line);
    let line_len = rope.line(line).len_chars();
    line_start + (pos.character as usize).min(line_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("file:///src/game.crag").unwrap()
    }

    fn change(range: Option<Range>, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range,
            range_length: None,
            text: text.to_string(),
        }
    }

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn open_and_read_back() {
        let store = DocumentStore::new();
        store.open(url(), "void main() {}\n", 1);
        assert_eq!(store.text(&url()).unwrap(), "void main() {}\n");
        assert_eq!(store.version(&url()), Some(1));
    }

    #[test]
    fn full_replace_change() {
        let store = DocumentStore::new();
        store.open(url(), "old\n", 1);
        let text = store
            .apply_changes(&url(), 2, &[change(None, "new\n")])
            .unwrap();
        assert_eq!(text, "new\n");
        assert_eq!(store.version(&url()), Some(2));
    }

    #[test]
    fn incremental_insert() {
        let store = DocumentStore::new();
        store.open(url(), "vec v;\n", 1);
        let text = store
            .apply_changes(&url(), 2, &[change(Some(range(0, 4, 0, 4)), "up")])
            .unwrap();
        assert_eq!(text, "vec upv;\n");
    }

    #[test]
    fn incremental_replace_across_lines() {
        let store = DocumentStore::new();
        store.open(url(), "aaa\nbbb\nccc\n", 1);
        let text = store
            .apply_changes(&url(), 2, &[change(Some(range(0, 1, 2, 1)), "X")])
            .unwrap();
        assert_eq!(text, "aXcc\n");
    }

    #[test]
    fn out_of_bounds_positions_are_clamped() {
        let store = DocumentStore::new();
        store.open(url(), "short\n", 1);
        let text = store
            .apply_changes(&url(), 2, &[change(Some(range(0, 90, 9, 90)), "!")])
            .unwrap();
        assert_eq!(text, "short\n!");
    }

    #[test]
    fn changes_apply_in_sequence() {
        let store = DocumentStore::new();
        store.open(url(), "", 1);
        let text = store
            .apply_changes(
                &url(),
                2,
                &[
                    change(Some(range(0, 0, 0, 0)), "a"),
                    change(Some(range(0, 1, 0, 1)), "b"),
                ],
            )
            .unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn unknown_document_returns_none() {
        let store = DocumentStore::new();
        assert!(store.apply_changes(&url(), 2, &[change(None, "x")]).is_none());
    }

    #[test]
    fn close_removes() {
        let store = DocumentStore::new();
        store.open(url(), "x", 1);
        store.close(&url());
        assert!(store.text(&url()).is_none());
        assert!(store.is_empty());
    }
}
