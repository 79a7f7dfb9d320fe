//! Text edits and rewrite passes
//!
//! A rewrite pass inspects an immutable [`SourceFile`] and returns byte-range
//! edits. [`Rewrite`] applies each pass to produce a new file and re-parses
//! it, so a pass always sees a consistent tree and a failed pass leaves the
//! previous file untouched.

use crate::error::{SourceError, SourceResult};
use crate::syntax::SourceFile;
use std::ops::Range;
use tree_sitter::Node;

/// Replacement of one byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Replaced range
    pub range: Range<usize>,
    /// New text
    pub replacement: String,
}

impl TextEdit {
    /// Insert text at an offset
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }

    /// Delete a range
    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }

    /// Replace a range
    #[must_use]
    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }
}

/// Apply non-overlapping edits to text
///
/// # Errors
/// Returns [`SourceError::OverlappingEdits`] if two edits overlap or an edit
/// lies outside the text
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> SourceResult<String> {
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > text.len() {
            return Err(SourceError::OverlappingEdits(edit.range.start));
        }
        let kept = text
            .get(cursor..edit.range.start)
            .ok_or(SourceError::OverlappingEdits(edit.range.start))?;
        output.push_str(kept);
        output.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    output.push_str(text.get(cursor..).unwrap_or(""));
    Ok(output)
}

/// Functional rewrite pipeline over a source file
#[derive(Debug)]
pub struct Rewrite {
    file: SourceFile,
    strict: bool,
}

impl Rewrite {
    /// Start a rewrite
    ///
    /// Files that already contain syntax errors are rewritten leniently;
    /// clean files must stay clean.
    #[must_use]
    pub fn new(file: SourceFile) -> Self {
        let strict = !file.has_errors();
        Self { file, strict }
    }

    /// Current file
    #[inline]
    #[must_use]
    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    /// Run one pass and re-parse its output
    ///
    /// # Errors
    /// Propagates the pass error, or returns [`SourceError::InvalidRewrite`]
    /// if the edited text no longer parses cleanly
    pub fn pass<F>(self, pass: F) -> SourceResult<Self>
    where
        F: FnOnce(&SourceFile) -> SourceResult<Vec<TextEdit>>,
    {
        let edits = pass(&self.file)?;
        if edits.is_empty() {
            return Ok(self);
        }

        let text = apply_edits(self.file.text(), edits)?;
        let file = SourceFile::parse(text)?;
        if self.strict && file.has_errors() {
            return Err(SourceError::InvalidRewrite(first_error(&file)));
        }

        Ok(Self {
            file,
            strict: self.strict,
        })
    }

    /// Finish and return the rewritten file
    #[inline]
    #[must_use]
    pub fn finish(self) -> SourceFile {
        self.file
    }
}

fn first_error(file: &SourceFile) -> String {
    fn find(node: Node<'_>) -> Option<Node<'_>> {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().filter(|c| c.has_error()).find_map(find)
    }

    match find(file.root()) {
        Some(node) => format!(
            "syntax error at line {}, column {}",
            node.start_position().row + 1,
            node.start_position().column + 1
        ),
        None => "syntax error".to_string(),
    }
}

/// Extend a range to whole lines when it is alone on its lines
///
/// Leading indentation and the trailing newline are included so deleting
/// the result leaves no blank line behind. Ranges sharing a line with other
/// code only swallow trailing spaces.
pub(crate) fn line_span(text: &str, range: Range<usize>) -> Range<usize> {
    let bytes = text.as_bytes();
    let is_blank = |b: u8| b == b' ' || b == b'\t';

    let mut start = range.start;
    while start > 0 && is_blank(bytes[start - 1]) {
        start -= 1;
    }
    let at_line_start = start == 0 || bytes[start - 1] == b'\n';

    let mut end = range.end;
    while end < bytes.len() && (is_blank(bytes[end]) || bytes[end] == b'\r') {
        end += 1;
    }
    let at_line_end = end == bytes.len() || bytes[end] == b'\n';

    if at_line_start && at_line_end {
        start..(end + 1).min(bytes.len())
    } else {
        range.start..end
    }
}

/// Whether only whitespace follows `offset` on its line
pub(crate) fn rest_of_line_blank(text: &str, offset: usize) -> bool {
    text.get(offset..)
        .unwrap_or("")
        .chars()
        .take_while(|c| *c != '\n')
        .all(char::is_whitespace)
}

/// Start of the line containing `offset`, if only whitespace precedes it
pub(crate) fn line_start_if_leading(text: &str, offset: usize) -> Option<usize> {
    let before = text.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    before[line_start..]
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(line_start)
}

/// Delete one item of a comma-separated list of at least two items
pub(crate) fn remove_list_item(items: &[Node<'_>], index: usize) -> Option<TextEdit> {
    if items.len() < 2 || index >= items.len() {
        return None;
    }
    let item = items[index];
    let range = if index + 1 < items.len() {
        item.start_byte()..items[index + 1].start_byte()
    } else {
        items[index - 1].end_byte()..item.end_byte()
    };
    Some(TextEdit::delete(range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edits_apply_in_offset_order() {
        let text = "abcdef";
        let edits = vec![
            TextEdit::replace(4..6, "XY"),
            TextEdit::insert(0, ">"),
            TextEdit::delete(1..2),
        ];
        assert_eq!(apply_edits(text, edits).unwrap(), ">acdXY");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![TextEdit::delete(0..3), TextEdit::delete(2..4)];
        assert!(matches!(
            apply_edits("abcdef", edits),
            Err(SourceError::OverlappingEdits(2))
        ));
    }

    #[test]
    fn line_span_swallows_whole_lines_only() {
        let text = "a\n  b;\nc";
        assert_eq!(line_span(text, 4..6), 2..7);

        let text = "a; b; c";
        assert_eq!(line_span(text, 3..5), 3..6);
    }

    #[test]
    fn invalid_rewrite_keeps_previous_file() {
        let file = SourceFile::parse("class A {}\n").unwrap();
        let rewrite = Rewrite::new(file);
        let err = rewrite
            .pass(|_| Ok(vec![TextEdit::insert(0, "class {")]))
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidRewrite(_)));
    }

    #[test]
    fn helper_offsets_respect_indentation() {
        let text = "{\n  a;\n}";
        assert_eq!(line_start_if_leading(text, 4), Some(2));
        assert_eq!(line_start_if_leading(text, 5), None);
        assert!(rest_of_line_blank(text, 6));
        assert!(!rest_of_line_blank(text, 0));
    }
}
