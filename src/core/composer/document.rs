//! The inline document under the input box.
//!
//! Caret positions are counted in editing units: one unit per grapheme of a
//! text run, one unit per mention token. A mention therefore behaves as a
//! single character for every caret and deletion operation, which is what
//! makes it atomic — the caret can never rest inside one.

use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(String),
    Mention { id: String, name: String },
}

impl InlineNode {
    pub fn is_mention(&self) -> bool {
        matches!(self, InlineNode::Mention { .. })
    }

    /// Display rendering: text runs verbatim, mentions as `@name`.
    pub fn visible_text(&self) -> String {
        match self {
            InlineNode::Text(s) => s.clone(),
            InlineNode::Mention { name, .. } => format!("@{name}"),
        }
    }

    fn unit_count(&self) -> usize {
        match self {
            InlineNode::Text(s) => grapheme_count(s),
            InlineNode::Mention { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub paragraph: usize,
    pub unit: usize,
}

#[derive(Debug, Clone)]
pub struct Document {
    paragraphs: Vec<Vec<InlineNode>>,
    caret: Caret,
}

/// Where a unit offset lands inside a paragraph's node list.
enum Cursor {
    /// Inside (or at either edge of) a text node.
    InText { node: usize, byte: usize },
    /// Between nodes with no text node adjacent on the left; `node` is the
    /// index an insertion would take.
    AtBoundary { node: usize },
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            paragraphs: vec![Vec::new()],
            caret: Caret {
                paragraph: 0,
                unit: 0,
            },
        }
    }

    /// Reset to a single empty paragraph with the caret in it.
    pub fn clear(&mut self) {
        self.paragraphs = vec![Vec::new()];
        self.caret = Caret {
            paragraph: 0,
            unit: 0,
        };
    }

    pub fn caret(&self) -> Caret {
        self.caret
    }

    pub fn paragraphs(&self) -> &[Vec<InlineNode>] {
        &self.paragraphs
    }

    fn current_nodes(&self) -> &Vec<InlineNode> {
        &self.paragraphs[self.caret.paragraph]
    }

    fn unit_count_of(&self, paragraph: usize) -> usize {
        self.paragraphs[paragraph]
            .iter()
            .map(InlineNode::unit_count)
            .sum()
    }

    // ---- editing ----

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0_u8; 4];
        self.insert_text(c.encode_utf8(&mut buf));
    }

    /// Insert sanitized text at the caret. Newlines split paragraphs.
    pub fn insert_text(&mut self, text: &str) {
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.insert_paragraph_break();
            }
            if !segment.is_empty() {
                self.insert_run(segment);
            }
        }
    }

    fn insert_run(&mut self, run: &str) {
        let par = self.caret.paragraph;
        let (node, byte) = match cursor_at(&self.paragraphs[par], self.caret.unit) {
            Cursor::InText { node, byte } => {
                if let InlineNode::Text(s) = &mut self.paragraphs[par][node] {
                    s.insert_str(byte, run);
                }
                (node, byte + run.len())
            }
            Cursor::AtBoundary { node } => {
                self.paragraphs[par].insert(node, InlineNode::Text(run.to_string()));
                (node, run.len())
            }
        };
        self.caret.unit = unit_offset(&self.paragraphs[par], node, byte);
        self.normalize(par);
    }

    /// Split the current paragraph at the caret (Alt+Enter).
    pub fn insert_paragraph_break(&mut self) {
        let par = self.caret.paragraph;
        let tail = match cursor_at(&self.paragraphs[par], self.caret.unit) {
            Cursor::InText { node, byte } => {
                let mut tail: Vec<InlineNode> = self.paragraphs[par].split_off(node + 1);
                if let InlineNode::Text(s) = &mut self.paragraphs[par][node] {
                    let rest = s.split_off(byte);
                    if !rest.is_empty() {
                        tail.insert(0, InlineNode::Text(rest));
                    }
                }
                tail
            }
            Cursor::AtBoundary { node } => self.paragraphs[par].split_off(node),
        };
        self.normalize(par);
        self.paragraphs.insert(par + 1, tail);
        self.normalize(par + 1);
        self.caret = Caret {
            paragraph: par + 1,
            unit: 0,
        };
    }

    /// Delete the unit before the caret. A mention goes as a whole; at the
    /// start of a paragraph the paragraph merges into the previous one.
    pub fn backspace(&mut self) {
        let Caret { paragraph, unit } = self.caret;
        if unit == 0 {
            if paragraph == 0 {
                return;
            }
            let nodes = self.paragraphs.remove(paragraph);
            let prev_units = self.unit_count_of(paragraph - 1);
            self.paragraphs[paragraph - 1].extend(nodes);
            self.normalize(paragraph - 1);
            self.caret = Caret {
                paragraph: paragraph - 1,
                unit: prev_units,
            };
            return;
        }
        self.remove_unit(paragraph, unit - 1);
        self.caret.unit = unit - 1;
    }

    /// Delete the unit after the caret, merging the next paragraph in when
    /// the caret sits at the end of one.
    pub fn delete_forward(&mut self) {
        let Caret { paragraph, unit } = self.caret;
        if unit == self.unit_count_of(paragraph) {
            if paragraph + 1 == self.paragraphs.len() {
                return;
            }
            let nodes = self.paragraphs.remove(paragraph + 1);
            self.paragraphs[paragraph].extend(nodes);
            self.normalize(paragraph);
            return;
        }
        self.remove_unit(paragraph, unit);
    }

    fn remove_unit(&mut self, paragraph: usize, unit: usize) {
        let nodes = &mut self.paragraphs[paragraph];
        let mut remaining = unit;
        for idx in 0..nodes.len() {
            match &mut nodes[idx] {
                InlineNode::Text(s) => {
                    let count = grapheme_count(s);
                    if remaining < count {
                        let start = byte_of_grapheme(s, remaining);
                        let end = byte_of_grapheme(s, remaining + 1);
                        s.replace_range(start..end, "");
                        break;
                    }
                    remaining -= count;
                }
                InlineNode::Mention { .. } => {
                    if remaining == 0 {
                        nodes.remove(idx);
                        break;
                    }
                    remaining -= 1;
                }
            }
        }
        self.normalize(paragraph);
    }

    // ---- caret movement ----

    pub fn move_left(&mut self) {
        if self.caret.unit > 0 {
            self.caret.unit -= 1;
        } else if self.caret.paragraph > 0 {
            self.caret.paragraph -= 1;
            self.caret.unit = self.unit_count_of(self.caret.paragraph);
        }
    }

    pub fn move_right(&mut self) {
        if self.caret.unit < self.unit_count_of(self.caret.paragraph) {
            self.caret.unit += 1;
        } else if self.caret.paragraph + 1 < self.paragraphs.len() {
            self.caret.paragraph += 1;
            self.caret.unit = 0;
        }
    }

    pub fn move_home(&mut self) {
        self.caret.unit = 0;
    }

    pub fn move_end(&mut self) {
        self.caret.unit = self.unit_count_of(self.caret.paragraph);
    }

    // ---- trigger support ----

    /// The contiguous plain-text run immediately before the caret, cut at
    /// the nearest mention token or paragraph start. Trigger detection runs
    /// over this slice only, so an existing mention can never sit between a
    /// candidate `@` and the caret.
    pub fn text_before_caret(&self) -> String {
        match cursor_at(self.current_nodes(), self.caret.unit) {
            Cursor::InText { node, byte } => match &self.current_nodes()[node] {
                InlineNode::Text(s) => s[..byte].to_string(),
                InlineNode::Mention { .. } => String::new(),
            },
            Cursor::AtBoundary { .. } => String::new(),
        }
    }

    /// Visible text of the caret paragraph up to the caret, mentions
    /// rendered as `@name`. The UI uses this for caret and popup geometry.
    pub fn visible_prefix_of_caret(&self) -> String {
        let nodes = self.current_nodes();
        let mut out = String::new();
        let mut remaining = self.caret.unit;
        for node in nodes {
            if remaining == 0 {
                break;
            }
            match node {
                InlineNode::Text(s) => {
                    let count = grapheme_count(s);
                    if remaining < count {
                        out.push_str(&s[..byte_of_grapheme(s, remaining)]);
                        remaining = 0;
                    } else {
                        out.push_str(s);
                        remaining -= count;
                    }
                }
                InlineNode::Mention { name, .. } => {
                    out.push('@');
                    out.push_str(name);
                    remaining -= 1;
                }
            }
        }
        out
    }

    // ---- token commit ----

    /// Replace the live trigger — `trigger_chars` characters ending at the
    /// caret, `@` included — with a mention token, guarantee exactly one
    /// trailing space, and park the caret after that space.
    pub fn commit_mention(&mut self, trigger_chars: usize, id: &str, name: &str) {
        let par = self.caret.paragraph;
        let Cursor::InText { node, byte } = cursor_at(&self.paragraphs[par], self.caret.unit)
        else {
            return;
        };

        let (left, right) = {
            let InlineNode::Text(s) = &self.paragraphs[par][node] else {
                return;
            };
            let before = &s[..byte];
            let trigger_bytes: usize = before
                .chars()
                .rev()
                .take(trigger_chars)
                .map(char::len_utf8)
                .sum();
            let start = byte - trigger_bytes;
            (s[..start].to_string(), s[byte..].to_string())
        };

        // Exactly one space follows the token no matter what the trigger had
        // after it: leading spaces on the remainder collapse into the one we
        // insert.
        let after = format!(" {}", right.trim_start_matches(' '));

        let mention = InlineNode::Mention {
            id: id.to_string(),
            name: name.to_string(),
        };
        let mut replacement = Vec::new();
        if !left.is_empty() {
            replacement.push(InlineNode::Text(left.clone()));
        }
        replacement.push(mention);
        replacement.push(InlineNode::Text(after));

        let prefix_units: usize = self.paragraphs[par][..node]
            .iter()
            .map(InlineNode::unit_count)
            .sum();
        self.paragraphs[par].splice(node..=node, replacement);
        self.normalize(par);

        // everything before the edited node + left graphemes + the mention
        // + the guaranteed space
        self.caret.unit = prefix_units + grapheme_count(&left) + 2;
    }

    // ---- queries ----

    /// Identifiers of every mention currently in the document, in order,
    /// deduplicated.
    pub fn mention_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for nodes in &self.paragraphs {
            for node in nodes {
                if let InlineNode::Mention { id, .. } = node {
                    if !ids.iter().any(|existing| existing == id) {
                        ids.push(id.clone());
                    }
                }
            }
        }
        ids
    }

    /// Human-facing rendering: mentions as `@name`, paragraphs joined by
    /// line breaks.
    pub fn visible_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .map(InlineNode::visible_text)
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Wire rendering: identical to the visible form except a mention
    /// carries its identifier tag. Trailing whitespace is trimmed.
    pub fn processed_text(&self) -> String {
        let joined = self
            .paragraphs
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| match node {
                        InlineNode::Text(s) => s.clone(),
                        InlineNode::Mention { id, name } => format!("@{name} [fileID{id}]"),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        joined.trim_end().to_string()
    }

    pub fn is_blank(&self) -> bool {
        self.visible_text().trim().is_empty()
    }

    // Drop empty text runs and merge adjacent ones. Unit offsets are
    // preserved, so the caret stays valid.
    fn normalize(&mut self, paragraph: usize) {
        let nodes = &mut self.paragraphs[paragraph];
        nodes.retain(|node| !matches!(node, InlineNode::Text(s) if s.is_empty()));
        let mut idx = 1;
        while idx < nodes.len() {
            if let (InlineNode::Text(_), InlineNode::Text(next)) =
                (&nodes[idx - 1], nodes[idx].clone())
            {
                if let InlineNode::Text(prev) = &mut nodes[idx - 1] {
                    prev.push_str(&next);
                }
                nodes.remove(idx);
            } else {
                idx += 1;
            }
        }
    }
}

fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

// Byte offset of the `idx`-th grapheme boundary; `idx == count` maps to the
// end of the string.
fn byte_of_grapheme(s: &str, idx: usize) -> usize {
    s.grapheme_indices(true)
        .nth(idx)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

fn cursor_at(nodes: &[InlineNode], unit: usize) -> Cursor {
    let mut remaining = unit;
    for (idx, node) in nodes.iter().enumerate() {
        match node {
            InlineNode::Text(s) => {
                let count = grapheme_count(s);
                if remaining <= count {
                    return Cursor::InText {
                        node: idx,
                        byte: byte_of_grapheme(s, remaining),
                    };
                }
                remaining -= count;
            }
            InlineNode::Mention { .. } => {
                if remaining == 0 {
                    return Cursor::AtBoundary { node: idx };
                }
                remaining -= 1;
            }
        }
    }
    Cursor::AtBoundary { node: nodes.len() }
}

// Unit offset corresponding to a byte position inside a given node.
fn unit_offset(nodes: &[InlineNode], node: usize, byte: usize) -> usize {
    let mut units = 0;
    for earlier in &nodes[..node] {
        units += earlier.unit_count();
    }
    if let InlineNode::Text(s) = &nodes[node] {
        units += s[..byte].graphemes(true).count();
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(doc: &mut Document, text: &str) {
        for c in text.chars() {
            doc.insert_char(c);
        }
    }

    fn mention(id: &str, name: &str) -> InlineNode {
        InlineNode::Mention {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn typing_builds_a_single_text_run() {
        let mut doc = Document::new();
        type_str(&mut doc, "hello");
        assert_eq!(doc.visible_text(), "hello");
        assert_eq!(doc.caret().unit, 5);
        assert_eq!(doc.paragraphs()[0].len(), 1);
    }

    #[test]
    fn paragraph_break_splits_at_caret() {
        let mut doc = Document::new();
        type_str(&mut doc, "ab");
        doc.move_left();
        doc.insert_paragraph_break();
        assert_eq!(doc.visible_text(), "a\nb");
        assert_eq!(doc.caret(), Caret { paragraph: 1, unit: 0 });
    }

    #[test]
    fn backspace_at_paragraph_start_merges_up() {
        let mut doc = Document::new();
        type_str(&mut doc, "ab");
        doc.insert_paragraph_break();
        type_str(&mut doc, "cd");
        doc.move_home();
        doc.backspace();
        assert_eq!(doc.visible_text(), "abcd");
        assert_eq!(doc.caret(), Caret { paragraph: 0, unit: 2 });
    }

    #[test]
    fn commit_replaces_trigger_and_adds_one_space() {
        let mut doc = Document::new();
        type_str(&mut doc, "Hi @al");
        doc.commit_mention(3, "1", "Alpha");
        assert_eq!(doc.visible_text(), "Hi @Alpha ");
        assert_eq!(doc.mention_ids(), vec!["1".to_string()]);
        // caret right after the guaranteed space
        assert_eq!(doc.caret().unit, 5);
    }

    #[test]
    fn commit_collapses_existing_spaces_to_exactly_one() {
        for following in ["", " ", "   "] {
            let mut doc = Document::new();
            type_str(&mut doc, "see @rep");
            type_str(&mut doc, following);
            type_str(&mut doc, "now");
            // put the caret back right after "@rep"
            for _ in 0..(following.chars().count() + 3) {
                doc.move_left();
            }
            doc.commit_mention(4, "42", "Report");
            assert_eq!(
                doc.visible_text(),
                "see @Report now",
                "following={following:?}"
            );
        }
    }

    #[test]
    fn commit_before_adjacent_mention_still_gets_a_space() {
        let mut doc = Document::new();
        type_str(&mut doc, "x @a");
        doc.commit_mention(2, "1", "Alpha");
        // type a second trigger right after the first token's space
        type_str(&mut doc, "@b");
        doc.commit_mention(2, "2", "Beta");
        assert_eq!(doc.visible_text(), "x @Alpha @Beta ");
        assert_eq!(doc.mention_ids(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn mention_is_deleted_as_a_whole() {
        let mut doc = Document::new();
        type_str(&mut doc, "hi @a");
        doc.commit_mention(2, "1", "Alpha");
        doc.backspace(); // the space
        doc.backspace(); // the whole token
        assert_eq!(doc.visible_text(), "hi ");
        assert!(doc.mention_ids().is_empty());
    }

    #[test]
    fn caret_skips_over_mentions_atomically() {
        let mut doc = Document::new();
        type_str(&mut doc, "@a");
        doc.commit_mention(2, "1", "Alpha");
        // caret sits after the space; two lefts put it before the token
        doc.move_left();
        doc.move_left();
        assert_eq!(doc.caret().unit, 0);
        doc.move_right();
        assert_eq!(doc.caret().unit, 1);
        // typing at unit 1 lands after the whole token, not inside it
        doc.insert_char('!');
        assert_eq!(doc.visible_text(), "@Alpha! ");
    }

    #[test]
    fn text_before_caret_stops_at_mention_boundary() {
        let mut doc = Document::new();
        doc.paragraphs = vec![vec![
            InlineNode::Text("see ".into()),
            mention("1", "Alpha"),
            InlineNode::Text(" @re".into()),
        ]];
        doc.caret = Caret {
            paragraph: 0,
            unit: 9, // end of paragraph: 4 + 1 + 4
        };
        assert_eq!(doc.text_before_caret(), " @re");
    }

    #[test]
    fn dual_serialization_round_trip() {
        let mut doc = Document::new();
        doc.paragraphs = vec![vec![
            InlineNode::Text("See ".into()),
            mention("42", "Report"),
            InlineNode::Text(" for details".into()),
        ]];
        assert_eq!(doc.visible_text(), "See @Report for details");
        assert_eq!(doc.processed_text(), "See @Report [fileID42] for details");
    }

    #[test]
    fn processed_text_trims_trailing_whitespace() {
        let mut doc = Document::new();
        type_str(&mut doc, "hi @a");
        doc.commit_mention(2, "1", "Alpha");
        assert_eq!(doc.visible_text(), "hi @Alpha ");
        assert_eq!(doc.processed_text(), "hi @Alpha [fileID1]");
    }

    #[test]
    fn multi_paragraph_serialization_joins_with_newlines() {
        let mut doc = Document::new();
        type_str(&mut doc, "one");
        doc.insert_paragraph_break();
        type_str(&mut doc, "@t");
        doc.commit_mention(2, "9", "Two");
        assert_eq!(doc.visible_text(), "one\n@Two ");
        assert_eq!(doc.processed_text(), "one\n@Two [fileID9]");
    }

    #[test]
    fn clear_resets_to_one_empty_paragraph() {
        let mut doc = Document::new();
        type_str(&mut doc, "hello");
        doc.clear();
        assert_eq!(doc.paragraphs().len(), 1);
        assert!(doc.paragraphs()[0].is_empty());
        assert_eq!(doc.caret(), Caret { paragraph: 0, unit: 0 });
        assert!(doc.is_blank());
    }

    #[test]
    fn grapheme_aware_backspace_removes_whole_cluster() {
        let mut doc = Document::new();
        doc.insert_text("e\u{301}x"); // e + combining acute, then x
        doc.backspace();
        doc.backspace();
        assert_eq!(doc.visible_text(), "");
    }

    #[test]
    fn visible_prefix_tracks_mentions_and_text() {
        let mut doc = Document::new();
        type_str(&mut doc, "@a");
        doc.commit_mention(2, "1", "Alpha");
        type_str(&mut doc, "yo");
        doc.move_left();
        assert_eq!(doc.visible_prefix_of_caret(), "@Alpha y");
    }

    #[test]
    fn mention_ids_deduplicate_repeated_references() {
        let mut doc = Document::new();
        doc.paragraphs = vec![vec![
            mention("7", "Doc"),
            InlineNode::Text(" and ".into()),
            mention("7", "Doc"),
        ]];
        assert_eq!(doc.mention_ids(), vec!["7".to_string()]);
    }
}
