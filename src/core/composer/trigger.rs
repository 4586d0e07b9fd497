//! Recognition of a live `@`-prefixed run immediately before the caret.

/// A live trigger: the query typed after the `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub query: String,
}

impl TriggerMatch {
    /// Characters covered by the trigger, including the `@` itself.
    pub fn len_chars(&self) -> usize {
        self.query.chars().count() + 1
    }
}

/// Scan backward from the caret for an unescaped `@`.
///
/// `text` is the contiguous plain-text run ending at the caret; its start is
/// a hard boundary (paragraph start or the edge of a mention token), so an
/// `@` at position zero always counts as word-initial. No whitespace may sit
/// between the `@` and the caret, and an `@` glued to a preceding word
/// (`user@host`) never triggers.
pub fn find_trigger(text: &str) -> Option<TriggerMatch> {
    for (idx, ch) in text.char_indices().rev() {
        if ch.is_whitespace() {
            return None;
        }
        if ch == '@' {
            match text[..idx].chars().next_back() {
                None => {}
                Some(prev) if prev.is_whitespace() => {}
                Some(_) => return None,
            }
            return Some(TriggerMatch {
                query: text[idx + ch.len_utf8()..].to_string(),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> Option<String> {
        find_trigger(text).map(|m| m.query)
    }

    #[test]
    fn plain_text_without_at_never_matches() {
        for text in ["", "hello", "hello world", "a b c", "trailing space "] {
            assert_eq!(query(text), None, "text={text:?}");
        }
    }

    #[test]
    fn bare_at_opens_with_empty_query() {
        assert_eq!(query("@").as_deref(), Some(""));
        assert_eq!(query("Hi @").as_deref(), Some(""));
    }

    #[test]
    fn query_runs_from_at_to_caret() {
        assert_eq!(query("Hi @al").as_deref(), Some("al"));
        assert_eq!(query("@Quarterly").as_deref(), Some("Quarterly"));
    }

    #[test]
    fn whitespace_after_at_ends_the_trigger() {
        assert_eq!(query("@alpha "), None);
        assert_eq!(query("@alpha beta"), None);
    }

    #[test]
    fn at_glued_to_a_word_is_escaped() {
        assert_eq!(query("user@host"), None);
        assert_eq!(query("mail me a@b"), None);
    }

    #[test]
    fn at_inside_query_blocks_the_match() {
        // "@a@b" — the trailing @ is glued to "a", and @-in-query is not a
        // valid trigger either way
        assert_eq!(query("@a@b"), None);
    }

    #[test]
    fn trigger_length_covers_at_and_query() {
        let m = find_trigger("see @rep").expect("trigger");
        assert_eq!(m.len_chars(), 4);
        let bare = find_trigger("@").expect("trigger");
        assert_eq!(bare.len_chars(), 1);
    }

    #[test]
    fn non_ascii_queries_are_counted_in_chars() {
        let m = find_trigger("@résumé").expect("trigger");
        assert_eq!(m.query, "résumé");
        assert_eq!(m.len_chars(), 7);
    }
}
