//! Input sanitizing for typed and pasted text.

/// Sanitize text before it reaches the composer document:
/// - tabs become 4 spaces
/// - carriage returns become newlines
/// - control characters other than newline are dropped
pub fn sanitize_text_input(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => sanitized.push_str("    "),
            '\r' => sanitized.push('\n'),
            '\n' => sanitized.push(c),
            _ if !c.is_control() => sanitized.push(c),
            _ => {}
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_text_input("hello world"), "hello world");
    }

    #[test]
    fn tabs_and_carriage_returns_are_rewritten() {
        assert_eq!(sanitize_text_input("a\tb"), "a    b");
        assert_eq!(sanitize_text_input("a\r\nb"), "a\n\nb");
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(sanitize_text_input("a\x07b\x1b[31m"), "ab[31m");
    }

    #[test]
    fn newlines_survive() {
        assert_eq!(sanitize_text_input("one\ntwo"), "one\ntwo");
    }
}
