//! Markdown rendering for assistant messages, at terminal fidelity:
//! emphasis, inline and fenced code, headings, lists, and rules. Anything
//! fancier falls back to plain text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    bold: bool,
    italic: bool,
    quote_depth: usize,
    in_code_block: bool,
    /// One entry per open list; `Some(n)` carries the next ordered index.
    list_stack: Vec<Option<u64>>,
}

const CODE_STYLE: Style = Style::new().fg(Color::Yellow);
const CODE_BLOCK_STYLE: Style = Style::new().fg(Color::Gray);
const QUOTE_STYLE: Style = Style::new().fg(Color::DarkGray);

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);

    let mut renderer = Renderer {
        lines: Vec::new(),
        current: Vec::new(),
        bold: false,
        italic: false,
        quote_depth: 0,
        in_code_block: false,
        list_stack: Vec::new(),
    };
    for event in parser {
        renderer.handle(event);
    }
    renderer.flush_line();
    renderer.lines
}

impl Renderer {
    fn inline_style(&self) -> Style {
        let mut style = Style::default();
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.quote_depth > 0 {
            style = style.patch(QUOTE_STYLE);
        }
        style
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    // A blank separator before a new top-level block, but not between the
    // lines of a list.
    fn start_block(&mut self) {
        self.flush_line();
        if !self.lines.is_empty() && self.list_stack.is_empty() {
            if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
                self.lines.push(Line::default());
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.inline_style();
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if self.list_stack.is_empty() {
                    self.start_block();
                }
            }
            Event::End(TagEnd::Paragraph) => self.flush_line(),

            Event::Start(Tag::Heading { .. }) => {
                self.start_block();
                self.bold = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.bold = false;
            }

            Event::Start(Tag::List(start)) => {
                if self.list_stack.is_empty() {
                    self.start_block();
                } else {
                    self.flush_line();
                }
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush_line();
                self.list_stack.pop();
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(index)) => {
                        let marker = format!("{indent}{index}. ");
                        *index += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.current.push(Span::raw(marker));
            }
            Event::End(TagEnd::Item) => self.flush_line(),

            Event::Start(Tag::CodeBlock(kind)) => {
                self.start_block();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("[{lang}]"),
                            CODE_BLOCK_STYLE.add_modifier(Modifier::ITALIC),
                        )));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush_line();
                self.in_code_block = false;
            }

            Event::Start(Tag::BlockQuote(_)) => {
                self.start_block();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }

            Event::Start(Tag::Emphasis) => self.italic = true,
            Event::End(TagEnd::Emphasis) => self.italic = false,
            Event::Start(Tag::Strong) => self.bold = true,
            Event::End(TagEnd::Strong) => self.bold = false,

            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.lines.push(Line::from(Span::styled(
                            format!("  {line}"),
                            CODE_BLOCK_STYLE,
                        )));
                    }
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                self.current
                    .push(Span::styled(code.into_string(), CODE_STYLE));
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.start_block();
                self.lines
                    .push(Line::from(Span::styled("────────".to_string(), QUOTE_STYLE)));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn plain_paragraph_renders_as_one_line() {
        let lines = render_markdown("hello world");
        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "hello world");
    }

    #[test]
    fn soft_breaks_join_into_one_line() {
        let lines = render_markdown("one\ntwo");
        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "one two");
    }

    #[test]
    fn strong_text_gets_the_bold_modifier() {
        let lines = render_markdown("a **big** deal");
        let bold_span = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "big")
            .expect("bold span");
        assert!(bold_span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn bullets_and_ordered_lists_get_markers() {
        let lines = render_markdown("- first\n- second");
        assert_eq!(text_of(&lines[0]), "• first");
        assert_eq!(text_of(&lines[1]), "• second");

        let lines = render_markdown("1. one\n2. two");
        assert_eq!(text_of(&lines[0]), "1. one");
        assert_eq!(text_of(&lines[1]), "2. two");
    }

    #[test]
    fn fenced_code_blocks_are_indented_verbatim() {
        let lines = render_markdown("```rust\nlet x = 1;\n```");
        assert_eq!(text_of(&lines[0]), "[rust]");
        assert_eq!(text_of(&lines[1]), "  let x = 1;");
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        let lines = render_markdown("one\n\ntwo");
        assert_eq!(lines.len(), 3);
        assert_eq!(text_of(&lines[0]), "one");
        assert!(lines[1].spans.is_empty());
        assert_eq!(text_of(&lines[2]), "two");
    }

    #[test]
    fn inline_code_keeps_its_own_style() {
        let lines = render_markdown("run `cargo test` now");
        let code_span = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "cargo test")
            .expect("code span");
        assert_eq!(code_span.style.fg, Some(Color::Yellow));
    }
}
