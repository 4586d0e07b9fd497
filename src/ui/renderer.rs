//! Frame rendering: transcript, context badges, the composer input with its
//! mention chips, the candidate dropdown, modal pickers, and the status
//! line. Geometry helpers are pure so the event loop can hit-test pointer
//! events against the same rectangles the renderer painted.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::core::app::App;
use crate::core::composer::InlineNode;
use crate::core::message::TranscriptRole;
use crate::ui::markdown::render_markdown;
use crate::ui::popup::dropdown_area;

const PLACEHOLDER: &str = "Imagine, plan, write anything...";
const MENU_WIDTH: u16 = 40;
const MENU_MAX_ROWS: u16 = 7;
const INPUT_MAX_PARAGRAPHS: u16 = 5;

const USER_STYLE: Style = Style::new().fg(Color::Cyan);
const APP_INFO_STYLE: Style = Style::new().fg(Color::DarkGray);
const APP_ERROR_STYLE: Style = Style::new().fg(Color::Red);
const CHIP_STYLE: Style = Style::new().fg(Color::Black).bg(Color::LightBlue);
const BADGE_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Gray);

pub struct ChatLayout {
    pub transcript: Rect,
    pub badges: Option<Rect>,
    pub input: Rect,
    pub status: Rect,
}

pub fn compute_layout(app: &App, area: Rect) -> ChatLayout {
    let input_rows = (app.document.paragraphs().len() as u16).clamp(1, INPUT_MAX_PARAGRAPHS) + 2;
    let has_badges = !app.catalog.selected_values().is_empty();

    let mut constraints = vec![Constraint::Min(1)];
    if has_badges {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Length(input_rows));
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut index = 0;
    let transcript = chunks[index];
    index += 1;
    let badges = if has_badges {
        let rect = chunks[index];
        index += 1;
        Some(rect)
    } else {
        None
    };
    let input = chunks[index];
    let status = chunks[index + 1];

    ChatLayout {
        transcript,
        badges,
        input,
        status,
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let layout = compute_layout(app, f.area());

    draw_transcript(f, app, layout.transcript);
    if let Some(badges) = layout.badges {
        draw_badges(f, app, badges);
    }
    draw_input(f, app, layout.input);
    draw_status(f, app, layout.status);

    if app.menu.is_active() {
        draw_mention_menu(f, app, layout.input);
    }
    if let Some(picker) = &app.picker {
        draw_picker(f, picker);
    }
}

pub fn build_transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in &app.transcript {
        match message.role {
            TranscriptRole::User => {
                lines.push(Line::from(vec![
                    Span::styled("You: ", USER_STYLE.add_modifier(Modifier::BOLD)),
                    Span::styled(message.content.clone(), USER_STYLE),
                ]));
                lines.push(Line::default());
            }
            TranscriptRole::Assistant => {
                if message.content.is_empty() {
                    continue;
                }
                lines.extend(render_markdown(&message.content));
                lines.push(Line::default());
            }
            TranscriptRole::AppInfo => {
                for line in message.content.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), APP_INFO_STYLE)));
                }
                lines.push(Line::default());
            }
            TranscriptRole::AppError => {
                for line in message.content.lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), APP_ERROR_STYLE)));
                }
                lines.push(Line::default());
            }
        }
    }
    lines
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = build_transcript_lines(app);
    let height = area.height.saturating_sub(1);
    let total = lines.len() as u16;
    let max_scroll = total.saturating_sub(height);
    let offset = max_scroll.saturating_sub(app.scroll_from_bottom.min(max_scroll));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Surcor"))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(paragraph, area);
}

fn draw_badges(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for label in app.catalog.selected_labels() {
        spans.push(Span::styled(format!(" {label} ✕ "), BADGE_STYLE));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Hit-test a pointer event against the badge row; returns the value of the
/// attached item under the cursor.
pub fn badge_at(app: &App, frame_area: Rect, x: u16, y: u16) -> Option<String> {
    let layout = compute_layout(app, frame_area);
    let badges = layout.badges?;
    if y != badges.y {
        return None;
    }
    let mut col = badges.x;
    let labels = app.catalog.selected_labels();
    for (value, label) in app.catalog.selected_values().iter().zip(labels.iter()) {
        let width = format!(" {label} ✕ ").width() as u16;
        if x >= col && x < col + width {
            return Some(value.clone());
        }
        col += width + 1;
    }
    None
}

pub fn build_input_lines(app: &App) -> Vec<Line<'static>> {
    if app.document.is_blank() && app.document.paragraphs().len() == 1 {
        let only = &app.document.paragraphs()[0];
        if only.is_empty() {
            return vec![Line::from(Span::styled(
                PLACEHOLDER.to_string(),
                Style::default().fg(Color::DarkGray),
            ))];
        }
    }

    app.document
        .paragraphs()
        .iter()
        .map(|nodes| {
            let spans: Vec<Span<'static>> = nodes
                .iter()
                .map(|node| match node {
                    InlineNode::Text(s) => Span::raw(s.clone()),
                    InlineNode::Mention { name, .. } => {
                        Span::styled(format!("@{name}"), CHIP_STYLE)
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn input_title(app: &App) -> String {
    if app.is_streaming {
        "Streaming... (Esc to stop)".to_string()
    } else {
        format!("{} · {}", model_label(&app.model), app.task.label())
    }
}

fn model_label(model: &str) -> &str {
    crate::ui::picker::MODELS
        .iter()
        .find(|(id, _, _)| *id == model)
        .map(|(_, label, _)| *label)
        .unwrap_or(model)
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let input = Paragraph::new(build_input_lines(app))
        .block(Block::default().borders(Borders::ALL).title(input_title(app)));
    f.render_widget(input, area);

    let (x, y) = caret_screen_position(app, area);
    f.set_cursor_position((x, y));
}

/// Screen cell of the caret inside the input box.
pub fn caret_screen_position(app: &App, input_area: Rect) -> (u16, u16) {
    let prefix = app.document.visible_prefix_of_caret();
    let col = prefix.width() as u16;
    let caret = app.document.caret();
    let max_x = input_area.right().saturating_sub(2);
    let x = (input_area.x + 1 + col).min(max_x);
    let row_cap = INPUT_MAX_PARAGRAPHS.saturating_sub(1);
    let y = input_area.y + 1 + (caret.paragraph as u16).min(row_cap);
    (x, y)
}

/// Where the dropdown goes this frame: anchored at the `@` of the live
/// trigger. `None` when no trigger is live.
pub fn mention_menu_rect(app: &App, frame_area: Rect) -> Option<Rect> {
    if !app.menu.is_active() {
        return None;
    }
    let layout = compute_layout(app, frame_area);
    let (caret_x, caret_y) = caret_screen_position(app, layout.input);

    let trigger_width = app
        .menu
        .query()
        .map(|q| format!("@{q}").width() as u16)
        .unwrap_or(1);
    let anchor_x = caret_x.saturating_sub(trigger_width);

    let rows = (app.menu.items().len() as u16).clamp(1, MENU_MAX_ROWS);
    Some(dropdown_area(
        (anchor_x, caret_y),
        frame_area,
        MENU_WIDTH,
        rows + 2,
    ))
}

/// Hit-test a pointer event against the dropdown rows.
pub fn mention_menu_row_at(app: &App, frame_area: Rect, x: u16, y: u16) -> Option<usize> {
    let rect = mention_menu_rect(app, frame_area)?;
    if x <= rect.x || x >= rect.right().saturating_sub(1) {
        return None;
    }
    if y <= rect.y || y >= rect.bottom().saturating_sub(1) {
        return None;
    }
    let row = (y - rect.y - 1) as usize;
    if row < app.menu.items().len() {
        Some(row)
    } else {
        None
    }
}

fn draw_mention_menu(f: &mut Frame, app: &App, _input_area: Rect) {
    let Some(rect) = mention_menu_rect(app, f.area()) else {
        return;
    };

    let mut lines = Vec::new();
    if app.menu.items().is_empty() {
        lines.push(Line::from(Span::styled(
            "No results.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for (index, item) in app.menu.items().iter().enumerate() {
            let style = if index == app.menu.selected_index() {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!(" {} ", item.label), style)));
        }
    }

    f.render_widget(Clear, rect);
    let menu = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(menu, rect);
}

fn draw_picker(f: &mut Frame, picker: &crate::ui::picker::PickerState) {
    let frame_area = f.area();
    let height = (picker.items.len() as u16 + 2).min(frame_area.height);
    let width = 44.min(frame_area.width);
    let rect = Rect {
        x: frame_area.width.saturating_sub(width) / 2,
        y: frame_area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let mut lines = Vec::new();
    for (index, item) in picker.items.iter().enumerate() {
        let style = if index == picker.selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let text = match &item.detail {
            Some(detail) => format!(" {}  ({detail}) ", item.label),
            None => format!(" {} ", item.label),
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    f.render_widget(Clear, rect);
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(picker.title.clone()),
    );
    f.render_widget(body, rect);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let identity = match (&app.profile, app.session.authenticated) {
        (Some(profile), true) => match &profile.email {
            Some(email) => format!("{} <{email}>", profile.display_name()),
            None => profile.display_name().to_string(),
        },
        (None, true) => "signed in".to_string(),
        _ => "signed out — run `surcor auth` for Drive context".to_string(),
    };

    let mut right = app.logging.status_string();
    if app.is_streaming {
        right.push_str(" · streaming");
    }

    let gap = (area.width as usize)
        .saturating_sub(identity.width() + right.width())
        .max(1);
    let line = Line::from(vec![
        Span::styled(identity, APP_INFO_STYLE),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, APP_INFO_STYLE),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::TaskMode;
    use crate::logging::LoggingState;

    fn test_app() -> App {
        let mut app = App::new(
            "claude-sonnet-4-20250514".to_string(),
            TaskMode::Agent,
            LoggingState::new(None),
        );
        app.session = crate::auth::SessionStatus {
            authenticated: true,
            access_token: Some("t".to_string()),
        };
        app
    }

    fn frame_area() -> Rect {
        Rect::new(0, 0, 80, 24)
    }

    #[test]
    fn empty_document_shows_the_placeholder() {
        let app = test_app();
        let lines = build_input_lines(&app);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].content.as_ref(), PLACEHOLDER);
    }

    #[test]
    fn mentions_render_as_chips() {
        let mut app = test_app();
        for c in "@a".chars() {
            app.document.insert_char(c);
        }
        app.document.commit_mention(2, "1", "Alpha");
        let lines = build_input_lines(&app);
        let chip = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "@Alpha")
            .expect("chip span");
        assert_eq!(chip.style.bg, Some(Color::LightBlue));
    }

    #[test]
    fn caret_tracks_typed_width() {
        let mut app = test_app();
        for c in "hey".chars() {
            app.document.insert_char(c);
        }
        let layout = compute_layout(&app, frame_area());
        let (x, y) = caret_screen_position(&app, layout.input);
        assert_eq!(x, layout.input.x + 1 + 3);
        assert_eq!(y, layout.input.y + 1);
    }

    #[test]
    fn no_trigger_means_no_menu_rect() {
        let app = test_app();
        assert!(mention_menu_rect(&app, frame_area()).is_none());
    }

    #[test]
    fn menu_rect_appears_above_the_input_anchor() {
        let mut app = test_app();
        let generation = app
            .catalog
            .schedule_search(None, std::time::Instant::now());
        app.catalog.apply_search_results(
            generation,
            vec![serde_json::from_str(r#"{"id":"1","name":"Alpha"}"#).expect("file")],
        );
        for c in "@al".chars() {
            app.document.insert_char(c);
            app.refresh_after_edit(std::time::Instant::now());
        }
        assert!(app.menu.is_open());

        let rect = mention_menu_rect(&app, frame_area()).expect("menu rect");
        let layout = compute_layout(&app, frame_area());
        // the input sits near the bottom, so the dropdown flips above it
        assert!(rect.bottom() <= layout.input.y + 2);
    }

    #[test]
    fn menu_hit_test_maps_rows() {
        let mut app = test_app();
        let generation = app
            .catalog
            .schedule_search(None, std::time::Instant::now());
        app.catalog.apply_search_results(
            generation,
            vec![
                serde_json::from_str(r#"{"id":"1","name":"Alpha"}"#).expect("file"),
                serde_json::from_str(r#"{"id":"2","name":"Alps"}"#).expect("file"),
            ],
        );
        for c in "@al".chars() {
            app.document.insert_char(c);
            app.refresh_after_edit(std::time::Instant::now());
        }
        let rect = mention_menu_rect(&app, frame_area()).expect("menu rect");

        assert_eq!(
            mention_menu_row_at(&app, frame_area(), rect.x + 2, rect.y + 1),
            Some(0)
        );
        assert_eq!(
            mention_menu_row_at(&app, frame_area(), rect.x + 2, rect.y + 2),
            Some(1)
        );
        // border cells miss
        assert_eq!(
            mention_menu_row_at(&app, frame_area(), rect.x, rect.y + 1),
            None
        );
    }

    #[test]
    fn badge_hit_test_resolves_attached_items() {
        let mut app = test_app();
        app.catalog.toggle("tab-1");
        app.catalog.toggle("tab-2");
        let layout = compute_layout(&app, frame_area());
        let badges = layout.badges.expect("badge row");

        // " Tab 1 ✕ " is 9 cells wide, then one cell of gap
        assert_eq!(
            badge_at(&app, frame_area(), badges.x + 1, badges.y),
            Some("tab-1".to_string())
        );
        assert_eq!(
            badge_at(&app, frame_area(), badges.x + 11, badges.y),
            Some("tab-2".to_string())
        );
        // the gap between badges misses
        assert_eq!(badge_at(&app, frame_area(), badges.x + 9, badges.y), None);
        // other rows miss
        assert_eq!(badge_at(&app, frame_area(), badges.x + 1, badges.y + 1), None);
    }

    #[test]
    fn transcript_renders_roles_distinctly() {
        let mut app = test_app();
        app.transcript.push(crate::core::message::Message::user("hi"));
        app.transcript
            .push(crate::core::message::Message::assistant("**bold** reply"));
        app.transcript
            .push(crate::core::message::Message::app_error("bad thing"));

        let lines = build_transcript_lines(&app);
        assert_eq!(lines[0].spans[0].content.as_ref(), "You: ");
        assert!(lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.content.as_ref() == "bold")));
        assert!(lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.content.as_ref() == "bad thing")));
    }
}
