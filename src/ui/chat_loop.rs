//! The interactive chat loop.
//!
//! A poll-based event loop owns all mutation: key and mouse events, stream
//! chunks, and debounced search results are applied strictly in arrival
//! order by synchronous handlers, then the frame is redrawn. Network work
//! happens on spawned tasks that report back over channels.

use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste,
        EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ApiError, DriveFile};
use crate::auth::{fetch_profile, SessionManager, SessionStatus};
use crate::commands::{help_text, parse_command, SlashCommand};
use crate::core::app::{App, TaskMode};
use crate::core::catalog::{ContextSource, DriveSource};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::logging::LoggingState;
use crate::ui::picker::{PickerKind, PickerState, MODELS};
use crate::ui::renderer;
use crate::utils::input::sanitize_text_input;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// What the event loop must do after a key was handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AfterKey {
    None,
    Quit,
    Send { visible: String, processed: String },
    Command(SlashCommand),
}

/// Route one key press. Menu-first: while the candidate menu is open it owns
/// Enter, Escape and the arrow keys, and the submission gate never sees
/// them.
pub(crate) fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> AfterKey {
    if key.kind != KeyEventKind::Press {
        return AfterKey::None;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return AfterKey::Quit;
    }

    if app.picker.is_some() {
        return handle_picker_key(app, key);
    }

    if app.menu.is_open() {
        match key.code {
            KeyCode::Enter => {
                app.commit_selected_mention();
                app.refresh_after_edit(now);
                return AfterKey::None;
            }
            KeyCode::Down => {
                app.menu.move_down();
                return AfterKey::None;
            }
            KeyCode::Up => {
                app.menu.move_up();
                return AfterKey::None;
            }
            KeyCode::Esc => {
                app.dismiss_menu();
                return AfterKey::None;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.document.insert_paragraph_break();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Enter => match app.submit() {
            Some((visible, processed)) => match parse_command(&visible) {
                Some(command) => AfterKey::Command(command),
                None => AfterKey::Send { visible, processed },
            },
            None => AfterKey::None,
        },
        KeyCode::Esc => {
            if app.menu.is_active() {
                app.dismiss_menu();
            } else if app.is_streaming {
                app.cancel_stream();
            }
            AfterKey::None
        }
        KeyCode::F(2) => {
            app.picker = Some(PickerState::for_models(&app.model));
            AfterKey::None
        }
        KeyCode::F(3) => {
            app.picker = Some(PickerState::for_tasks(app.task));
            AfterKey::None
        }
        KeyCode::Char(c) => {
            app.document.insert_char(c);
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Backspace => {
            app.document.backspace();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Delete => {
            app.document.delete_forward();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Left => {
            app.document.move_left();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Right => {
            app.document.move_right();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Home => {
            app.document.move_home();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::End => {
            app.document.move_end();
            app.refresh_after_edit(now);
            AfterKey::None
        }
        KeyCode::Up => {
            app.scroll_up(1);
            AfterKey::None
        }
        KeyCode::Down => {
            app.scroll_down(1);
            AfterKey::None
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            AfterKey::None
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            AfterKey::None
        }
        _ => AfterKey::None,
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) -> AfterKey {
    let Some(picker) = app.picker.as_mut() else {
        return AfterKey::None;
    };
    match key.code {
        KeyCode::Up => picker.move_up(),
        KeyCode::Down => picker.move_down(),
        KeyCode::Esc => {
            app.picker = None;
        }
        KeyCode::Enter => {
            if let Some(id) = picker.selected_id().map(str::to_string) {
                match picker.kind {
                    PickerKind::Model => app.model = id,
                    PickerKind::Task => {
                        if let Some(task) = TaskMode::from_str(&id) {
                            app.task = task;
                        }
                    }
                }
            }
            app.picker = None;
        }
        _ => {}
    }
    AfterKey::None
}

pub(crate) fn handle_mouse(app: &mut App, mouse: MouseEvent, frame_area: Rect, now: Instant) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::Down(MouseButton::Left) => {
            if app.menu.is_open() {
                if let Some(row) =
                    renderer::mention_menu_row_at(app, frame_area, mouse.column, mouse.row)
                {
                    app.menu.set_selected(row);
                    app.commit_selected_mention();
                    app.refresh_after_edit(now);
                }
            } else if let Some(value) =
                renderer::badge_at(app, frame_area, mouse.column, mouse.row)
            {
                app.catalog.remove(&value);
            }
        }
        _ => {}
    }
}

fn resolve_api_key() -> Result<String, Box<dyn Error>> {
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        "OPENAI_API_KEY environment variable not set\n\n\
         Please set your API key:\n\
         export OPENAI_API_KEY=\"your-api-key-here\"\n\n\
         Optionally, you can also set a custom base URL:\n\
         export OPENAI_BASE_URL=\"https://api.openai.com/v1\""
            .into()
    })
}

pub async fn run_chat(
    model_flag: Option<String>,
    log_flag: Option<String>,
    base_url_flag: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let api_key = resolve_api_key()?;
    let base_url = base_url_flag
        .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let model = model_flag
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| MODELS[0].0.to_string());
    let task = config
        .default_task
        .as_deref()
        .and_then(TaskMode::from_str)
        .unwrap_or_default();
    let logging = LoggingState::new(log_flag.or_else(|| config.log_file.clone()));

    let client = reqwest::Client::new();
    let session_manager = SessionManager::new();

    let mut app = App::new(model, task, logging);
    app.session = session_manager.check_status(&client).await;
    if let Some(token) = app.session.access_token.clone() {
        match fetch_profile(&client, &token).await {
            Ok(profile) => app.profile = Some(profile),
            Err(err) => debug!(error = %err, "profile fetch failed at startup"),
        }
    }

    let search_source: Option<Arc<dyn ContextSource>> = app
        .session
        .access_token
        .clone()
        .map(|token| Arc::new(DriveSource::new(client.clone(), token)) as Arc<dyn ContextSource>);

    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (search_tx, mut search_rx) =
        mpsc::unbounded_channel::<(u64, Result<Vec<DriveFile>, ApiError>)>();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &client,
        &session_manager,
        &stream_service,
        &mut stream_rx,
        &search_tx,
        &mut search_rx,
        search_source,
        &base_url,
        &api_key,
    )
    .await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    result
}

#[allow(clippy::too_many_arguments)]
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: &reqwest::Client,
    session_manager: &SessionManager,
    stream_service: &ChatStreamService,
    stream_rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    search_tx: &mpsc::UnboundedSender<(u64, Result<Vec<DriveFile>, ApiError>)>,
    search_rx: &mut mpsc::UnboundedReceiver<(u64, Result<Vec<DriveFile>, ApiError>)>,
    mut search_source: Option<Arc<dyn ContextSource>>,
    base_url: &str,
    api_key: &str,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| renderer::draw(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => match handle_key(app, key, now) {
                    AfterKey::Quit => break,
                    AfterKey::Send { visible, processed } => {
                        app.push_user_exchange(&visible, &processed);
                        let ticket = app.begin_stream();
                        stream_service.spawn_stream(StreamParams {
                            client: client.clone(),
                            base_url: base_url.to_string(),
                            api_key: api_key.to_string(),
                            model: app.model.clone(),
                            api_messages: ticket.api_messages,
                            cancel_token: ticket.cancel_token,
                            stream_id: ticket.stream_id,
                        });
                    }
                    AfterKey::Command(command) => {
                        run_command(app, session_manager, &mut search_source, command);
                    }
                    AfterKey::None => {}
                },
                Event::Mouse(mouse) => {
                    let size = terminal.size().unwrap_or_default();
                    let area = Rect::new(0, 0, size.width, size.height);
                    handle_mouse(app, mouse, area, now);
                }
                Event::Paste(text) => {
                    app.document.insert_text(&sanitize_text_input(&text));
                    app.refresh_after_edit(now);
                }
                _ => {}
            }
        }

        // Streaming updates, strictly in arrival order.
        while let Ok((message, stream_id)) = stream_rx.try_recv() {
            match message {
                StreamMessage::Chunk(content) => {
                    app.apply_stream_chunk(stream_id, &content);
                }
                StreamMessage::Error(message) => app.apply_stream_error(stream_id, message),
                StreamMessage::End => app.finish_stream(stream_id),
            }
        }

        // Search results: most-recent generation wins, stale ones are
        // dropped inside the catalog.
        while let Ok((generation, result)) = search_rx.try_recv() {
            match result {
                Ok(files) => {
                    if app.catalog.apply_search_results(generation, files) {
                        app.refresh_after_edit(Instant::now());
                    }
                }
                Err(err) if err.is_unauthorized() => {
                    drop_session(app, &mut search_source);
                    app.push_app_error(
                        "Google session expired — run `surcor auth` to sign in again.",
                    );
                }
                Err(err) => {
                    debug!(error = %err, "file search failed");
                    app.push_app_error(format!("File search failed: {err}"));
                }
            }
        }

        // Fire the debounced search once its window has elapsed.
        if let Some(due) = app.catalog.due_search(Instant::now()) {
            if let Some(source) = &search_source {
                let source = Arc::clone(source);
                let tx = search_tx.clone();
                tokio::spawn(async move {
                    let result = source.search(due.query.as_deref()).await;
                    let _ = tx.send((due.generation, result));
                });
            }
        }
    }

    Ok(())
}

fn drop_session(app: &mut App, search_source: &mut Option<Arc<dyn ContextSource>>) {
    app.session = SessionStatus::signed_out();
    app.profile = None;
    app.catalog.clear_drive_items();
    *search_source = None;
}

fn run_command(
    app: &mut App,
    session_manager: &SessionManager,
    search_source: &mut Option<Arc<dyn ContextSource>>,
    command: SlashCommand,
) {
    match command {
        SlashCommand::Help => app.push_app_info(help_text()),
        SlashCommand::Log(Some(path)) => match app.logging.set_log_file(path) {
            Ok(notice) => app.push_app_info(notice),
            Err(err) => app.push_app_error(err.to_string()),
        },
        SlashCommand::Log(None) => match app.logging.toggle_logging() {
            Ok(notice) => app.push_app_info(notice),
            Err(err) => app.push_app_error(err.to_string()),
        },
        SlashCommand::Status => {
            let identity = match (&app.profile, app.session.authenticated) {
                (Some(profile), true) => format!(
                    "Signed in as {} <{}>",
                    profile.display_name(),
                    profile.email.as_deref().unwrap_or("unknown")
                ),
                (None, true) => "Signed in".to_string(),
                _ => "Signed out".to_string(),
            };
            app.push_app_info(format!(
                "{identity}\nModel: {} · Task: {} · Log: {}",
                app.model,
                app.task.label(),
                app.logging.status_string()
            ));
        }
        SlashCommand::Logout => match session_manager.clear_token() {
            Ok(_) => {
                drop_session(app, search_source);
                app.push_app_info("Signed out.");
            }
            Err(err) => app.push_app_error(format!("Logout failed: {err}")),
        },
        SlashCommand::Unknown(name) => {
            app.push_app_error(format!("Unknown command: {name} (try /help)"));
        }
    }
}
