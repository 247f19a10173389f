// src/ui.rs

use crate::app::{dispatch, App, Focus, InferenceReply};
use crate::chat_message::MessageView;
use crate::constants::SIDEBAR_WIDTH;
use crate::key_handlers::handle_key;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::{io, time::Duration};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

/// Runs the terminal UI until the user quits.
pub async fn run_ui(app: App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("UI loop failed: {}", err);
    }
    res
}

/// Main loop of the application.
async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<InferenceReply>();

    // crossterm's reader blocks, so it gets its own thread
    tokio::task::spawn_blocking(move || {
        while !event_tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
    });

    let mut tick = tokio::time::interval(Duration::from_millis(120));

    loop {
        terminal.draw(|f| draw(f, &app))?;

        tokio::select! {
            Some(ev) = event_rx.recv() => {
                if let Event::Key(key) = ev {
                    if key.kind == KeyEventKind::Press {
                        if let Some(request) = handle_key(&mut app, key) {
                            info!("Dispatching prompt ({} chars)", request.prompt.chars().count());
                            dispatch(request, reply_tx.clone());
                        }
                    }
                }
            }
            Some(reply) = reply_rx.recv() => app.apply_reply(reply),
            _ = tick.tick() => app.status_indicator.update_spinner(),
        }

        if app.should_quit {
            app.cancel_pending();
            return Ok(());
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(f.area());

    draw_history(f, app, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(columns[1]);

    draw_messages(f, app, rows[0]);
    app.status_indicator.render(f, rows[1]);
    draw_input(f, app, rows[2]);
}

fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let current = app.store.current_chat_index();
    let items: Vec<ListItem> = app
        .store
        .history_titles()
        .into_iter()
        .enumerate()
        .map(|(i, title)| {
            let marker = if Some(i) == current { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::LightGreen)),
                Span::raw(title),
            ]))
        })
        .collect();

    let border_style = if app.focus == Focus::History {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(" History (Tab) "),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if app.focus == Focus::History && !app.store.history().is_empty() {
        state.select(Some(app.selected_history));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// All conversation lines for a pane `width` columns wide.
pub fn conversation_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in app.store.active() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.extend(MessageView::new(message).render(width));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask anything. Ctrl+N starts a new chat, Tab switches to history.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn draw_messages(f: &mut Frame, app: &App, area: Rect) {
    let lines = conversation_lines(app, area.width);
    let offset = scroll_offset(lines.len(), area.height, app.chat_scroll);

    f.render_widget(Paragraph::new(lines).scroll((offset, 0)), area);
}

/// Top line to show so that the pane ends `chat_scroll` lines above the bottom.
fn scroll_offset(total_lines: usize, height: u16, chat_scroll: u16) -> u16 {
    let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
    let max_scroll = total_lines.saturating_sub(height);
    max_scroll.saturating_sub(chat_scroll.min(max_scroll))
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.store.is_busy() {
        " Prompt (waiting for reply) "
    } else {
        " Prompt "
    };
    let border_style = if app.focus == Focus::Input {
        Style::default().fg(Color::LightYellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let (scroll, cursor_x) = input_cursor(area, &app.input);

    let input = Paragraph::new(Line::from(vec![
        Span::styled("→ ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
    ]))
    .scroll((0, scroll))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    f.render_widget(input, area);

    if app.focus == Focus::Input {
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

/// Horizontal scroll for the input line and the cursor column. The cursor
/// stays inside the right border.
fn input_cursor(area: Rect, input: &str) -> (u16, u16) {
    // borders, the "→ " prompt and one cell for the cursor
    let visible_width = area.width.saturating_sub(5);
    let text_width = u16::try_from(input.width()).unwrap_or(u16::MAX);
    let scroll = text_width.saturating_sub(visible_width);
    let cursor_x = (area.x + 3).saturating_add(text_width - scroll);
    (scroll, cursor_x)
}
