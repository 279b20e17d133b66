// TUI front end: listing and bidding forms plus the event log.
//
// The TUI owns a `ViewState` holding the latest `AppSnapshot` and the drained
// log text. The coordinator pushes `UiUpdate` messages; the TUI applies them
// and re-renders at ~30 fps. Keys become `UserCommand`s.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::event_log::trim_front;
use crate::protocol::{AppSnapshot, FormField, Mode, UiUpdate, UserCommand};

use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state for rendering.
#[derive(Debug, Default)]
pub struct ViewState {
    pub snapshot: AppSnapshot,
    /// Drained event log text, one character per `LogAppend`.
    pub log_text: String,
    /// Lines scrolled up from the bottom of the log. `0` follows the tail.
    pub log_scroll_back: u16,
    /// Index into `FormField::cycle(mode)` of the focused field.
    pub focus: usize,
    /// Blocking message; input is swallowed until it is dismissed.
    pub alert: Option<String>,
    pub confirm_quit: bool,
}

impl ViewState {
    pub fn focused_field(&self) -> FormField {
        let fields = FormField::cycle(self.snapshot.mode);
        fields[self.focus % fields.len()]
    }

    pub fn mode(&self) -> Mode {
        self.snapshot.mode
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            if snapshot.mode != state.snapshot.mode {
                state.focus = 0;
            }
            state.snapshot = *snapshot;
        }
        UiUpdate::LogAppend(c) => {
            state.log_text.push(c);
            if let Some(max) = state.snapshot.log_capacity {
                trim_front(&mut state.log_text, max);
            }
        }
        UiUpdate::TailLog => {
            state.log_scroll_back = 0;
        }
        UiUpdate::Alert(message) => {
            state.alert = Some(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());
    widgets::status_bar::render(frame, layout.status_bar, state);
    match state.mode() {
        Mode::Listing => widgets::listing::render(frame, layout.form, state),
        Mode::Bidding => widgets::bidding::render(frame, layout.form, state),
    }
    widgets::event_log::render(frame, layout.event_log, state);
    render_help_bar(frame, layout.help_bar, state.mode());

    if let Some(message) = &state.alert {
        widgets::modal::render_alert(frame, frame.area(), message);
    } else if state.confirm_quit {
        widgets::modal::render_quit_confirm(frame, frame.area());
    }
}

fn help_text(mode: Mode) -> &'static str {
    match mode {
        Mode::Listing => {
            " F1:Listing | F2:Bidding | F3:Deploy | Tab:Next field | Enter:List | PgUp/PgDn:Log | Esc:Quit"
        }
        Mode::Bidding => {
            " F1:Listing | F2:Bidding | \u{2190}\u{2192}:Contract | \u{2191}\u{2193}:Token | Enter:Bid/End | PgUp/PgDn:Log | Esc:Quit"
        }
    }
}

fn render_help_bar(frame: &mut Frame, area: ratatui::layout::Rect, mode: Mode) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(mode),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the coordinator exits.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Best-effort terminal restoration
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();
    Ok(())
}

/// Static screen shown when no wallet provider answers at start-up.
/// Returns when any key is pressed.
pub async fn run_wallet_missing(endpoint: &str, reason: &str) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    let mut event_stream = EventStream::new();

    terminal.draw(|frame| widgets::wallet_missing::render(frame, frame.area(), endpoint, reason))?;
    while let Some(event) = event_stream.next().await {
        match event {
            Ok(Event::Key(_)) | Err(_) => break,
            Ok(Event::Resize(..)) => {
                terminal.draw(|frame| {
                    widgets::wallet_missing::render(frame, frame.area(), endpoint, reason)
                })?;
            }
            Ok(_) => {}
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
