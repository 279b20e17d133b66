// Event log widget: the drained log text, pinned to its last line unless
// the user scrolled back.

use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Event Log");

    if state.log_text.is_empty() {
        let paragraph = Paragraph::new("  Nothing logged yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    // Visible row count: subtract 2 for borders
    let visible_rows = (area.height as usize).saturating_sub(2);
    let total = line_count(&state.log_text);
    let top = first_visible_line(total, visible_rows, state.log_scroll_back as usize);

    let paragraph = Paragraph::new(state.log_text.as_str())
        .style(Style::default().fg(Color::White))
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0))
        .block(block);
    frame.render_widget(paragraph, area);

    if total > visible_rows {
        let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(visible_rows)).position(top);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

/// Rendered lines in `text`, counting a trailing partial line.
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Index of the top visible line when `scroll_back` lines above the tail.
pub fn first_visible_line(total: usize, visible: usize, scroll_back: usize) -> usize {
    let bottom = total.saturating_sub(visible);
    bottom.saturating_sub(scroll_back)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_handles_partial_line() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("mint.\n"), 1);
        assert_eq!(line_count("mint.\nmint tok"), 2);
    }

    #[test]
    fn tail_is_pinned_and_scroll_is_clamped() {
        assert_eq!(first_visible_line(30, 10, 0), 20);
        assert_eq!(first_visible_line(30, 10, 5), 15);
        assert_eq!(first_visible_line(30, 10, 99), 0);
        assert_eq!(first_visible_line(5, 10, 0), 0);
    }

    #[test]
    fn render_shows_last_line() {
        let backend = ratatui::backend::TestBackend::new(40, 5);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.log_text = (0..20).map(|i| format!("line {i}\n")).collect();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let row: String = (0..buffer.area.width)
            .map(|x| buffer[(x, 3)].symbol().to_string())
            .collect();
        assert!(row.contains("line 19"));
    }

    #[test]
    fn render_empty_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(40, 5);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
