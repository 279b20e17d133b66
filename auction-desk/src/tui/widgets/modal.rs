// Modal overlays: blocking alerts and the quit confirmation.
//
// Drawn on top of the main layout. An alert takes precedence over the quit
// dialog; the input handler clears it on the next key press.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

const QUIT_WIDTH: u16 = 28;
const QUIT_HEIGHT: u16 = 5;

const ALERT_WIDTH: u16 = 60;
const ALERT_MIN_HEIGHT: u16 = 5;

/// Render an alert with `message`, sized to fit it.
pub fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let inner_width = ALERT_WIDTH.saturating_sub(4).max(1) as usize;
    let text_rows = message.chars().count().div_ceil(inner_width) as u16;
    let dialog_area = centered_rect(ALERT_WIDTH, (text_rows + 4).max(ALERT_MIN_HEIGHT), area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Alert ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));

    let lines = vec![
        Line::raw(format!(" {}", message)),
        Line::raw(""),
        Line::styled(" press any key", Style::default().fg(Color::DarkGray)),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

pub fn render_quit_confirm(frame: &mut Frame, area: Rect) {
    let dialog_area = centered_rect(QUIT_WIDTH, QUIT_HEIGHT, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Quit? ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = Line::from(vec![
        Span::raw("  Really quit? ("),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Compute a centered rectangle of the given size within `area`, clamped to
/// the available space.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .split(area);
    let horizontal = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .split(vertical[0]);
    horizontal[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_is_centered() {
        let area = Rect::new(0, 0, 80, 24);
        let result = centered_rect(QUIT_WIDTH, QUIT_HEIGHT, area);
        assert_eq!(result.width, QUIT_WIDTH);
        assert_eq!(result.height, QUIT_HEIGHT);
        let dx = (result.x + result.width / 2) as i32 - 40;
        let dy = (result.y + result.height / 2) as i32 - 12;
        assert!(dx.unsigned_abs() <= 1);
        assert!(dy.unsigned_abs() <= 1);
    }

    #[test]
    fn centered_rect_clamps_to_small_area() {
        let area = Rect::new(0, 0, 10, 3);
        let result = centered_rect(ALERT_WIDTH, ALERT_MIN_HEIGHT, area);
        assert!(result.width <= area.width);
        assert!(result.height <= area.height);
    }

    #[test]
    fn alert_shows_message() {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_alert(frame, frame.area(), "description must not be empty"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = (0..buffer.area.height)
            .flat_map(|y| (0..buffer.area.width).map(move |x| (x, y)))
            .map(|(x, y)| buffer[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("description must not be empty"));
    }

    #[test]
    fn long_alert_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(40, 8);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let message = "x".repeat(500);
        terminal
            .draw(|frame| render_alert(frame, frame.area(), &message))
            .unwrap();
    }

    #[test]
    fn quit_confirm_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_quit_confirm(frame, frame.area()))
            .unwrap();
    }
}
