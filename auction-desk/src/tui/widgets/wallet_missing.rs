// Start-up screen shown when the wallet endpoint does not answer.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::modal::centered_rect;

pub fn render(frame: &mut Frame, area: Rect, endpoint: &str, reason: &str) {
    let dialog_area = centered_rect(70, 9, area);

    let lines = vec![
        Line::styled(
            " No wallet provider found.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
        Line::raw(format!(" endpoint: {}", endpoint)),
        Line::raw(format!(" error: {}", reason)),
        Line::raw(""),
        Line::styled(
            " Start a node with unlocked accounts, then restart. Press any key to exit.",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" auction-desk "));
    frame.render_widget(paragraph, dialog_area);
}
