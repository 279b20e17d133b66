// Listing form: draft fields plus the identifiers of the last upload.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::auction::session::UNSELECTED;
use crate::protocol::{FormField, Mode};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let snapshot = &state.snapshot;
    let focused = state.focused_field();

    let mut lines: Vec<Line> = FormField::cycle(Mode::Listing)
        .iter()
        .map(|&field| {
            let value = snapshot.draft.value(field).unwrap_or_default();
            field_line(field.label(), value, field == focused)
        })
        .collect();

    lines.push(Line::raw(""));
    lines.push(info_line("File CID", snapshot.added_file_cid.as_deref()));
    lines.push(info_line("Metadata CID", snapshot.added_metadata_cid.as_deref()));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Listing"));
    frame.render_widget(paragraph, area);
}

/// One editable row. The focused row is highlighted and shows a cursor.
pub fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let mut spans = vec![
        Span::styled(format!(" {:<18}", label), label_style),
        Span::styled(value, Style::default().fg(Color::White)),
    ];
    if focused {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    Line::from(spans)
}

/// A read-only row; unset values show the placeholder.
pub fn info_line<'a>(label: &'a str, value: Option<&'a str>) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {:<18}", label), Style::default().fg(Color::Gray)),
        Span::styled(
            value.unwrap_or(UNSELECTED),
            Style::default().fg(Color::White),
        ),
    ])
}
