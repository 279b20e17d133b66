// Status bar widget: active account, contract binding, mode indicator.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::auction::session::ContractState;
use crate::protocol::Mode;
use crate::tui::ViewState;

/// Layout: [account] | [contract state] | [mode tabs]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let snapshot = &state.snapshot;
    let mut spans = Vec::new();

    let (dot, dot_color) = match &snapshot.account {
        Some(_) => ("●", Color::Green),
        None => ("●", Color::Red),
    };
    spans.push(Span::styled(format!(" {} ", dot), Style::default().fg(dot_color)));
    spans.push(Span::styled(
        snapshot.account.clone().unwrap_or_else(|| "no account".to_string()),
        Style::default().fg(Color::White),
    ));

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    let (label, color) = contract_indicator(snapshot.contract_state);
    spans.push(Span::styled(label, Style::default().fg(color)));
    if let Some(address) = &snapshot.contract_address {
        spans.push(Span::styled(
            format!(" {}", address),
            Style::default().fg(Color::White),
        ));
    }

    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.extend(mode_spans(snapshot.mode));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn contract_indicator(state: ContractState) -> (&'static str, Color) {
    match state {
        ContractState::NoContract => ("no contract", Color::Red),
        ContractState::Deploying => ("deploying...", Color::Yellow),
        ContractState::Ready => ("contract", Color::Green),
    }
}

/// "[F1:Listing] [F2:Bidding]" with the active mode highlighted.
pub fn mode_spans(active: Mode) -> Vec<Span<'static>> {
    let modes = [(Mode::Listing, "F1:Listing"), (Mode::Bidding, "F2:Bidding")];

    let mut spans = Vec::new();
    for (mode, label) in modes {
        let style = if mode == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}]", label), style));
        spans.push(Span::raw(" "));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_indicator_colors() {
        assert_eq!(contract_indicator(ContractState::NoContract).1, Color::Red);
        assert_eq!(contract_indicator(ContractState::Deploying).1, Color::Yellow);
        assert_eq!(contract_indicator(ContractState::Ready).1, Color::Green);
    }

    #[test]
    fn active_mode_is_highlighted() {
        let spans = mode_spans(Mode::Bidding);
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0].content, "[F1:Listing]");
        assert_eq!(spans[0].style.bg, None);
        assert_eq!(spans[2].content, "[F2:Bidding]");
        assert_eq!(spans[2].style.bg, Some(Color::White));
    }

    #[test]
    fn render_shows_account_and_contract() {
        let backend = ratatui::backend::TestBackend::new(100, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.snapshot.account = Some("0xme".into());
        state.snapshot.contract_state = ContractState::Ready;
        state.snapshot.contract_address = Some("0xabc".into());
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let line: String = (0..buffer.area.width)
            .map(|x| buffer[(x, 0)].symbol().to_string())
            .collect();
        assert!(line.contains("0xme"));
        assert!(line.contains("contract 0xabc"));
        assert!(line.contains("[F2:Bidding]"));
    }
}
