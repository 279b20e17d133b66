// Bidding panel: contract/token selectors, the cached token view, and the
// bid price field.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::listing::{field_line, info_line};
use crate::auction::session::{AuctionPhase, TokenView};
use crate::protocol::FormField;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let snapshot = &state.snapshot;
    let token = &snapshot.token;
    let token_label = snapshot.selection.token_label();
    let end_label = token.auction_end().map(|t| t.to_rfc3339());

    let mut lines = vec![
        selector_line("Contract", snapshot.selection.contract_label(), "\u{2190}\u{2192}"),
        selector_line("Token", &token_label, "\u{2191}\u{2193}"),
        Line::raw(""),
    ];

    if let Some(metadata) = &token.metadata {
        lines.push(info_line("Name", Some(&metadata.name)));
        lines.push(info_line("Description", Some(&metadata.description)));
        lines.push(info_line("Image", Some(&metadata.image_url)));
    } else {
        lines.push(info_line("Name", None));
    }
    lines.push(info_line("Owner", non_empty(&token.owner)));
    lines.push(info_line("Beneficiary", non_empty(&token.beneficiary)));
    lines.push(info_line("Highest bidder", non_empty(&token.highest_bidder)));
    lines.push(info_line("Price (eth)", token.price.as_deref()));
    lines.push(info_line("Auction end", end_label.as_deref()));
    lines.push(phase_line(token));
    lines.push(Line::raw(""));

    lines.push(field_line(
        FormField::BidPrice.label(),
        &snapshot.bid_price,
        state.focused_field() == FormField::BidPrice,
    ));
    let action = if snapshot.can_end {
        " Enter: end auction"
    } else {
        " Enter: bid"
    };
    lines.push(Line::styled(action, Style::default().fg(Color::Yellow)));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Bidding"));
    frame.render_widget(paragraph, area);
}

fn selector_line<'a>(label: &'a str, value: &'a str, keys: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {:<18}", label), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("< {} >", value),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", keys), Style::default().fg(Color::DarkGray)),
    ])
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub fn phase_label(phase: AuctionPhase) -> (&'static str, Color) {
    match phase {
        AuctionPhase::Unminted => ("no data", Color::DarkGray),
        AuctionPhase::Listed => ("open, no bids", Color::Green),
        AuctionPhase::Bidding => ("open", Color::Green),
        AuctionPhase::Ended => ("ended", Color::Red),
    }
}

fn phase_line(token: &TokenView) -> Line<'static> {
    let (label, color) = phase_label(token.phase());
    Line::from(vec![
        Span::styled(format!(" {:<18}", "Status"), Style::default().fg(Color::Gray)),
        Span::styled(label, Style::default().fg(color)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    use crate::storage::Metadata;

    #[test]
    fn phase_labels() {
        assert_eq!(phase_label(AuctionPhase::Ended).0, "ended");
        assert_eq!(phase_label(AuctionPhase::Listed).1, Color::Green);
    }

    #[test]
    fn render_with_token_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(70, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.snapshot.mode = crate::protocol::Mode::Bidding;
        state.snapshot.selection.contract = Some("0xabc".into());
        state.snapshot.selection.token_id = Some(U256::from(1));
        state.snapshot.token.metadata = Some(Metadata {
            name: "Art".into(),
            description: "d".into(),
            image_url: "https://ipfs.io/ipfs/bafy1/a.png".into(),
        });
        state.snapshot.token.price = Some("0.001".into());
        state.snapshot.token.auction_end_time_ms = 1_700_000_000_000;
        state.snapshot.bid_price = "0.002".into();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = (0..buffer.area.height)
            .flat_map(|y| (0..buffer.area.width).map(move |x| (x, y)))
            .map(|(x, y)| buffer[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("< 0xabc >"));
        assert!(text.contains("Enter: bid"));
    }

    #[test]
    fn render_empty_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(40, 10);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
