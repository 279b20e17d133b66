// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-------------------------+------------------------+
// | Form (55%)               | Event Log (45%)        |
// |  listing or bidding      |                        |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: account, contract state, mode.
    pub status_bar: Rect,
    /// Left side: the form of the active mode.
    pub form: Rect,
    /// Right side: drained event log.
    pub event_log: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        form: horizontal[0],
        event_log: horizontal[1],
        help_bar: vertical[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_fills_standard_terminal() {
        let area = Rect::new(0, 0, 120, 40);
        let layout = build_layout(area);
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.help_bar.height, 1);
        assert_eq!(layout.help_bar.y, 39);
        assert_eq!(layout.form.height, 38);
        assert_eq!(layout.form.width + layout.event_log.width, 120);
        assert!(layout.form.width > layout.event_log.width);
        assert_eq!(layout.event_log.x, layout.form.x + layout.form.width);
    }

    #[test]
    fn layout_survives_tiny_terminal() {
        let layout = build_layout(Rect::new(0, 0, 10, 4));
        assert!(layout.status_bar.height <= 1);
        assert!(layout.form.width <= 10);
    }
}
