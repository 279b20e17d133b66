// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the
// coordinator, or into local ViewState mutations (focus, log scroll, modals).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::chain::{same_address, TokenId};
use crate::protocol::{FieldEdit, FormField, Mode, UserCommand};

/// Lines moved per PageUp/PageDown in the event log.
const LOG_PAGE: u16 = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// coordinator. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    // An alert swallows the key that dismisses it
    if view_state.alert.is_some() {
        view_state.alert = None;
        return None;
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    match key_event.code {
        KeyCode::F(1) => switch_mode(view_state, Mode::Listing),
        KeyCode::F(2) => switch_mode(view_state, Mode::Bidding),
        KeyCode::F(3) => Some(UserCommand::Deploy),

        KeyCode::Tab => {
            let len = FormField::cycle(view_state.mode()).len();
            view_state.focus = (view_state.focus + 1) % len;
            None
        }
        KeyCode::BackTab => {
            let len = FormField::cycle(view_state.mode()).len();
            view_state.focus = (view_state.focus + len - 1) % len;
            None
        }

        KeyCode::Enter => Some(submit(view_state)),

        KeyCode::Left if view_state.mode() == Mode::Bidding => {
            Some(UserCommand::SelectContract(cycle_contract(view_state, false)))
        }
        KeyCode::Right if view_state.mode() == Mode::Bidding => {
            Some(UserCommand::SelectContract(cycle_contract(view_state, true)))
        }
        KeyCode::Up if view_state.mode() == Mode::Bidding => {
            Some(UserCommand::SelectToken(cycle_token(view_state, false)))
        }
        KeyCode::Down if view_state.mode() == Mode::Bidding => {
            Some(UserCommand::SelectToken(cycle_token(view_state, true)))
        }

        KeyCode::PageUp => {
            view_state.log_scroll_back = view_state.log_scroll_back.saturating_add(LOG_PAGE);
            None
        }
        KeyCode::PageDown => {
            view_state.log_scroll_back = view_state.log_scroll_back.saturating_sub(LOG_PAGE);
            None
        }

        KeyCode::Backspace => Some(UserCommand::Edit {
            field: view_state.focused_field(),
            edit: FieldEdit::Pop,
        }),
        KeyCode::Char(c) => Some(UserCommand::Edit {
            field: view_state.focused_field(),
            edit: FieldEdit::Push(c),
        }),

        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Esc => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// In quit confirmation mode `y` confirms, `n` or `Esc` cancels and
/// everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserCommand::Quit),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn switch_mode(view_state: &mut ViewState, mode: Mode) -> Option<UserCommand> {
    if view_state.mode() == mode {
        return None;
    }
    view_state.focus = 0;
    Some(UserCommand::SwitchMode(mode))
}

/// Enter lists in listing mode. In bidding mode the owner ends the auction
/// and everyone else bids.
fn submit(view_state: &ViewState) -> UserCommand {
    match view_state.mode() {
        Mode::Listing => UserCommand::List,
        Mode::Bidding if view_state.snapshot.can_end => UserCommand::EndAuction,
        Mode::Bidding => UserCommand::Bid,
    }
}

/// Step through `---` followed by every known contract, wrapping around.
fn cycle_contract(view_state: &ViewState, forward: bool) -> Option<String> {
    let mut options: Vec<Option<&str>> = vec![None];
    options.extend(view_state.snapshot.contracts.values().map(|a| Some(a.as_str())));

    let current = view_state.snapshot.selection.contract.as_deref();
    let idx = options
        .iter()
        .position(|o| match (o, current) {
            (Some(a), Some(b)) => same_address(a, b),
            (None, None) => true,
            _ => false,
        })
        .unwrap_or(0);
    options[step(idx, options.len(), forward)].map(str::to_string)
}

/// Step through `---` followed by the selected contract's distinct token ids
/// in mint order. A repeated id would be indistinguishable in the selector.
fn cycle_token(view_state: &ViewState, forward: bool) -> Option<TokenId> {
    let mut options: Vec<Option<TokenId>> = vec![None];
    for &id in &view_state.snapshot.token_ids {
        if !options.contains(&Some(id)) {
            options.push(Some(id));
        }
    }

    let current = view_state.snapshot.selection.token_id;
    let idx = options.iter().position(|o| *o == current).unwrap_or(0);
    options[step(idx, options.len(), forward)]
}

fn step(idx: usize, len: usize, forward: bool) -> usize {
    if forward {
        (idx + 1) % len
    } else {
        (idx + len - 1) % len
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn bidding_state() -> ViewState {
        let mut state = ViewState::default();
        state.snapshot.mode = Mode::Bidding;
        state
            .snapshot
            .contracts
            .insert("0xalice".into(), "0xAAA".into());
        state
            .snapshot
            .contracts
            .insert("0xbob".into(), "0xBBB".into());
        state
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut ev = key(KeyCode::Char('a'));
        ev.kind = KeyEventKind::Release;
        assert_eq!(handle_key(ev, &mut state), None);
    }

    #[test]
    fn ctrl_c_quits_even_with_alert() {
        let mut state = ViewState::default();
        state.alert = Some("x".into());
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ev, &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn alert_swallows_one_key() {
        let mut state = ViewState::default();
        state.alert = Some("name must not be empty".into());
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert!(state.alert.is_none());
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), Some(UserCommand::List));
    }

    #[test]
    fn esc_asks_before_quitting() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), None);
        assert!(!state.confirm_quit);

        handle_key(key(KeyCode::Esc), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Char('y')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn typing_edits_focused_field() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('A')), &mut state),
            Some(UserCommand::Edit {
                field: FormField::Title,
                edit: FieldEdit::Push('A'),
            })
        );
        handle_key(key(KeyCode::Tab), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Backspace), &mut state),
            Some(UserCommand::Edit {
                field: FormField::Description,
                edit: FieldEdit::Pop,
            })
        );
        handle_key(key(KeyCode::BackTab), &mut state);
        handle_key(key(KeyCode::BackTab), &mut state);
        assert_eq!(state.focused_field(), FormField::Duration);
    }

    #[test]
    fn function_keys_switch_mode_and_deploy() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::F(1)), &mut state), None);
        assert_eq!(
            handle_key(key(KeyCode::F(2)), &mut state),
            Some(UserCommand::SwitchMode(Mode::Bidding))
        );
        assert_eq!(handle_key(key(KeyCode::F(3)), &mut state), Some(UserCommand::Deploy));
    }

    #[test]
    fn enter_bids_or_ends_by_ownership() {
        let mut state = bidding_state();
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), Some(UserCommand::Bid));
        state.snapshot.can_end = true;
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::EndAuction)
        );
    }

    #[test]
    fn contract_cycle_wraps_through_unselected() {
        let mut state = bidding_state();
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::SelectContract(Some("0xAAA".into())))
        );
        state.snapshot.selection.contract = Some("0xaaa".into());
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::SelectContract(Some("0xBBB".into())))
        );
        state.snapshot.selection.contract = Some("0xBBB".into());
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::SelectContract(None))
        );
        state.snapshot.selection.contract = None;
        assert_eq!(
            handle_key(key(KeyCode::Left), &mut state),
            Some(UserCommand::SelectContract(Some("0xBBB".into())))
        );
    }

    #[test]
    fn token_cycle_follows_mint_order() {
        let mut state = bidding_state();
        state.snapshot.token_ids = vec![U256::from(1), U256::from(2)];
        assert_eq!(
            handle_key(key(KeyCode::Down), &mut state),
            Some(UserCommand::SelectToken(Some(U256::from(1))))
        );
        state.snapshot.selection.token_id = Some(U256::from(2));
        assert_eq!(
            handle_key(key(KeyCode::Down), &mut state),
            Some(UserCommand::SelectToken(None))
        );
        assert_eq!(
            handle_key(key(KeyCode::Up), &mut state),
            Some(UserCommand::SelectToken(Some(U256::from(1))))
        );
    }

    #[test]
    fn token_cycle_wraps_past_repeated_ids() {
        let mut state = bidding_state();
        state.snapshot.token_ids = [1u64, 2, 3, 3].into_iter().map(U256::from).collect();

        let mut seen = Vec::new();
        for _ in 0..8 {
            let Some(UserCommand::SelectToken(next)) = handle_key(key(KeyCode::Down), &mut state)
            else {
                panic!("Down should select a token");
            };
            state.snapshot.selection.token_id = next;
            seen.push(next.map(|id| u64::try_from(id).unwrap()));
        }
        assert_eq!(
            seen,
            vec![Some(1), Some(2), Some(3), None, Some(1), Some(2), Some(3), None]
        );

        state.snapshot.selection.token_id = None;
        assert_eq!(
            handle_key(key(KeyCode::Up), &mut state),
            Some(UserCommand::SelectToken(Some(U256::from(3))))
        );
    }

    #[test]
    fn arrows_do_nothing_in_listing_mode() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Right), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Down), &mut state), None);
    }

    #[test]
    fn page_keys_scroll_log() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::PageUp), &mut state);
        handle_key(key(KeyCode::PageUp), &mut state);
        assert_eq!(state.log_scroll_back, 20);
        handle_key(key(KeyCode::PageDown), &mut state);
        assert_eq!(state.log_scroll_back, 10);
        handle_key(key(KeyCode::PageDown), &mut state);
        handle_key(key(KeyCode::PageDown), &mut state);
        assert_eq!(state.log_scroll_back, 0);
    }
}
