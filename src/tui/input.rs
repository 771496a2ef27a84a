//! Input dispatch layer for Elm Architecture (TEA) pattern.
//!
//! Maps key events to messages based on the current screen and modal.
//! Handles the `gg` chord with a non-blocking state machine.

use super::app::{Modal, Screen};
use super::{App, Message};
use crate::session::Route;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

/// State machine for handling key chords (gg).
///
/// Instead of blocking with `event::poll()` inline, we track pending keys
/// and check for timeout in the main event loop.
#[derive(Debug, Default)]
pub struct InputState {
    /// The first key of a potential chord sequence
    pub pending: Option<KeyCode>,
    /// When the pending key was pressed (for timeout detection)
    pub pending_since: Option<Instant>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there's a pending chord that has timed out (500ms).
    pub fn has_timed_out(&self) -> bool {
        if let Some(since) = self.pending_since {
            since.elapsed().as_millis() > 500
        } else {
            false
        }
    }

    /// Clear the pending chord state.
    pub fn clear(&mut self) {
        self.pending = None;
        self.pending_since = None;
    }

    /// Set a pending chord key.
    pub fn set_pending(&mut self, key: KeyCode) {
        self.pending = Some(key);
        self.pending_since = Some(Instant::now());
    }
}

/// Map key events to messages based on current app mode.
pub fn dispatch(app: &App, input: &mut InputState, key: KeyEvent) -> Message {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Message::Quit;
    }

    // Handle pending chords first
    if let Some(pending) = input.pending.take() {
        input.pending_since = None;
        return handle_chord(pending, key.code);
    }

    match (&app.screen, &app.modal) {
        (Screen::Checking, _) => dispatch_checking(key),
        (Screen::Login(_), _) => dispatch_login(key),
        (_, Modal::Alert { .. }) => dispatch_alert(key),
        (_, Modal::Help) => dispatch_help_modal(key),
        (_, Modal::StatusPicker { .. }) => dispatch_status_picker(key),
        (Screen::Dashboard(_), Modal::None) => dispatch_dashboard(key),
        (Screen::Tickets(_) | Screen::Programs(_), Modal::None) => dispatch_list(input, key),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mode-specific dispatch functions
// ─────────────────────────────────────────────────────────────────────────────

fn dispatch_checking(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Message::Quit,
        _ => Message::None,
    }
}

/// Handle keys on the login form. Every printable key is text input.
fn dispatch_login(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::Quit,
        KeyCode::Enter => Message::LoginSubmit,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => Message::LoginSwitchField,
        KeyCode::Backspace => Message::LoginBackspace,
        KeyCode::Char(c) => Message::LoginInput(c),
        _ => Message::None,
    }
}

/// Keys shared by every main screen.
fn dispatch_global(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('q') => Message::Quit,
        KeyCode::Char('1') => Message::Navigate(Route::Dashboard),
        KeyCode::Char('2') => Message::Navigate(Route::Tickets),
        KeyCode::Char('3') => Message::Navigate(Route::Programs),
        KeyCode::Tab => Message::NextScreen,
        KeyCode::Char('r') => Message::Reload,
        KeyCode::Char('?') => Message::ToggleHelp,
        KeyCode::Char('L') => Message::SignOut,
        _ => Message::None,
    }
}

fn dispatch_dashboard(key: KeyEvent) -> Message {
    dispatch_global(key)
}

/// Handle keys on the ticket and program tables.
fn dispatch_list(input: &mut InputState, key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Message::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Message::MoveUp,
        KeyCode::Char('G') | KeyCode::End => Message::GotoBottom,
        KeyCode::Home => Message::GotoTop,
        KeyCode::Char('g') => {
            input.set_pending(KeyCode::Char('g'));
            Message::None
        }
        KeyCode::Enter | KeyCode::Char(' ') => Message::ToggleDetails,
        KeyCode::Char('s') => Message::OpenStatusPicker,
        KeyCode::Char('o') => Message::OpenChat,
        KeyCode::Char('p') => Message::OpenAttachment,
        _ => dispatch_global(key),
    }
}

/// Handle keys in help modal.
fn dispatch_help_modal(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Message::CloseModal,
        _ => Message::None,
    }
}

fn dispatch_alert(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Message::CloseModal,
        _ => Message::None,
    }
}

/// Handle keys in the status picker. Digits jump to an option.
fn dispatch_status_picker(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Message::CloseModal,
        KeyCode::Char('j') | KeyCode::Down => Message::PickerDown,
        KeyCode::Char('k') | KeyCode::Up => Message::PickerUp,
        KeyCode::Enter => Message::PickerConfirm,
        KeyCode::Char(c) => match c.to_digit(10) {
            Some(digit) if digit >= 1 => Message::PickerSelect(digit as usize - 1),
            _ => Message::None,
        },
        _ => Message::None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chord handling
// ─────────────────────────────────────────────────────────────────────────────

/// Handle the second key of a chord sequence.
fn handle_chord(first: KeyCode, second: KeyCode) -> Message {
    match (first, second) {
        (KeyCode::Char('g'), KeyCode::Char('g')) => Message::GotoTop,
        _ => Message::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn test_list_navigation() {
        let mut input = InputState::new();
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('j'))),
            Message::MoveDown
        );
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('k'))),
            Message::MoveUp
        );
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('G'))),
            Message::GotoBottom
        );
    }

    #[test]
    fn test_list_falls_back_to_global_keys() {
        let mut input = InputState::new();
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('2'))),
            Message::Navigate(Route::Tickets)
        );
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('r'))),
            Message::Reload
        );
        assert_eq!(
            dispatch_list(&mut input, key_event(KeyCode::Char('q'))),
            Message::Quit
        );
    }

    #[test]
    fn test_chord_pending_state() {
        let mut input = InputState::new();
        let msg = dispatch_list(&mut input, key_event(KeyCode::Char('g')));
        assert_eq!(msg, Message::None);
        assert!(input.pending.is_some());
        assert_eq!(
            handle_chord(KeyCode::Char('g'), KeyCode::Char('g')),
            Message::GotoTop
        );
        assert_eq!(
            handle_chord(KeyCode::Char('g'), KeyCode::Char('x')),
            Message::None
        );
    }

    #[test]
    fn test_login_keys_are_text() {
        // 'q' and digits are typed, not shortcuts, on the login form
        assert_eq!(
            dispatch_login(key_event(KeyCode::Char('q'))),
            Message::LoginInput('q')
        );
        assert_eq!(
            dispatch_login(key_event(KeyCode::Char('1'))),
            Message::LoginInput('1')
        );
        assert_eq!(dispatch_login(key_event(KeyCode::Enter)), Message::LoginSubmit);
        assert_eq!(dispatch_login(key_event(KeyCode::Esc)), Message::Quit);
    }

    #[test]
    fn test_status_picker_digits() {
        assert_eq!(
            dispatch_status_picker(key_event(KeyCode::Char('3'))),
            Message::PickerSelect(2)
        );
        assert_eq!(
            dispatch_status_picker(key_event(KeyCode::Char('0'))),
            Message::None
        );
        assert_eq!(
            dispatch_status_picker(key_event(KeyCode::Enter)),
            Message::PickerConfirm
        );
    }
}
