//! Tests for TUI input handling (dispatch layer).
//!
//! Tests the key-to-message mapping for the screens an app can be built
//! into without a backend round-trip.

use ambiente::backend::auth::AuthClient;
use ambiente::config::Config;
use ambiente::tui::input::{dispatch, InputState};
use ambiente::tui::login::{LoginForm, MISSING_FIELDS};
use ambiente::tui::{App, Message, Screen};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::sync::Arc;

mod test_utils;

use test_utils::FakeBackend;

// ============================================================================
// Test Helpers
// ============================================================================

fn key_event(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::empty(),
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

fn key_event_ctrl(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::CONTROL,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

fn app() -> App {
    let auth = Arc::new(AuthClient::new("http://127.0.0.1:9", "anon", None));
    App::new(Config::default(), Arc::new(FakeBackend::default()), auth)
}

fn login_app() -> App {
    let mut app = app();
    app.screen = Screen::Login(LoginForm::new(Some("operador@ambiente.gob.ar")));
    app
}

// ============================================================================
// Input State Tests
// ============================================================================

mod input_state {
    use super::*;

    #[test]
    fn test_new_state_has_no_pending() {
        let input = InputState::new();
        assert!(input.pending.is_none());
        assert!(input.pending_since.is_none());
    }

    #[test]
    fn test_set_pending() {
        let mut input = InputState::new();
        input.set_pending(KeyCode::Char('g'));
        assert!(input.pending.is_some());
        assert!(input.pending_since.is_some());
    }

    #[test]
    fn test_clear_pending() {
        let mut input = InputState::new();
        input.set_pending(KeyCode::Char('g'));
        input.clear();
        assert!(input.pending.is_none());
        assert!(input.pending_since.is_none());
    }

    #[test]
    fn test_timeout_not_immediate() {
        let mut input = InputState::new();
        input.set_pending(KeyCode::Char('g'));
        assert!(!input.has_timed_out());
    }
}

// ============================================================================
// Dispatch
// ============================================================================

mod checking_screen {
    use super::*;

    #[test]
    fn test_only_quit_is_accepted() {
        let app = app();
        let mut input = InputState::new();
        assert!(matches!(app.screen, Screen::Checking));
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Char('q'))),
            Message::Quit
        );
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Char('2'))),
            Message::None
        );
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Char('r'))),
            Message::None
        );
    }
}

mod login_screen {
    use super::*;

    #[test]
    fn test_shortcuts_are_typed_as_text() {
        let app = login_app();
        let mut input = InputState::new();
        for c in ['q', 'L', '1', 'r', '?'] {
            assert_eq!(
                dispatch(&app, &mut input, key_event(KeyCode::Char(c))),
                Message::LoginInput(c)
            );
        }
    }

    #[test]
    fn test_form_keys() {
        let app = login_app();
        let mut input = InputState::new();
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Tab)),
            Message::LoginSwitchField
        );
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Backspace)),
            Message::LoginBackspace
        );
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Enter)),
            Message::LoginSubmit
        );
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let app = login_app();
        let mut input = InputState::new();
        assert_eq!(
            dispatch(&app, &mut input, key_event_ctrl(KeyCode::Char('c'))),
            Message::Quit
        );
    }

    #[test]
    fn test_login_form_edits() {
        let mut app = login_app();
        // A remembered e-mail puts focus on the password
        for c in "clave".chars() {
            app.update(Message::LoginInput(c)).unwrap();
        }
        app.update(Message::LoginBackspace).unwrap();

        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert_eq!(form.email, "operador@ambiente.gob.ar");
        assert_eq!(form.password, "clav");
        assert_eq!(form.masked_password(), "••••");
    }

    #[test]
    fn test_incomplete_form_is_not_submitted() {
        let mut app = login_app();
        app.update(Message::LoginSubmit).unwrap();

        let Screen::Login(form) = &app.screen else {
            panic!("expected login screen");
        };
        assert!(!form.submitting);
        assert_eq!(form.error.as_deref(), Some(MISSING_FIELDS));
    }
}

mod chords {
    use super::*;

    #[test]
    fn test_pending_chord_is_consumed_first() {
        let app = app();
        let mut input = InputState::new();
        input.set_pending(KeyCode::Char('g'));

        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Char('g'))),
            Message::GotoTop
        );
        assert!(input.pending.is_none());
        assert!(input.pending_since.is_none());
    }

    #[test]
    fn test_unknown_chord_is_dropped() {
        let app = app();
        let mut input = InputState::new();
        input.set_pending(KeyCode::Char('g'));
        assert_eq!(
            dispatch(&app, &mut input, key_event(KeyCode::Char('x'))),
            Message::None
        );
        assert!(input.pending.is_none());
    }
}
