//! Tests for the session guard and the login redirects it drives.

mod test_utils;

use ambiente::backend::auth::AuthClient;
use ambiente::backend::session_store::SessionStore;
use ambiente::config::Config;
use ambiente::session::{GuardAction, GuardState, Route, SessionGuard};
use ambiente::tui::{App, Message, Screen};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{valid_session, FakeBackend};

mod guard {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mount_without_session_redirects() {
        let mut guard = SessionGuard::new();
        assert_eq!(
            guard.on_mount(Route::Dashboard, None),
            GuardAction::RedirectToLogin
        );
        assert_eq!(guard.state(), &GuardState::Unauthenticated);
    }

    #[test]
    fn test_mount_with_session_admits() {
        let session = valid_session();
        let mut guard = SessionGuard::new();
        assert_eq!(
            guard.on_mount(Route::Tickets, Some(&session)),
            GuardAction::Admit
        );
        assert_eq!(
            guard.user().and_then(|u| u.email.as_deref()),
            Some("operador@ambiente.gob.ar")
        );
    }

    #[test]
    fn test_login_route_is_not_guarded() {
        let mut guard = SessionGuard::new();
        assert_eq!(guard.on_mount(Route::Login, None), GuardAction::None);
        assert!(guard.is_checking());
    }

    #[test]
    fn test_sign_out_redirects_from_protected_route() {
        let session = valid_session();
        let mut guard = SessionGuard::new();
        guard.on_mount(Route::Programs, Some(&session));

        assert_eq!(
            guard.on_session_change(Route::Programs, None),
            GuardAction::RedirectToLogin
        );
        assert!(guard.user().is_none());
    }

    #[test]
    fn test_sign_in_on_login_route_needs_no_redirect() {
        let session = valid_session();
        let mut guard = SessionGuard::new();
        guard.on_mount(Route::Login, None);
        assert_eq!(
            guard.on_session_change(Route::Login, Some(&session)),
            GuardAction::None
        );
        assert!(guard.user().is_some());
    }

    #[test]
    fn test_refreshed_session_keeps_protected_route() {
        let session = valid_session();
        let mut guard = SessionGuard::new();
        guard.on_mount(Route::Dashboard, Some(&session));
        assert_eq!(
            guard.on_session_change(Route::Dashboard, Some(&session)),
            GuardAction::Admit
        );
    }
}

// ============================================================================
// App redirects
// ============================================================================

async fn settle(app: &mut App, done: impl Fn(&App) -> bool) {
    for _ in 0..400 {
        app.poll_events();
        if done(app) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("app did not reach the expected state");
}

mod app_redirects {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_no_session_lands_on_prefilled_login() {
        let auth = Arc::new(AuthClient::new("http://127.0.0.1:9", "anon", None));
        let mut config = Config::default();
        config.login.email = Some("operador@ambiente.gob.ar".to_string());
        let mut app = App::new(config, Arc::new(FakeBackend::default()), auth);

        app.check_session();
        assert!(matches!(app.screen, Screen::Checking));
        settle(&mut app, |app| matches!(app.screen, Screen::Login(_))).await;

        let Screen::Login(form) = &app.screen else {
            unreachable!()
        };
        assert_eq!(form.email, "operador@ambiente.gob.ar");
        assert!(form.error.is_none());
        assert_eq!(app.current_route(), Route::Login);
    }

    #[tokio::test]
    async fn test_protected_navigation_requires_session() {
        let auth = Arc::new(AuthClient::new("http://127.0.0.1:9", "anon", None));
        let mut app = App::new(Config::default(), Arc::new(FakeBackend::default()), auth);
        app.check_session();
        settle(&mut app, |app| matches!(app.screen, Screen::Login(_))).await;

        app.update(Message::Navigate(Route::Tickets)).unwrap();
        assert!(matches!(app.screen, Screen::Login(_)));
    }

    #[tokio::test]
    async fn test_session_loss_returns_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&valid_session()).unwrap();
        let auth = Arc::new(AuthClient::new(
            "http://127.0.0.1:9",
            "anon",
            Some(store.clone()),
        ));
        let mut app = App::new(
            Config::default(),
            Arc::new(FakeBackend::default()),
            Arc::clone(&auth),
        );
        app.check_session();
        settle(&mut app, |app| matches!(app.screen, Screen::Dashboard(_))).await;
        assert_eq!(app.current_route(), Route::Dashboard);

        // What the refresher does when the refresh token is rejected
        auth.publish(None);
        settle(&mut app, |app| matches!(app.screen, Screen::Login(_))).await;

        assert_eq!(app.guard.state(), &GuardState::Unauthenticated);
        assert!(store.load().unwrap().is_none());
    }
}
