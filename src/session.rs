//! Access control for the protected screens.

use crate::backend::auth::{Session, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Tickets,
    Programs,
}

impl Route {
    /// Screens reachable from the navigation bar, in order.
    pub const MAIN: [Route; 3] = [Route::Dashboard, Route::Tickets, Route::Programs];

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Ingreso",
            Route::Dashboard => "Dashboard",
            Route::Tickets => "Tickets",
            Route::Programs => "Programas",
        }
    }

    /// Next main screen, wrapping around.
    pub fn next(&self) -> Route {
        match self {
            Route::Dashboard => Route::Tickets,
            Route::Tickets => Route::Programs,
            Route::Programs | Route::Login => Route::Dashboard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Checking,
    Authenticated(User),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    None,
    RedirectToLogin,
    /// Show the protected content.
    Admit,
}

#[derive(Debug, Default)]
pub struct SessionGuard {
    state: GuardState,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            GuardState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_checking(&self) -> bool {
        self.state == GuardState::Checking
    }

    /// Result of the initial session query for `route`.
    pub fn on_mount(&mut self, route: Route, session: Option<&Session>) -> GuardAction {
        if !route.is_protected() {
            return GuardAction::None;
        }
        self.resolve(session)
    }

    /// A session-change notification arrived.
    pub fn on_session_change(&mut self, route: Route, session: Option<&Session>) -> GuardAction {
        match session {
            // Sign-out or failed refresh: leave wherever we are
            None => {
                let was_authenticated = matches!(self.state, GuardState::Authenticated(_));
                self.state = GuardState::Unauthenticated;
                if route.is_protected() || was_authenticated {
                    GuardAction::RedirectToLogin
                } else {
                    GuardAction::None
                }
            }
            Some(session) => {
                self.state = GuardState::Authenticated(session.user.clone());
                if route.is_protected() {
                    GuardAction::Admit
                } else {
                    GuardAction::None
                }
            }
        }
    }

    fn resolve(&mut self, session: Option<&Session>) -> GuardAction {
        match session {
            Some(session) => {
                self.state = GuardState::Authenticated(session.user.clone());
                GuardAction::Admit
            }
            None => {
                self.state = GuardState::Unauthenticated;
                GuardAction::RedirectToLogin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_cycle() {
        assert_eq!(Route::Dashboard.next(), Route::Tickets);
        assert_eq!(Route::Programs.next(), Route::Dashboard);
        assert!(!Route::Login.is_protected());
        assert!(Route::MAIN.iter().all(Route::is_protected));
    }

    #[test]
    fn test_initial_state_is_checking() {
        let guard = SessionGuard::new();
        assert!(guard.is_checking());
        assert!(guard.user().is_none());
    }
}
