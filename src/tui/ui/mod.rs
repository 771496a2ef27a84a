//! TUI rendering module.
//!
//! This module handles all UI rendering for the terminal interface.
//! It's organized into submodules for maintainability:
//!
//! - `icons` - Icons used throughout the UI
//! - `layout` - Layout calculations and text utilities
//! - `status` - Status configuration, tab bar and status bar rendering
//! - `table` - Header and ticket/program tables
//! - `dashboard` - Summary cards and charts
//! - `modals` - Modal popups (status picker, alert)
//! - `login` - Login form

pub mod icons;
pub mod layout;
mod dashboard;
mod login;
mod modals;
mod status;
mod table;

// Re-export the main draw function
pub use self::draw::draw;

mod draw {

    use super::dashboard::draw_dashboard;
    use super::login::draw_login;
    use super::modals::{draw_alert, draw_status_picker};
    use super::status::{draw_help_popup, draw_status_bar, draw_tabs};
    use super::table::{draw_header, draw_list, draw_loading};
    use crate::tui::app::{Modal, Screen};
    use crate::tui::App;
    use ratatui::{
        layout::{Constraint, Direction, Layout},
        Frame,
    };

    /// Main draw function - renders the entire TUI.
    pub fn draw(f: &mut Frame, app: &App) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(1), // Tab bar
                Constraint::Min(0),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        draw_header(f, app, chunks[0]);

        match &app.screen {
            Screen::Checking => draw_loading(f, chunks[2]),
            Screen::Login(form) => draw_login(f, form, app.spinner_char()),
            Screen::Dashboard(screen) => {
                draw_tabs(f, app, chunks[1]);
                draw_dashboard(f, screen, chunks[2]);
            }
            Screen::Tickets(screen) => {
                draw_tabs(f, app, chunks[1]);
                draw_list(f, &screen.view, "Tickets", chunks[2]);
            }
            Screen::Programs(screen) => {
                draw_tabs(f, app, chunks[1]);
                draw_list(f, &screen.view, "Solicitudes de Programas", chunks[2]);
            }
        }

        draw_status_bar(f, app, chunks[3]);

        // Overlays
        match &app.modal {
            Modal::None => {}
            Modal::Help => draw_help_popup(f),
            Modal::StatusPicker { selected } => draw_status_picker(f, app, *selected),
            Modal::Alert { message } => draw_alert(f, message),
        }
    }
}
