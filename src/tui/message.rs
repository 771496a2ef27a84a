//! Message enum for Elm Architecture (TEA) pattern.
//!
//! All possible user actions in the application are represented as messages.
//! This enables unidirectional data flow and testable update logic.

use crate::session::Route;

/// All possible user actions in the application.
///
/// Messages are dispatched from key events and processed by the `App::update()` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────────────────────
    // App lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Quit the application
    Quit,
    /// Reload the current screen with a visible loading state
    Reload,
    /// Sign out and return to the login screen
    SignOut,

    // ─────────────────────────────────────────────────────────────────────────
    // Screens
    // ─────────────────────────────────────────────────────────────────────────
    /// Switch to a main screen
    Navigate(Route),
    /// Cycle to the next main screen
    NextScreen,

    // ─────────────────────────────────────────────────────────────────────────
    // Table navigation
    // ─────────────────────────────────────────────────────────────────────────
    MoveUp,
    MoveDown,
    GotoTop,
    GotoBottom,
    /// Expand or collapse the detail row of the selection
    ToggleDetails,

    // ─────────────────────────────────────────────────────────────────────────
    // Row actions
    // ─────────────────────────────────────────────────────────────────────────
    /// Open the status picker for the selected row
    OpenStatusPicker,
    /// Open the selected row's live chat in the browser
    OpenChat,
    /// Open the selected ticket's photo in the browser
    OpenAttachment,

    // ─────────────────────────────────────────────────────────────────────────
    // Status picker
    // ─────────────────────────────────────────────────────────────────────────
    PickerUp,
    PickerDown,
    /// Highlight the option at index (0-indexed)
    PickerSelect(usize),
    /// Write the highlighted status
    PickerConfirm,

    // ─────────────────────────────────────────────────────────────────────────
    // Login form
    // ─────────────────────────────────────────────────────────────────────────
    LoginInput(char),
    LoginBackspace,
    /// Move focus between email and password
    LoginSwitchField,
    LoginSubmit,

    // ─────────────────────────────────────────────────────────────────────────
    // Modals
    // ─────────────────────────────────────────────────────────────────────────
    /// Toggle help modal
    ToggleHelp,
    /// Close current modal (picker, help or alert)
    CloseModal,

    // ─────────────────────────────────────────────────────────────────────────
    // No-op
    // ─────────────────────────────────────────────────────────────────────────
    /// No operation (for unhandled keys or pending chords)
    None,
}
