//! Icons used throughout the UI.

// Ticket status (fractional circles by progress)
pub const TICKET_PENDING: &str = "○"; // Empty circle
pub const TICKET_IMAGE_CHECK: &str = "◔"; // 1/4 filled - photo under review
pub const TICKET_GPS_CHECK: &str = "◔";
pub const TICKET_IN_PROGRESS: &str = "◑"; // 1/2 filled
pub const TICKET_RESOLVED: &str = "●"; // Full circle
pub const TICKET_REJECTED: &str = "⊘"; // Slashed circle

// Program request status
pub const PROGRAM_PENDING: &str = "○";
pub const PROGRAM_CONTACTED: &str = "◑";
pub const PROGRAM_SCHEDULED: &str = "◕";
pub const PROGRAM_CLOSED: &str = "●";

/// Row has no recognised status
pub const STATUS_NONE: &str = "◌";

// Table markers
pub const EXPANDED: &str = "▾";
pub const COLLAPSED: &str = "▸";
pub const SELECTED: &str = "▶";
pub const UPDATING: &str = "…";

// Dashboard cards
pub const CARD_TICKETS: &str = "▤";
pub const CARD_PENDING: &str = "⚠";
pub const CARD_PROGRAMS: &str = "✦";
pub const CARD_CONTACT: &str = "☎";
