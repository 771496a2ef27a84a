use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

pub mod aggregate;
pub mod schema;

pub use aggregate::{Bucket, DashboardSnapshot, DashboardStats, DashboardSummary, Histogram};
pub use schema::SchemaError;

/// A fixed status enumeration stored as exact, case-sensitive text in the backend.
pub trait StatusValue: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every value an operator may pick, in display order.
    const ALL: &'static [Self];

    /// Wire representation.
    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Position in `ALL`, used by the status picker.
    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Pending,
    PendingImageValidation,
    PendingGpsVerification,
    InProgress,
    Resolved,
    Rejected,
}

impl TicketStatus {
    /// The two intake sub-states that count as "pending" on the dashboard.
    pub fn awaits_verification(&self) -> bool {
        matches!(self, Self::PendingImageValidation | Self::PendingGpsVerification)
    }
}

impl StatusValue for TicketStatus {
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::PendingImageValidation,
        Self::PendingGpsVerification,
        Self::InProgress,
        Self::Resolved,
        Self::Rejected,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::PendingImageValidation => "Pendiente Validación Imagen",
            Self::PendingGpsVerification => "Pendiente Verificación GPS",
            Self::InProgress => "En Proceso",
            Self::Resolved => "Resuelto",
            Self::Rejected => "Rechazado",
        }
    }
}

/// Program request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStatus {
    Pending,
    Contacted,
    Scheduled,
    Closed,
}

impl StatusValue for ProgramStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Contacted, Self::Scheduled, Self::Closed];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Contacted => "Contactado",
            Self::Scheduled => "Agendado",
            Self::Closed => "Cerrado",
        }
    }
}

/// Kind of citizen request. Known kinds carry extra detail fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TicketKind {
    SpecialPickup,
    CollectionComplaint,
    Other(String),
}

impl TicketKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Retiro Especial" => Self::SpecialPickup,
            "Reclamo Recolección" => Self::CollectionComplaint,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::SpecialPickup => "Retiro Especial",
            Self::CollectionComplaint => "Reclamo Recolección",
            Self::Other(label) => label,
        }
    }
}

/// A citizen service request (special pickup, collection complaint, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub kind: TicketKind,
    pub status: Option<TicketStatus>,
    pub address: Option<String>,
    pub waste_type: Option<String>,
    pub quantity: Option<String>,
    pub days_without_service: Option<u32>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub user_name: Option<String>,
    pub chat_id: Option<String>,
    pub live_chat_url: Option<String>,
}

/// An institution's request to enroll in an environmental program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRequest {
    pub id: String,
    pub program_type: Option<String>,
    pub institution_name: Option<String>,
    pub responsible_person: Option<String>,
    pub student_count: Option<u32>,
    pub address: Option<String>,
    pub status: Option<ProgramStatus>,
    pub created_at: DateTime<Utc>,
    pub additional_info: Option<String>,
    pub user_name: Option<String>,
    pub chat_id: Option<String>,
    pub live_chat_url: Option<String>,
}

/// A row whose status field the operator can change.
pub trait StatusRecord: Clone + Send + Sync + 'static {
    type Status: StatusValue;

    /// Backend table holding these rows.
    const TABLE: &'static str;

    fn id(&self) -> &str;
    fn status(&self) -> Option<Self::Status>;
    fn set_status(&mut self, status: Option<Self::Status>);
    fn live_chat_url(&self) -> Option<&str>;

    /// Attachment worth opening in a browser besides the chat, if any.
    fn attachment_url(&self) -> Option<&str> {
        None
    }
}

impl StatusRecord for Ticket {
    type Status = TicketStatus;
    const TABLE: &'static str = "tickets";

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<TicketStatus> {
        self.status
    }

    fn set_status(&mut self, status: Option<TicketStatus>) {
        self.status = status;
    }

    fn live_chat_url(&self) -> Option<&str> {
        self.live_chat_url.as_deref()
    }

    fn attachment_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }
}

impl StatusRecord for ProgramRequest {
    type Status = ProgramStatus;
    const TABLE: &'static str = "program_requests";

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<ProgramStatus> {
        self.status
    }

    fn set_status(&mut self, status: Option<ProgramStatus>) {
        self.status = status;
    }

    fn live_chat_url(&self) -> Option<&str> {
        self.live_chat_url.as_deref()
    }
}
