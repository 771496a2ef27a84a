//! Validation boundary for rows coming out of the data service.
//!
//! PostgREST hands back loosely shaped JSON. Everything past this module
//! works with `Ticket` / `ProgramRequest`; anything that does not fit is a
//! `SchemaError` naming the table, row and field.

use super::{ProgramRequest, ProgramStatus, StatusValue, Ticket, TicketKind, TicketStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{table}: row is not a JSON object")]
    NotAnObject { table: &'static str },

    #[error("{table} row {id}: missing required field '{field}'")]
    MissingField {
        table: &'static str,
        id: String,
        field: &'static str,
    },

    #[error("{table} row {id}: invalid value '{value}' for field '{field}'")]
    InvalidField {
        table: &'static str,
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("{table} row {id}: unknown status '{value}'")]
    UnknownStatus {
        table: &'static str,
        id: String,
        value: String,
    },
}

impl TryFrom<&Value> for Ticket {
    type Error = SchemaError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let row = Row::new("tickets", value)?;
        Ok(Ticket {
            kind: TicketKind::from_wire(&row.text("ticket_type").unwrap_or_default()),
            status: row.status::<TicketStatus>()?,
            address: row.text("address"),
            waste_type: row.text("waste_type"),
            quantity: row.text("quantity"),
            days_without_service: row.count("days_without_service")?,
            photo_url: row.text("photo_url"),
            created_at: row.required_timestamp("created_at")?,
            sla_deadline: row.timestamp("sla_deadline")?,
            user_name: row.text("user_name"),
            chat_id: row.text("chat_id"),
            live_chat_url: row.text("live_chat_url"),
            id: row.id,
        })
    }
}

impl TryFrom<&Value> for ProgramRequest {
    type Error = SchemaError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let row = Row::new("program_requests", value)?;
        Ok(ProgramRequest {
            program_type: row.text("program_type"),
            institution_name: row.text("institution_name"),
            responsible_person: row.text("responsible_person"),
            student_count: row.count("student_count")?,
            address: row.text("address"),
            status: row.status::<ProgramStatus>()?,
            created_at: row.required_timestamp("created_at")?,
            additional_info: row.text("additional_info"),
            user_name: row.text("user_name"),
            chat_id: row.text("chat_id"),
            live_chat_url: row.text("live_chat_url"),
            id: row.id,
        })
    }
}

/// Decode every row, failing on the first one that does not validate.
pub fn decode_rows<T>(rows: &[Value]) -> Result<Vec<T>, SchemaError>
where
    T: for<'a> TryFrom<&'a Value, Error = SchemaError>,
{
    rows.iter().map(T::try_from).collect()
}

struct Row<'a> {
    table: &'static str,
    id: String,
    fields: &'a Map<String, Value>,
}

impl<'a> Row<'a> {
    fn new(table: &'static str, value: &'a Value) -> Result<Self, SchemaError> {
        let fields = value
            .as_object()
            .ok_or(SchemaError::NotAnObject { table })?;
        let id = match fields.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(SchemaError::MissingField {
                    table,
                    id: "?".to_string(),
                    field: "id",
                })
            }
        };
        Ok(Self { table, id, fields })
    }

    /// Optional text. Null, missing and blank all read as `None`; numbers are
    /// accepted and stringified (chat ids are numeric in some rows).
    fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn count(&self, field: &'static str) -> Result<Option<u32>, SchemaError> {
        let parsed = match self.fields.get(field) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            Some(_) => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(field, self.fields.get(field)))
    }

    fn timestamp(&self, field: &'static str) -> Result<Option<DateTime<Utc>>, SchemaError> {
        let Some(raw) = self.text(field) else {
            return Ok(None);
        };
        parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| self.invalid(field, self.fields.get(field)))
    }

    fn required_timestamp(&self, field: &'static str) -> Result<DateTime<Utc>, SchemaError> {
        self.timestamp(field)?.ok_or_else(|| SchemaError::MissingField {
            table: self.table,
            id: self.id.clone(),
            field,
        })
    }

    fn status<S: StatusValue>(&self) -> Result<Option<S>, SchemaError> {
        let Some(raw) = self.text("status") else {
            return Ok(None);
        };
        S::parse(&raw).map(Some).ok_or_else(|| SchemaError::UnknownStatus {
            table: self.table,
            id: self.id.clone(),
            value: raw,
        })
    }

    fn invalid(&self, field: &'static str, value: Option<&Value>) -> SchemaError {
        SchemaError::InvalidField {
            table: self.table,
            id: self.id.clone(),
            field,
            value: value.map(|v| v.to_string()).unwrap_or_default(),
        }
    }
}

/// PostgREST renders `timestamptz` as RFC 3339; plain `timestamp` columns
/// come without an offset and are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // "2024-05-01 12:00:00+00" (Postgres text cast)
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
