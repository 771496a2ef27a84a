//! Tests for decoding backend rows into typed records.

mod test_utils;

use ambiente::data::schema::decode_rows;
use ambiente::data::{ProgramRequest, ProgramStatus, SchemaError, Ticket, TicketKind, TicketStatus};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_utils::{program_json, ticket_json};

#[test]
fn test_ticket_row_decodes() {
    let ticket = Ticket::try_from(&ticket_json("t1", Some("En Proceso"))).unwrap();

    assert_eq!(ticket.id, "t1");
    assert_eq!(ticket.kind, TicketKind::SpecialPickup);
    assert_eq!(ticket.status, Some(TicketStatus::InProgress));
    assert_eq!(ticket.waste_type.as_deref(), Some("Electrodomésticos"));
    // Numeric chat ids are kept as text
    assert_eq!(ticket.chat_id.as_deref(), Some("5493516543210"));
    assert_eq!(ticket.days_without_service, None);
}

#[test]
fn test_unknown_status_is_rejected() {
    let err = Ticket::try_from(&ticket_json("t9", Some("pendiente"))).unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownStatus {
            table: "tickets",
            id: "t9".to_string(),
            value: "pendiente".to_string(),
        }
    );
}

#[test]
fn test_blank_status_reads_as_none() {
    let program = ProgramRequest::try_from(&program_json("p1", Some("separa"), Some(""))).unwrap();
    assert_eq!(program.status, None);

    let program =
        ProgramRequest::try_from(&program_json("p2", Some("separa"), Some("Agendado"))).unwrap();
    assert_eq!(program.status, Some(ProgramStatus::Scheduled));
    assert_eq!(program.student_count, Some(120));
}

#[test]
fn test_missing_created_at_is_an_error() {
    let mut row = ticket_json("t2", None);
    row.as_object_mut().unwrap().remove("created_at");

    let err = Ticket::try_from(&row).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::MissingField {
            field: "created_at",
            ..
        }
    ));
}

#[test]
fn test_other_ticket_kinds_keep_their_label() {
    let mut row = ticket_json("t3", Some("Pendiente"));
    row["ticket_type"] = json!("Poda");
    let ticket = Ticket::try_from(&row).unwrap();
    assert_eq!(ticket.kind, TicketKind::Other("Poda".to_string()));
    assert_eq!(ticket.kind.label(), "Poda");
}

#[test]
fn test_decode_rows_fails_on_first_bad_row() {
    let rows = vec![
        ticket_json("t1", Some("Resuelto")),
        json!("not an object"),
        ticket_json("t3", Some("Resuelto")),
    ];
    let result: Result<Vec<Ticket>, _> = decode_rows(&rows);
    assert_eq!(
        result.unwrap_err(),
        SchemaError::NotAnObject { table: "tickets" }
    );
}
