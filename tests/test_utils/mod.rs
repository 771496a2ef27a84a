//! Test utilities and fixtures for ambiente tests

#![allow(dead_code)]

use ambiente::backend::auth::{Session, User};
use ambiente::backend::{Backend, BackendError, StatusPatch};
use ambiente::data::schema::decode_rows;
use ambiente::data::{ProgramRequest, Ticket};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A ticket row as PostgREST returns it.
pub fn ticket_json(id: &str, status: Option<&str>) -> Value {
    json!({
        "id": id,
        "ticket_type": "Retiro Especial",
        "status": status,
        "address": "Av. San Martín 1234",
        "waste_type": "Electrodomésticos",
        "quantity": "2 bultos",
        "days_without_service": null,
        "photo_url": "https://storage.example.org/fotos/heladera.jpg",
        "created_at": "2024-03-05T17:30:00+00:00",
        "sla_deadline": null,
        "user_name": "María Gómez",
        "chat_id": 5493516543210u64,
        "live_chat_url": "https://chat.example.org/c/5493516543210"
    })
}

/// A program request row as PostgREST returns it.
pub fn program_json(id: &str, program_type: Option<&str>, status: Option<&str>) -> Value {
    json!({
        "id": id,
        "program_type": program_type,
        "institution_name": "Escuela N° 12",
        "responsible_person": "Prof. Luis Pérez",
        "student_count": 120,
        "address": "Calle 9 de Julio 55",
        "status": status,
        "created_at": "2024-03-04T12:00:00Z",
        "additional_info": null,
        "user_name": null,
        "chat_id": null,
        "live_chat_url": null
    })
}

pub fn ticket(id: &str, status: Option<&str>) -> Ticket {
    Ticket::try_from(&ticket_json(id, status)).expect("fixture ticket decodes")
}

pub fn program(id: &str, program_type: Option<&str>, status: Option<&str>) -> ProgramRequest {
    ProgramRequest::try_from(&program_json(id, program_type, status))
        .expect("fixture program decodes")
}

/// A session that stays valid for an hour.
pub fn valid_session() -> Session {
    Session {
        access_token: "access-token".to_string(),
        refresh_token: "refresh-token".to_string(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
        issued_at: chrono::Utc::now().timestamp(),
        user: User {
            id: "user-1".to_string(),
            email: Some("operador@ambiente.gob.ar".to_string()),
        },
    }
}

/// In-memory `Backend` serving fixed rows.
#[derive(Default)]
pub struct FakeBackend {
    pub tickets: Mutex<Vec<Value>>,
    pub programs: Mutex<Vec<Value>>,
    /// When set, fetches fail with this message.
    pub fetch_error: Mutex<Option<String>>,
    /// When set, status updates fail with this message.
    pub update_error: Mutex<Option<String>>,
    pub updates: Mutex<Vec<StatusPatch>>,
    pub fetches: AtomicUsize,
    pub apply_updates: AtomicBool,
}

impl FakeBackend {
    pub fn with_rows(tickets: Vec<Value>, programs: Vec<Value>) -> Self {
        Self {
            tickets: Mutex::new(tickets),
            programs: Mutex::new(programs),
            ..Self::default()
        }
    }

    pub fn fail_updates(&self, message: &str) {
        *self.update_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_fetches(&self, message: &str) {
        *self.fetch_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn recorded_updates(&self) -> Vec<StatusPatch> {
        self.updates.lock().unwrap().clone()
    }

    fn check_fetch(&self) -> Result<(), BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.fetch_error.lock().unwrap().clone() {
            Some(message) => Err(BackendError::Api {
                status: 503,
                message,
                code: None,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>, BackendError> {
        self.check_fetch()?;
        let rows = self.tickets.lock().unwrap().clone();
        Ok(decode_rows(&rows)?)
    }

    async fn fetch_program_requests(&self) -> Result<Vec<ProgramRequest>, BackendError> {
        self.check_fetch()?;
        let rows = self.programs.lock().unwrap().clone();
        Ok(decode_rows(&rows)?)
    }

    async fn update_status(&self, patch: &StatusPatch) -> Result<(), BackendError> {
        self.updates.lock().unwrap().push(patch.clone());
        if let Some(message) = self.update_error.lock().unwrap().clone() {
            return Err(BackendError::Api {
                status: 403,
                message,
                code: Some("42501".to_string()),
            });
        }
        if self.apply_updates.load(Ordering::SeqCst) {
            let table = if patch.table() == "tickets" {
                &self.tickets
            } else {
                &self.programs
            };
            for row in table.lock().unwrap().iter_mut() {
                if row["id"] == patch.id() {
                    row["status"] = json!(patch.status());
                }
            }
        }
        Ok(())
    }
}
