pub mod auth;
pub mod rest;
pub mod session_store;

use crate::data::schema::decode_rows;
use crate::data::{
    DashboardSnapshot, ProgramRequest, SchemaError, StatusRecord, StatusValue, Ticket,
};
use async_trait::async_trait;
use auth::AuthClient;
use once_cell::sync::Lazy;
use rest::{RestClient, NEWEST_FIRST};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared HTTP client for all API requests to enable connection pooling
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .expect("Failed to create HTTP client")
});

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("request cancelled")]
    Cancelled,

    #[error("not signed in")]
    NotAuthenticated,
}

/// A single-field status write.
///
/// Only constructible from a typed status, so the value sent is always one
/// of the table's enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPatch {
    table: &'static str,
    id: String,
    status: &'static str,
}

impl StatusPatch {
    pub fn new<R: StatusRecord>(id: &str, status: R::Status) -> Self {
        Self {
            table: R::TABLE,
            id: id.to_string(),
            status: status.as_str(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> &'static str {
        self.status
    }
}

/// Data operations the screens depend on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All tickets, newest first.
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>, BackendError>;

    /// All program requests, newest first.
    async fn fetch_program_requests(&self) -> Result<Vec<ProgramRequest>, BackendError>;

    async fn update_status(&self, patch: &StatusPatch) -> Result<(), BackendError>;

    /// Both collections, fetched concurrently.
    async fn fetch_dashboard(&self) -> Result<DashboardSnapshot, BackendError> {
        let (tickets, programs) =
            tokio::try_join!(self.fetch_tickets(), self.fetch_program_requests())?;
        Ok(DashboardSnapshot { tickets, programs })
    }
}

/// Records fetchable as a whole collection through a `Backend`.
///
/// Lets list screens be generic over the record type.
#[async_trait]
pub trait Fetch: StatusRecord {
    async fn fetch_all(backend: &dyn Backend) -> Result<Vec<Self>, BackendError>;
}

#[async_trait]
impl Fetch for Ticket {
    async fn fetch_all(backend: &dyn Backend) -> Result<Vec<Self>, BackendError> {
        backend.fetch_tickets().await
    }
}

#[async_trait]
impl Fetch for ProgramRequest {
    async fn fetch_all(backend: &dyn Backend) -> Result<Vec<Self>, BackendError> {
        backend.fetch_program_requests().await
    }
}

/// `Backend` over the hosted PostgREST + GoTrue project.
pub struct SupabaseBackend {
    rest: RestClient,
    auth: Arc<AuthClient>,
}

impl SupabaseBackend {
    pub fn new(rest: RestClient, auth: Arc<AuthClient>) -> Self {
        Self { rest, auth }
    }

    async fn select<T>(&self) -> Result<Vec<T>, BackendError>
    where
        T: StatusRecord + for<'a> TryFrom<&'a serde_json::Value, Error = SchemaError>,
    {
        let token = self.auth.access_token().await?;
        let rows = self.rest.select_all(T::TABLE, NEWEST_FIRST, &token).await?;
        let decoded = decode_rows(&rows)?;
        tracing::debug!("Fetched {} rows from {}", rows.len(), T::TABLE);
        Ok(decoded)
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn fetch_tickets(&self) -> Result<Vec<Ticket>, BackendError> {
        self.select::<Ticket>().await
    }

    async fn fetch_program_requests(&self) -> Result<Vec<ProgramRequest>, BackendError> {
        self.select::<ProgramRequest>().await
    }

    async fn update_status(&self, patch: &StatusPatch) -> Result<(), BackendError> {
        let token = self.auth.access_token().await?;
        self.rest
            .update_by_id(
                patch.table(),
                patch.id(),
                &json!({ "status": patch.status() }),
                &token,
            )
            .await?;
        tracing::info!(
            "Updated {} {} to status '{}'",
            patch.table(),
            patch.id(),
            patch.status()
        );
        Ok(())
    }
}
