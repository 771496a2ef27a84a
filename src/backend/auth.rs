//! Identity service client (GoTrue): password sign-in, token refresh,
//! sign-out and session-change notifications.

use super::rest::api_error;
use super::session_store::SessionStore;
use super::{BackendError, HTTP_CLIENT};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sessions are treated as expired this many seconds before `expires_at`,
/// capped at half the token lifetime.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Minimum spacing between refresh attempts by the background refresher.
const MIN_REFRESH_GAP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// An authenticated operator session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    /// When the token was issued; 0 if unknown (older session files).
    #[serde(default)]
    pub issued_at: i64,
    pub user: User,
}

impl Session {
    /// How early to refresh. Short-lived tokens get half their lifetime so a
    /// fresh token never counts as expired.
    fn expiry_margin(&self) -> i64 {
        if self.issued_at > 0 && self.expires_at > self.issued_at {
            EXPIRY_MARGIN_SECS.min((self.expires_at - self.issued_at) / 2)
        } else {
            EXPIRY_MARGIN_SECS
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now + self.expiry_margin() >= self.expires_at
    }

    /// Past `expires_at` itself; the access token no longer works.
    pub fn is_past_expiry_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Seconds until the session should be refreshed.
    pub fn refresh_in(&self, now: i64) -> Duration {
        let secs = self.expires_at - self.expiry_margin() - now;
        Duration::from_secs(secs.max(0) as u64)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            issued_at: now,
            user: self.user,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    store: Option<SessionStore>,
    session: watch::Sender<Option<Session>>,
    /// Serializes refreshes so a refresh token is redeemed once.
    refresh_lock: Mutex<()>,
}

impl AuthClient {
    /// Create a client seeded with the session persisted in `store`, if any.
    pub fn new(base_url: &str, anon_key: &str, store: Option<SessionStore>) -> Self {
        let persisted = store.as_ref().and_then(|s| match s.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                None
            }
        });
        let (session, _) = watch::channel(persisted);
        Self {
            client: HTTP_CLIENT.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            store,
            session,
            refresh_lock: Mutex::new(()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Notified on sign-in, sign-out, refresh and refresh failure.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Current session as last published, without refreshing.
    pub fn current(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Replace the current session, persisting it and notifying subscribers.
    pub fn publish(&self, session: Option<Session>) {
        if let Some(store) = &self.store {
            let persisted = match &session {
                Some(s) => store.save(s),
                None => store.clear(),
            };
            if let Err(e) = persisted {
                tracing::warn!("Failed to persist session: {}", e);
            }
        }
        self.session.send_replace(session);
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(BackendError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err = api_error(response).await;
            if status == 400 || status == 401 {
                tracing::info!("Sign-in rejected for {}: {}", email, err);
                return Err(AuthError::InvalidCredentials);
            }
            return Err(err.into());
        }

        let token: TokenResponse = response.json().await.map_err(BackendError::from)?;
        let session = token.into_session(Utc::now().timestamp());
        tracing::info!("Signed in as {}", session.user.display_name());
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Exchange the refresh token for a new session and publish it.
    ///
    /// A rejected refresh token clears the session.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.current() else {
            return Err(BackendError::NotAuthenticated.into());
        };
        // Another caller refreshed while we waited on the lock
        if !current.is_expired() {
            return Ok(current);
        }

        let response = self
            .client
            .post(self.endpoint("token?grant_type=refresh_token"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": current.refresh_token }))
            .send()
            .await
            .map_err(BackendError::from)?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            if matches!(err, BackendError::Api { status, .. } if (400..500).contains(&status)) {
                tracing::warn!("Session refresh rejected, signing out: {}", err);
                self.publish(None);
            }
            return Err(err.into());
        }

        let token: TokenResponse = response.json().await.map_err(BackendError::from)?;
        let session = token.into_session(Utc::now().timestamp());
        tracing::debug!("Session refreshed, expires at {}", session.expires_at);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// The current session, refreshed first when it has expired.
    pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        match self.current() {
            None => Ok(None),
            Some(session) if !session.is_expired() => Ok(Some(session)),
            Some(_) => match self.refresh_session().await {
                Ok(session) => Ok(Some(session)),
                Err(AuthError::Backend(BackendError::Api { status, .. }))
                    if (400..500).contains(&status) =>
                {
                    Ok(None)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Bearer token for data requests.
    pub async fn access_token(&self) -> Result<String, BackendError> {
        match self.get_session().await {
            Ok(Some(session)) => Ok(session.access_token),
            Ok(None) => Err(BackendError::NotAuthenticated),
            Err(AuthError::Backend(e)) => Err(e),
            Err(AuthError::InvalidCredentials) => Err(BackendError::NotAuthenticated),
        }
    }

    /// Revoke the session remotely (best effort) and always clear it locally.
    pub async fn sign_out(&self) {
        if let Some(session) = self.current() {
            let result = self
                .client
                .post(self.endpoint("logout"))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", session.access_token))
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::debug!("Remote sign-out returned {}", response.status());
                }
                Err(e) => tracing::debug!("Remote sign-out failed: {}", e),
                Ok(_) => {}
            }
        }
        tracing::info!("Signed out");
        self.publish(None);
    }

    /// Keep the session fresh: sleep until shortly before expiry, then
    /// refresh, never more often than `MIN_REFRESH_GAP`.
    ///
    /// A rejected refresh token signs out (inside `refresh_session`). Other
    /// failures are retried while the access token is still valid and sign
    /// out only once it has actually expired.
    pub fn spawn_refresher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let auth = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = auth.subscribe();
            let mut last_attempt: Option<Instant> = None;
            loop {
                let current = rx.borrow_and_update().clone();
                let wait = current.as_ref().map(|s| {
                    let due = s.refresh_in(Utc::now().timestamp());
                    let gap = last_attempt
                        .map(|at| MIN_REFRESH_GAP.saturating_sub(at.elapsed()))
                        .unwrap_or_default();
                    due.max(gap)
                });

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = sleep_or_forever(wait) => {}
                }

                last_attempt = Some(Instant::now());
                let Err(e) = auth.refresh_session().await else {
                    continue;
                };
                match auth.current() {
                    // Refresh token rejected; already signed out
                    None => {}
                    Some(session) if session.is_past_expiry_at(Utc::now().timestamp()) => {
                        tracing::warn!("Session expired and refresh failed, signing out: {}", e);
                        auth.publish(None);
                    }
                    Some(_) => {
                        tracing::warn!("Background session refresh failed, will retry: {}", e);
                    }
                }
            }
            tracing::debug!("Session refresher stopped");
        })
    }
}

async fn sleep_or_forever(wait: Option<Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at,
            issued_at: 0,
            user: User {
                id: "u1".into(),
                email: Some("op@ambiente.gob.ar".into()),
            },
        }
    }

    #[test]
    fn test_expiry_margin() {
        let s = session(1_000);
        assert!(!s.is_expired_at(900));
        assert!(s.is_expired_at(940));
        assert!(s.is_expired_at(2_000));
    }

    #[test]
    fn test_refresh_in_never_negative() {
        let s = session(1_000);
        assert_eq!(s.refresh_in(840), Duration::from_secs(100));
        assert_eq!(s.refresh_in(5_000), Duration::ZERO);
    }

    #[test]
    fn test_token_response_without_expires_at() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": "u1", "email": "op@ambiente.gob.ar", "role": "authenticated" }
        }))
        .unwrap();
        let s = token.into_session(10);
        assert_eq!(s.expires_at, 3610);
        assert_eq!(s.user.display_name(), "op@ambiente.gob.ar");
    }

    #[test]
    fn test_publish_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let auth = AuthClient::new("https://demo.supabase.co", "key", Some(store.clone()));
        let mut rx = auth.subscribe();
        assert!(auth.current().is_none());

        auth.publish(Some(session(i64::MAX / 2)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.user.id.as_str()), Some("u1"));
        assert!(store.load().unwrap().is_some());

        auth.publish(None);
        assert!(rx.borrow_and_update().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_persisted_session_seeds_client() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&session(i64::MAX / 2)).unwrap();
        let auth = AuthClient::new("https://demo.supabase.co", "key", Some(store));
        assert_eq!(auth.current().map(|s| s.user.id), Some("u1".to_string()));
    }

    #[test]
    fn test_short_lived_token_is_fresh_when_issued() {
        let s = Session {
            issued_at: 1_000,
            ..session(1_030)
        };
        assert!(!s.is_expired_at(1_000));
        assert!(s.is_expired_at(1_015));
        assert_eq!(s.refresh_in(1_000), Duration::from_secs(15));
        assert!(!s.is_past_expiry_at(1_029));
        assert!(s.is_past_expiry_at(1_030));
    }

    #[test]
    fn test_session_file_without_issued_at() {
        let s: Session = serde_json::from_value(json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_at": 1_000,
            "user": { "id": "u1" }
        }))
        .unwrap();
        assert_eq!(s.issued_at, 0);
        assert!(s.is_expired_at(940));
    }

    /// Answers every request with a token living `expires_in` seconds and
    /// counts the connections.
    async fn token_server(expires_in: i64) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = json!({
                    "access_token": "fresh",
                    "refresh_token": "r2",
                    "expires_in": expires_in,
                    "user": { "id": "u1" }
                })
                .to_string();
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}", addr), hits)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let Ok(n) = socket.read(&mut buf).await else { return };
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= header_end + 4 + body_len {
                return;
            }
        }
    }

    async fn wait_until(auth: &AuthClient, done: impl Fn(Option<Session>) -> bool) -> bool {
        for _ in 0..100 {
            if done(auth.current()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_refresher_keeps_valid_session_on_transport_error() {
        // Nothing listens on port 1
        let auth = Arc::new(AuthClient::new("http://127.0.0.1:1", "key", None));
        let now = Utc::now().timestamp();
        auth.publish(Some(Session {
            issued_at: now - 3541,
            ..session(now + 59)
        }));

        let cancel = CancellationToken::new();
        let handle = auth.spawn_refresher(cancel.clone());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(auth.current().is_some());
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_refresher_signs_out_once_token_expired() {
        let auth = Arc::new(AuthClient::new("http://127.0.0.1:1", "key", None));
        let now = Utc::now().timestamp();
        auth.publish(Some(Session {
            issued_at: now - 3601,
            ..session(now - 1)
        }));

        let cancel = CancellationToken::new();
        let handle = auth.spawn_refresher(cancel.clone());

        assert!(wait_until(&auth, |s| s.is_none()).await);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_short_lived_tokens_are_not_refreshed_in_a_loop() {
        let (base_url, hits) = token_server(30).await;
        let auth = Arc::new(AuthClient::new(&base_url, "key", None));
        let now = Utc::now().timestamp();
        auth.publish(Some(Session {
            issued_at: now - 30,
            ..session(now)
        }));

        let cancel = CancellationToken::new();
        let handle = auth.spawn_refresher(cancel.clone());

        assert!(wait_until(&auth, |s| s.is_some_and(|s| s.access_token == "fresh")).await);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_session_without_session() {
        let auth = AuthClient::new("https://demo.supabase.co", "key", None);
        assert!(auth.get_session().await.unwrap().is_none());
        assert!(matches!(
            auth.access_token().await,
            Err(BackendError::NotAuthenticated)
        ));
    }
}
