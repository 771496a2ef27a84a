//! Utility functions and helpers.

use anyhow::Result;
use chrono::{DateTime, Datelike, TimeZone};
use std::fmt::Display;
use tokio::sync::mpsc;

/// Send a value through a channel, logging a warning if it fails.
///
/// This eliminates the repetitive pattern:
/// ```ignore
/// if let Err(e) = tx.send(value).await {
///     tracing::warn!("Failed to send: {}", e);
/// }
/// ```
pub async fn send_or_log<T>(tx: &mpsc::Sender<T>, value: T, context: &str) {
    if let Err(e) = tx.send(value).await {
        tracing::warn!("Failed to send {}: {}", context, e);
    }
}

/// Show only the first and last five characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Open a URL with the desktop's default handler.
pub fn open_url(url: &str) -> Result<()> {
    // Use xdg-open on Linux, which works in WSL
    std::process::Command::new("xdg-open")
        .arg(url)
        .spawn()
        .or_else(|_| {
            // Fallback to wslview for WSL
            std::process::Command::new("wslview").arg(url).spawn()
        })?;
    Ok(())
}

const MONTHS_ES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Table date: `05 mar 14:30`
pub fn short_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "{:02} {} {}",
        dt.day(),
        MONTHS_ES[dt.month0() as usize],
        dt.format("%H:%M")
    )
}

/// Detail date: `05/03/2024 14:30`
pub fn full_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    dt.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_send_or_log_success() {
        let (tx, mut rx) = mpsc::channel(1);
        send_or_log(&tx, 42, "test value").await;
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn test_send_or_log_closed_channel() {
        let (tx, rx) = mpsc::channel::<i32>(1);
        drop(rx); // Close the receiver
        // Should not panic, just log
        send_or_log(&tx, 42, "test value").await;
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(
            mask_key("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.payload.sig12345"),
            "eyJhb...12345"
        );
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn test_spanish_dates() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(short_date(&dt), "05 mar 14:30");
        assert_eq!(full_date(&dt), "05/03/2024 14:30");

        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 9, 5, 0).unwrap();
        assert_eq!(short_date(&dt), "31 dic 09:05");
    }
}
