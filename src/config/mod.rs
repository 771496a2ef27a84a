use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `backend.url`.
pub const ENV_BACKEND_URL: &str = "SUPABASE_URL";
/// Environment variable overriding `backend.anon_key`.
pub const ENV_BACKEND_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyzcompany.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Public (anon) API key
    #[serde(default)]
    pub anon_key: String,
}

impl BackendConfig {
    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoginConfig {
    /// Pre-filled operator e-mail on the login screen
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "ambiente=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.url = url.trim().to_string();
        }
        if let Some(key) = lookup(ENV_BACKEND_KEY).filter(|v| !v.trim().is_empty()) {
            self.backend.anon_key = key.trim().to_string();
        }
    }

    /// The application cannot talk to the backend without both values.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.backend.base_url().is_empty() {
            missing.push(format!("backend.url ({})", ENV_BACKEND_URL));
        }
        if self.backend.anon_key.trim().is_empty() {
            missing.push(format!("backend.anon_key ({})", ENV_BACKEND_KEY));
        }
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing backend configuration: {}. Run `ambiente --init` or set the environment variables.",
                missing.join(", ")
            );
        }
        if !self.backend.base_url().starts_with("http://")
            && !self.backend.base_url().starts_with("https://")
        {
            anyhow::bail!(
                "backend.url must start with http:// or https:// (got '{}')",
                self.backend.url
            );
        }
        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("ar", "ambiente", "ambiente")
        .context("Could not determine config directory")
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Directory for the persisted session and the log file.
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from `path` (or the default location), then apply environment
/// overrides and validate.
///
/// A missing default config file is fine as long as the environment supplies
/// the backend settings; an explicitly given path must exist.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path()?, false),
    };

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Config::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?
    } else if explicit {
        anyhow::bail!("Config file not found at {}", path.display());
    } else {
        tracing::debug!("No config file at {}, using environment only", path.display());
        Config::default()
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

pub async fn init_wizard() -> Result<()> {
    use std::io::{self, Write};

    println!("Ambiente Configuration Wizard");
    println!("=============================\n");

    let config_path = default_config_path()?;
    if config_path.exists() {
        print!("Config already exists at {}. Overwrite? [y/N] ", config_path.display());
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    print!("Backend URL (https://<project>.supabase.co): ");
    io::stdout().flush()?;
    let mut url = String::new();
    io::stdin().read_line(&mut url)?;

    print!("Public anon key: ");
    io::stdout().flush()?;
    let mut anon_key = String::new();
    io::stdin().read_line(&mut anon_key)?;

    print!("Operator e-mail (optional, press Enter to skip): ");
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;

    let config = Config {
        backend: BackendConfig {
            url: url.trim().to_string(),
            anon_key: anon_key.trim().to_string(),
        },
        polling: PollingConfig::default(),
        login: LoginConfig {
            email: if email.trim().is_empty() {
                None
            } else {
                Some(email.trim().to_string())
            },
        },
        logging: LoggingConfig::default(),
    };
    config.validate()?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // The anon key is public but the file also names the operator
    let content = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))?;
    }

    println!("\nConfig saved to {}", config_path.display());
    println!("Run `ambiente` to start the dashboard.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [backend]
            url = "https://demo.supabase.co/"
            anon_key = "public-key"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url(), "https://demo.supabase.co");
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.logging.filter, "ambiente=info");
        assert!(config.login.email.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_toml_str(
            r#"
            [backend]
            url = "https://file.supabase.co"
            anon_key = "file-key"
            "#,
        )
        .unwrap();
        config.apply_env(env(&[
            (ENV_BACKEND_URL, "https://env.supabase.co"),
            (ENV_BACKEND_KEY, "  env-key  "),
        ]));
        assert_eq!(config.backend.url, "https://env.supabase.co");
        assert_eq!(config.backend.anon_key, "env-key");
    }

    #[test]
    fn test_blank_env_does_not_override() {
        let mut config = Config::default();
        config.backend.url = "https://file.supabase.co".into();
        config.apply_env(env(&[(ENV_BACKEND_URL, "  ")]));
        assert_eq!(config.backend.url, "https://file.supabase.co");
    }

    #[test]
    fn test_missing_backend_settings_is_fatal() {
        let err = Config::default().validate().unwrap_err().to_string();
        assert!(err.contains("backend.url"));
        assert!(err.contains("backend.anon_key"));
    }

    #[test]
    fn test_url_scheme_is_checked() {
        let mut config = Config::default();
        config.backend.url = "demo.supabase.co".into();
        config.backend.anon_key = "k".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let polling = PollingConfig { interval_secs: 0 };
        assert_eq!(polling.interval(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load(Some(&missing)).is_err());
    }
}
