use serde::{Deserialize, Serialize};

use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_EBOOK_PATH: &str = "MoneyTalks.pdf";
pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sender: Option<String>,
    pub sender_password: Option<String>,
    pub smtp_relay: String,
    pub smtp_port: u16,
    /// Implicit TLS on connect. `false` is honoured for loopback relays only.
    pub smtp_tls: bool,
    pub ebook_path: PathBuf,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sender: None,
            sender_password: None,
            smtp_relay: DEFAULT_SMTP_RELAY.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_tls: true,
            ebook_path: PathBuf::from(DEFAULT_EBOOK_PATH),
            port: DEFAULT_PORT,
        }
    }
}

/// Sender address and password used both as `From` and as SMTP login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderCredentials {
    pub address: String,
    pub password: String,
}

impl Config {
    /// Returns `None` unless both the sender address and password are set and non-empty.
    pub fn sender_credentials(&self) -> Option<SenderCredentials> {
        let address = self.sender.as_deref().filter(|s| !s.is_empty())?;
        let password = self.sender_password.as_deref().filter(|s| !s.is_empty())?;

        Some(SenderCredentials {
            address: address.to_string(),
            password: password.to_string(),
        })
    }

    /// Name the attachment carries in the outgoing message.
    pub fn ebook_filename(&self) -> String {
        self.ebook_path.file_name().map_or_else(
            || self.ebook_path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    fn apply_env<F>(mut self, lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(sender) = lookup("SENDER_EMAIL") {
            self.sender = Some(sender);
        }
        if let Some(password) = lookup("SENDER_PASSWORD") {
            self.sender_password = Some(password);
        }
        if let Some(relay) = lookup("SMTP_RELAY") {
            self.smtp_relay = relay;
        }
        if let Some(port) = lookup("SMTP_PORT") {
            self.smtp_port = port
                .parse::<u16>()
                .map_err(|e| format!("Failed to parse SMTP_PORT: {e}"))?;
        }
        if let Some(tls) = lookup("SMTP_TLS") {
            self.smtp_tls = tls
                .parse::<bool>()
                .map_err(|e| format!("Failed to parse SMTP_TLS: {e}"))?;
        }
        if let Some(path) = lookup("EBOOK_PATH") {
            self.ebook_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse::<u16>()
                .map_err(|e| format!("Failed to parse PORT: {e}"))?;
        }

        Ok(self)
    }
}

fn load_file(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(Into::into)
}

/// Builds the process configuration: defaults, then an optional YAML file,
/// then environment variables (including those sourced from `.env`).
///
/// Missing sender values are not an error here; requests fail instead.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!("Loaded environment from '{}'", path.display());
    }

    // Retrieve env variable
    let config_path =
        env::var("EBOOK_SERVICE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    let base = if Path::new(&config_path).exists() {
        tracing::info!("Loading config file '{}'", config_path);
        load_file(Path::new(&config_path))?
    } else if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        load_file(Path::new("config.yaml"))?
    } else {
        tracing::info!("No config file found, using defaults and environment variables");
        Config::default()
    };

    base.apply_env(|key| env::var(key).ok())
}
