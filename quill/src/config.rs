//! The RON configuration file.
//!
//! ```ron
//! (
//!     server: (host: "smtp.example.com", port: Some(587)),
//!     transport: opportunistic,
//!     tls: (min_version: tls12),
//!     credentials: Some((username: "me@example.com", password: "secret")),
//!     from: "me@example.com",
//!     from_name: Some("Me"),
//! )
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use quill_common::config::{TlsSettings, TransportKind};
use quill_smtp::{Credentials, Transport};

use crate::{Email, error::ConfigError};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "QUILL_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub host: String,

    /// Defaults to the conventional port of the transport.
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub server: Server,

    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default)]
    pub tls: TlsSettings,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    /// Sender address, used for the `From` header and `MAIL FROM`.
    pub from: String,

    #[serde(default)]
    pub from_name: Option<String>,

    /// Name announced in EHLO.
    ///
    /// Default: `localhost`
    #[serde(default = "default_local_name")]
    pub local_name: String,

    /// Limit on a whole send, connection included.
    ///
    /// Default: `30`
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_local_name() -> String {
    String::from("localhost")
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// If `content` is not a valid configuration.
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_ron(&content)
    }

    /// The port to connect to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or_else(|| self.transport.default_port())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        Transport::from_kind(
            self.transport,
            self.server.host.clone(),
            self.port(),
            self.tls.clone(),
        )
    }

    /// A blank email with the sender, transport and credentials filled in.
    #[must_use]
    pub fn email(&self) -> Email {
        let mut email = Email::new(self.transport())
            .credentials(self.credentials.clone())
            .local_name(&self.local_name);

        let message = email.message_mut();
        message.set_from(&self.from);
        if let Some(name) = &self.from_name {
            message.set_from_name(name);
        }

        email
    }
}

/// Find the configuration file using the following precedence:
/// 1. `QUILL_CONFIG` environment variable
/// 2. ./quill.config.ron (current working directory)
/// 3. /etc/quill/quill.config.ron (system-wide config)
///
/// # Errors
///
/// If `QUILL_CONFIG` names a missing file, or no candidate exists.
pub fn find_config_file() -> Result<PathBuf, ConfigError> {
    let default_paths = [
        PathBuf::from("./quill.config.ron"),
        PathBuf::from("/etc/quill/quill.config.ron"),
    ];

    locate(std::env::var_os(CONFIG_ENV).map(PathBuf::from), &default_paths)
}

fn locate(from_env: Option<PathBuf>, default_paths: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    if let Some(path) = from_env {
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::MissingOverride(path));
    }

    if let Some(path) = default_paths.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::NotFound { tried })
}
