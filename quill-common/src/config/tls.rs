//! TLS settings for outbound SMTP connections.
//!
//! These are plain data. The SMTP crate turns them into a fresh rustls
//! client configuration for every connection, so one settings value can be
//! shared between any number of concurrent sends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lowest TLS protocol version a connection may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsVersion {
    /// Accept TLS 1.2 and TLS 1.3.
    #[default]
    Tls12,

    /// Accept TLS 1.3 only.
    Tls13,
}

/// Where trusted root certificates come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustRoots {
    /// The platform's native certificate store.
    #[default]
    Native,

    /// PEM encoded certificates read from a file.
    PemFile(PathBuf),

    /// DER encoded certificates.
    Der(Vec<Vec<u8>>),
}

/// TLS settings for a single transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TlsSettings {
    /// Name the server certificate must be valid for.
    ///
    /// Defaults to the host being connected to.
    pub server_name: Option<String>,

    /// Minimum accepted protocol version.
    ///
    /// Default: `Tls12`
    pub min_version: TlsVersion,

    /// Trust anchors used to validate the server certificate.
    ///
    /// Default: `Native`
    pub roots: TrustRoots,

    /// Whether to accept invalid TLS certificates (self-signed, expired, etc.).
    ///
    /// **SECURITY WARNING**: Setting this to `true` disables certificate validation
    /// and makes the connection vulnerable to man-in-the-middle attacks.
    ///
    /// Default: `false`
    pub accept_invalid_certs: bool,
}

impl TlsSettings {
    /// Settings that validate against the native roots with TLS 1.2 or newer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            server_name: None,
            min_version: TlsVersion::Tls12,
            roots: TrustRoots::Native,
            accept_invalid_certs: false,
        }
    }

    /// Settings trusting only the given DER certificates.
    #[must_use]
    pub const fn with_der_roots(roots: Vec<Vec<u8>>) -> Self {
        Self {
            server_name: None,
            min_version: TlsVersion::Tls12,
            roots: TrustRoots::Der(roots),
            accept_invalid_certs: false,
        }
    }

    /// Settings for testing against servers with self-signed certificates.
    ///
    /// **WARNING**: Only use in test environments. Do not use in production.
    #[must_use]
    pub const fn insecure() -> Self {
        Self {
            server_name: None,
            min_version: TlsVersion::Tls12,
            roots: TrustRoots::Native,
            accept_invalid_certs: true,
        }
    }

    /// Override the name the certificate is validated against.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Require a minimum protocol version.
    #[must_use]
    pub const fn min_version(mut self, version: TlsVersion) -> Self {
        self.min_version = version;
        self
    }

    /// The name to validate the certificate against when connecting to `host`.
    #[must_use]
    pub fn server_name_for<'a>(&'a self, host: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(host)
    }

    /// Returns `true` if invalid certificates should be accepted.
    #[must_use]
    pub const fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }
}
