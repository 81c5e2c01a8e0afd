//! SASL credentials for `AUTH PLAIN` and `AUTH LOGIN`.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::client::Extensions;

/// A SASL mechanism we can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    /// RFC 4616, one round trip.
    Plain,
    /// The legacy username/password challenge exchange.
    Login,
}

impl Mechanism {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Username and password for SMTP authentication.
///
/// `Debug` never shows the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,

    /// Authorization identity for PLAIN. Usually empty.
    #[serde(default)]
    identity: Option<String>,

    /// Force a mechanism instead of picking one from the server's list.
    #[serde(default)]
    mechanism: Option<Mechanism>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("identity", &self.identity)
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            identity: None,
            mechanism: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    #[must_use]
    pub const fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.mechanism = Some(mechanism);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Pick the mechanism to use against a server.
    ///
    /// A configured mechanism is used only if the server offers it;
    /// otherwise PLAIN is preferred over LOGIN.
    #[must_use]
    pub fn choose_mechanism(&self, extensions: &Extensions) -> Option<Mechanism> {
        match self.mechanism {
            Some(mechanism) => extensions.supports_auth(mechanism.name()).then_some(mechanism),
            None => [Mechanism::Plain, Mechanism::Login]
                .into_iter()
                .find(|mechanism| extensions.supports_auth(mechanism.name())),
        }
    }

    /// The PLAIN initial response: `base64(identity NUL username NUL password)`.
    pub(crate) fn plain_response(&self) -> String {
        let identity = self.identity.as_deref().unwrap_or_default();
        STANDARD.encode(format!("{identity}\0{}\0{}", self.username, self.password))
    }

    pub(crate) fn login_username(&self) -> String {
        STANDARD.encode(&self.username)
    }

    pub(crate) fn login_password(&self) -> String {
        STANDARD.encode(&self.password)
    }
}
