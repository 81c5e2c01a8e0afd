use serde::{Deserialize, Serialize};

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Connect in plaintext and upgrade with STARTTLS when the server offers it.
    #[default]
    Opportunistic,

    /// Connect in plaintext and never attempt STARTTLS.
    ///
    /// **WARNING**: Only for servers without working STARTTLS.
    Plaintext,

    /// Negotiate TLS before the first SMTP byte (SMTPS, usually port 465).
    ExplicitTls,
}

impl TransportKind {
    /// The conventional port for this kind of transport.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Opportunistic | Self::Plaintext => 587,
            Self::ExplicitTls => 465,
        }
    }
}
