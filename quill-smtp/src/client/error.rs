//! Error types for the SMTP client.

use std::{fmt, io};

use thiserror::Error;

use super::response::Response;

/// The protocol step a server reply belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Greeting,
    Ehlo,
    StartTls,
    Auth,
    MailFrom,
    /// `RCPT TO` for the given recipient.
    RcptTo(String),
    Data,
    /// The reply to the terminating `.` after the message content.
    DataEnd,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greeting => f.write_str("Greeting"),
            Self::Ehlo => f.write_str("EHLO"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Auth => f.write_str("AUTH"),
            Self::MailFrom => f.write_str("MAIL FROM"),
            Self::RcptTo(recipient) => write!(f, "RCPT TO:<{recipient}>"),
            Self::Data => f.write_str("DATA"),
            Self::DataEnd => f.write_str("End of DATA"),
        }
    }
}

/// Errors that can occur when talking to an SMTP server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse an SMTP response from the server.
    #[error("Failed to parse SMTP response: {0}")]
    ParseError(String),

    /// The server answered a step with a reply that does not let the session continue.
    ///
    /// The reply is kept exactly as the server sent it.
    #[error("{stage} rejected: {response}")]
    Rejected { stage: Stage, response: Response },

    /// TLS configuration, handshake or certificate validation failed.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Credentials are configured but the server offers no mechanism we support.
    #[error("Server does not offer a supported AUTH mechanism")]
    AuthUnsupported,

    /// Credentials would have been sent in clear text to a remote host.
    #[error("Refusing to authenticate over an unencrypted connection to {0}")]
    InsecureAuth(String),

    /// An envelope address or the EHLO name contains a line break.
    #[error("Invalid envelope address: {0:?}")]
    InvalidAddress(String),

    /// The envelope has no recipients.
    #[error("No recipients")]
    NoRecipients,

    /// Connection was closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

impl ClientError {
    /// The server reply behind this error, if there is one.
    #[must_use]
    pub const fn response(&self) -> Option<&Response> {
        match self {
            Self::Rejected { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns `true` if the server rejected a step with a 5xx reply.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.response().is_some_and(Response::is_permanent_error)
    }

    /// Returns `true` if the server rejected a step with a 4xx reply.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.response().is_some_and(Response::is_temporary_error)
    }

    /// Returns `true` if the server refused the credentials.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                stage: Stage::Auth,
                ..
            }
        )
    }

    /// Returns `true` if the server refused a recipient.
    #[must_use]
    pub const fn is_recipient_rejection(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                stage: Stage::RcptTo(_),
                ..
            }
        )
    }
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
