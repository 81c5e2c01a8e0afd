//! Compose an email and submit it over SMTP.
//!
//! ```no_run
//! use quill::Email;
//! use quill_common::config::TlsSettings;
//! use quill_smtp::{Credentials, Transport};
//!
//! # async fn example() -> quill::Result<()> {
//! let mut email = Email::new(Transport::opportunistic("smtp.example.com", 587, TlsSettings::new()))
//!     .credentials(Some(Credentials::new("me@example.com", "secret")));
//!
//! email
//!     .message_mut()
//!     .set_from("me@example.com")
//!     .set_to(["you@example.com"])
//!     .set_subject("Hello");
//! email.message_mut().plain_mut().set("Hi there");
//!
//! email.send().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;

use std::fmt;

pub use error::{ConfigError, Error, Result};
pub use quill_mime::{ContentIdPolicy, Message};
pub use quill_smtp::{Credentials, Mechanism, Transport};

use quill_smtp::Envelope;

/// A message together with how and as whom to submit it.
pub struct Email {
    message: Message,
    transport: Transport,
    credentials: Option<Credentials>,
    local_name: String,
}

impl Email {
    /// An empty message that will be sent through `transport`.
    pub fn new(transport: Transport) -> Self {
        Self {
            message: Message::new(),
            transport,
            credentials: None,
            local_name: String::from("localhost"),
        }
    }

    /// Authenticate with these credentials. `None` never attempts AUTH.
    #[must_use]
    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Name announced in EHLO.
    #[must_use]
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    pub const fn message(&self) -> &Message {
        &self.message
    }

    pub const fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Serialize the message without sending it.
    ///
    /// Attachment readers are consumed, and the `Date` header is refreshed.
    ///
    /// # Errors
    ///
    /// If an attachment cannot be read or a boundary cannot be generated.
    pub fn mime_buf(&mut self) -> Result<Vec<u8>> {
        Ok(quill_mime::build(&mut self.message)?)
    }

    /// The SMTP envelope: the sender and every To, Cc and Bcc address, in
    /// that order.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.message.envelope_sender())
            .recipients(self.message.envelope_recipients())
            .local_name(self.local_name.clone())
            .credentials(self.credentials.clone())
    }

    /// Build the message and submit it.
    ///
    /// Nothing is sent if building fails.
    ///
    /// # Errors
    ///
    /// [`Error::Build`] if the message cannot be serialized, [`Error::Send`]
    /// if the SMTP session fails.
    pub async fn send(&mut self) -> Result<()> {
        let content = self.mime_buf()?;
        let envelope = self.envelope();

        self.transport.send(&envelope, &content).await?;
        Ok(())
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, transport: {:?} {}:{}, auth set: {}",
            self.message,
            self.transport.kind(),
            self.transport.host(),
            self.transport.port(),
            self.credentials.is_some()
        )
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
