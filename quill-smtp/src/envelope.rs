//! SMTP envelope: who the message is from and to, independent of headers.

use std::fmt;

use crate::{
    auth::Credentials,
    client::{ClientError, Result},
};

/// Reverse path, forward paths and the session parameters of one send.
#[derive(Clone)]
pub struct Envelope {
    sender: String,
    recipients: Vec<String>,
    local_name: String,
    credentials: Option<Credentials>,
}

impl Envelope {
    /// An envelope with no recipients, greeting the server as `localhost`.
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipients: Vec::new(),
            local_name: String::from("localhost"),
            credentials: None,
        }
    }

    /// Append recipients. They are addressed in the order given.
    #[must_use]
    pub fn recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients
            .extend(recipients.into_iter().map(Into::into));
        self
    }

    /// Name announced in EHLO/HELO.
    #[must_use]
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    /// Authenticate with these credentials before MAIL FROM.
    #[must_use]
    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    #[must_use]
    pub fn recipient_list(&self) -> &[String] {
        &self.recipients
    }

    #[must_use]
    pub fn hello_name(&self) -> &str {
        &self.local_name
    }

    #[must_use]
    pub const fn auth(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Check the envelope can be put on the wire.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidAddress`] if any address or the local name
    /// contains CR or LF, [`ClientError::NoRecipients`] if there is nobody
    /// to deliver to.
    pub fn validate(&self) -> Result<()> {
        let has_line_break = |value: &str| value.contains(['\r', '\n']);

        if let Some(bad) = std::iter::once(&self.sender)
            .chain(&self.recipients)
            .chain(std::iter::once(&self.local_name))
            .find(|value| has_line_break(value))
        {
            return Err(ClientError::InvalidAddress(bad.escape_debug().to_string()));
        }

        if self.recipients.is_empty() {
            return Err(ClientError::NoRecipients);
        }

        Ok(())
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .field("local_name", &self.local_name)
            .field("auth", &self.credentials.is_some())
            .finish()
    }
}
