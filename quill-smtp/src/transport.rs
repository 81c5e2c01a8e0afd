//! The three ways of getting a message to a submission server.
//!
//! Every strategy runs the same conversation:
//!
//! ```text
//! greeting -> EHLO -> [STARTTLS -> EHLO] -> [AUTH] -> MAIL FROM
//!          -> RCPT TO (each) -> DATA -> message -> QUIT
//! ```
//!
//! and differs only in how the channel is secured. Any rejected step ends
//! the session with a best effort QUIT. Nothing is retried.

use std::net::IpAddr;

use quill_common::{
    config::{TlsSettings, TransportKind},
    tracing,
};

use crate::{
    client::{ClientError, Extensions, Response, Result, SmtpClient, Stage},
    envelope::Envelope,
};

/// Where and how to submit a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Plain TCP, upgraded with STARTTLS when the server advertises it.
    Opportunistic {
        host: String,
        port: u16,
        tls: TlsSettings,
    },

    /// Plain TCP for the whole session. STARTTLS is never attempted.
    Plaintext { host: String, port: u16 },

    /// TLS from the first byte.
    ExplicitTls {
        host: String,
        port: u16,
        tls: TlsSettings,
    },
}

impl Transport {
    pub fn opportunistic(host: impl Into<String>, port: u16, tls: TlsSettings) -> Self {
        Self::Opportunistic {
            host: host.into(),
            port,
            tls,
        }
    }

    pub fn plaintext(host: impl Into<String>, port: u16) -> Self {
        Self::Plaintext {
            host: host.into(),
            port,
        }
    }

    pub fn explicit_tls(host: impl Into<String>, port: u16, tls: TlsSettings) -> Self {
        Self::ExplicitTls {
            host: host.into(),
            port,
            tls,
        }
    }

    /// Build the strategy named by `kind`. `tls` is ignored for plaintext.
    pub fn from_kind(
        kind: TransportKind,
        host: impl Into<String>,
        port: u16,
        tls: TlsSettings,
    ) -> Self {
        match kind {
            TransportKind::Opportunistic => Self::opportunistic(host, port, tls),
            TransportKind::Plaintext => Self::plaintext(host, port),
            TransportKind::ExplicitTls => Self::explicit_tls(host, port, tls),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Opportunistic { .. } => TransportKind::Opportunistic,
            Self::Plaintext { .. } => TransportKind::Plaintext,
            Self::ExplicitTls { .. } => TransportKind::ExplicitTls,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            Self::Opportunistic { host, .. }
            | Self::Plaintext { host, .. }
            | Self::ExplicitTls { host, .. } => host,
        }
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        match self {
            Self::Opportunistic { port, .. }
            | Self::Plaintext { port, .. }
            | Self::ExplicitTls { port, .. } => *port,
        }
    }

    #[must_use]
    pub const fn tls(&self) -> Option<&TlsSettings> {
        match self {
            Self::Opportunistic { tls, .. } | Self::ExplicitTls { tls, .. } => Some(tls),
            Self::Plaintext { .. } => None,
        }
    }

    const fn starttls(&self) -> Option<&TlsSettings> {
        match self {
            Self::Opportunistic { tls, .. } => Some(tls),
            Self::Plaintext { .. } | Self::ExplicitTls { .. } => None,
        }
    }

    /// Submit `message` to every recipient of `envelope`.
    ///
    /// One connection is opened and closed per call.
    ///
    /// # Errors
    ///
    /// Fails on an invalid envelope, a network or TLS failure, or the first
    /// step the server rejects. The server's reply is kept in the error.
    #[tracing::instrument(
        skip_all,
        fields(kind = ?self.kind(), host = %self.host(), port = self.port())
    )]
    pub async fn send(&self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        match self.deliver(envelope, message).await {
            Ok(()) => {
                tracing::debug!(
                    recipients = envelope.recipient_list().len(),
                    bytes = message.len(),
                    "Message accepted"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Message not sent");
                Err(e)
            }
        }
    }

    async fn deliver(&self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        envelope.validate()?;

        let mut client = match self {
            Self::ExplicitTls { host, port, tls } => {
                SmtpClient::connect_tls(host, *port, tls).await?
            }
            Self::Opportunistic { host, port, .. } | Self::Plaintext { host, port } => {
                SmtpClient::connect(host, *port).await?
            }
        };

        if let Err(e) = self.session(&mut client, envelope, message).await {
            client.quit_quietly().await;
            return Err(e);
        }

        // The message is already accepted; a failed QUIT changes nothing.
        if let Err(e) = client.quit().await {
            tracing::debug!(error = %e, "QUIT failed after delivery");
        }

        Ok(())
    }

    async fn session(
        &self,
        client: &mut SmtpClient,
        envelope: &Envelope,
        message: &[u8],
    ) -> Result<()> {
        let greeting = client.read_greeting().await?;
        check(Stage::Greeting, greeting, |r| r.code == 220)?;

        let mut extensions = hello(client, envelope.hello_name()).await?;

        if let Some(tls) = self.starttls().filter(|_| extensions.supports_starttls()) {
            let response = client.starttls(tls).await?;
            check(Stage::StartTls, response, |r| r.code == 220)?;

            extensions = hello(client, envelope.hello_name()).await?;
        }

        if let Some(credentials) = envelope.auth() {
            let mechanism = credentials
                .choose_mechanism(&extensions)
                .ok_or(ClientError::AuthUnsupported)?;

            if !client.is_encrypted() && !is_loopback(client.host()) {
                return Err(ClientError::InsecureAuth(client.host().to_string()));
            }

            let response = client.authenticate(credentials, mechanism).await?;
            check(Stage::Auth, response, Response::is_success)?;
        }

        let response = client.mail_from(envelope.sender()).await?;
        check(Stage::MailFrom, response, Response::is_success)?;

        for recipient in envelope.recipient_list() {
            let response = client.rcpt_to(recipient).await?;
            check(Stage::RcptTo(recipient.clone()), response, Response::is_success)?;
        }

        let response = client.data().await?;
        check(Stage::Data, response, |r| r.code == 354)?;

        let response = client.send_data(message).await?;
        check(Stage::DataEnd, response, |r| r.code == 250)?;

        Ok(())
    }
}

/// EHLO, falling back to HELO (and no extensions) when EHLO is refused
/// outright.
async fn hello(client: &mut SmtpClient, name: &str) -> Result<Extensions> {
    let response = client.ehlo(name).await?;
    if response.is_success() {
        return Ok(Extensions::from_ehlo(&response));
    }

    if !response.is_permanent_error() {
        return Err(ClientError::Rejected {
            stage: Stage::Ehlo,
            response,
        });
    }

    tracing::debug!(code = response.code, "EHLO refused, falling back to HELO");
    let response = client.helo(name).await?;
    check(Stage::Ehlo, response, Response::is_success)?;

    Ok(Extensions::default())
}

fn check(stage: Stage, response: Response, accepted: impl FnOnce(&Response) -> bool) -> Result<Response> {
    if accepted(&response) {
        Ok(response)
    } else {
        Err(ClientError::Rejected { stage, response })
    }
}

/// Whether `host` names this machine.
fn is_loopback(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');

    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
