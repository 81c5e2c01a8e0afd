//! A single SMTP client session over plain TCP, STARTTLS or implicit TLS.

use tokio::net::TcpStream;

use quill_common::{config::TlsSettings, incoming, outgoing, tracing};

use super::{
    connection::ClientConnection,
    error::{ClientError, Result},
    response::Response,
};
use crate::{
    auth::{Credentials, Mechanism},
    data::encode_data,
};

/// Initial size of the read buffer for SMTP responses.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// An SMTP client for sending commands and receiving responses.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    responses: Vec<Response>,
    host: String,
}

impl SmtpClient {
    fn with_connection(connection: ClientConnection, host: &str) -> Self {
        Self {
            connection: Some(connection),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            responses: Vec::new(),
            host: host.to_string(),
        }
    }

    /// Opens a plain TCP connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        tracing::debug!(host, port, "Connected");

        Ok(Self::with_connection(ClientConnection::Plain(stream), host))
    }

    /// Opens a TCP connection and completes a TLS handshake before any SMTP
    /// traffic is exchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the handshake fails.
    pub async fn connect_tls(host: &str, port: u16, tls: &TlsSettings) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        tracing::debug!(host, port, "Connected, starting TLS");

        let connection = ClientConnection::tls(stream, tls, host).await?;
        Ok(Self::with_connection(connection, host))
    }

    /// Whether the session is currently running over TLS.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(ClientConnection::is_encrypted)
    }

    /// The host this client connected to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Reads the initial server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the greeting is malformed.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await
    }

    /// Sends a command to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        outgoing!("{}", command);
        self.write_line(command).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{line}\r\n");
        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(data.as_bytes())
            .await
    }

    /// Sends a raw command and reads the response.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.send_command(command).await?;
        self.read_response().await
    }

    /// Sends a line carrying secrets, logging `redacted` in its place.
    async fn secret_command(&mut self, line: &str, redacted: &str) -> Result<Response> {
        outgoing!("{}", redacted);
        self.write_line(line).await?;
        self.read_response().await
    }

    /// Sends EHLO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("EHLO {domain}")).await
    }

    /// Sends HELO with the specified domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn helo(&mut self, domain: &str) -> Result<Response> {
        self.command(&format!("HELO {domain}")).await
    }

    /// Sends MAIL FROM command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// Sends RCPT TO command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Sends the message with dot-stuffing and the end-of-data marker, then
    /// reads the server's verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn send_data(&mut self, message: &[u8]) -> Result<Response> {
        let framed = encode_data(message);
        outgoing!("<{} bytes of message data>", framed.len());

        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(&framed)
            .await?;

        self.read_response().await
    }

    /// Sends QUIT command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    /// Best effort QUIT used when a session is abandoned. Failures are only
    /// logged.
    pub async fn quit_quietly(&mut self) {
        if let Err(e) = self.quit().await {
            tracing::debug!(error = %e, "QUIT failed while abandoning session");
        }
    }

    /// Sends STARTTLS and, on a 220 reply, upgrades the connection to TLS.
    ///
    /// Any other reply is returned as-is with the connection untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the command or the TLS handshake fails.
    pub async fn starttls(&mut self, tls: &TlsSettings) -> Result<Response> {
        let response = self.command("STARTTLS").await?;

        if response.code == 220 {
            let connection = self.connection.take().ok_or(ClientError::ConnectionClosed)?;
            self.connection = Some(connection.upgrade(tls, &self.host).await?);

            // Nothing sent before the handshake may be trusted afterwards.
            self.buffer_pos = 0;
        }

        Ok(response)
    }

    /// Authenticates with `mechanism`, returning the final server reply.
    ///
    /// For LOGIN an unexpected reply to either challenge ends the exchange
    /// early and is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn authenticate(
        &mut self,
        credentials: &Credentials,
        mechanism: Mechanism,
    ) -> Result<Response> {
        match mechanism {
            Mechanism::Plain => {
                let line = format!("AUTH PLAIN {}", credentials.plain_response());
                self.secret_command(&line, "AUTH PLAIN [redacted]").await
            }
            Mechanism::Login => {
                let response = self.command("AUTH LOGIN").await?;
                if response.code != 334 {
                    return Ok(response);
                }

                let response = self
                    .secret_command(&credentials.login_username(), "[redacted]")
                    .await?;
                if response.code != 334 {
                    return Ok(response);
                }

                self.secret_command(&credentials.login_password(), "[redacted]")
                    .await
            }
        }
    }

    /// Returns all responses received so far.
    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Returns the last response received, if any.
    #[must_use]
    pub fn last_response(&self) -> Option<&Response> {
        self.responses.last()
    }

    /// Reads a complete SMTP response from the server.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                incoming!("{}", response);
                self.responses.push(response.clone());

                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::ParseError(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.buffer_pos..]).await?;
            self.buffer_pos += n;
        }
    }
}
