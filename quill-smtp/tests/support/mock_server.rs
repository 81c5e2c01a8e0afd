//! Scripted SMTP server for exercising the transports.
//!
//! The server can:
#![allow(dead_code)] // Not every test uses every knob
//! - Reply with configurable codes at every stage, per recipient for RCPT
//! - Advertise and perform STARTTLS, or speak TLS from the first byte
//! - Walk through AUTH PLAIN and AUTH LOGIN exchanges
//! - Record every command it receives, including the raw DATA payload
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::MockSmtpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockSmtpServer::builder()
//!     .with_rcpt_to_responses(vec![(250, "OK"), (550, "User unknown")])
//!     .build()
//!     .await?;
//!
//! // Point a transport at server.addr()
//!
//! server.shutdown();
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::Write,
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        ServerConfig,
        pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
    },
};

/// SMTP command received by the mock server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    /// EHLO command with hostname
    Ehlo(String),
    /// HELO command with hostname
    Helo(String),
    /// STARTTLS command
    StartTls,
    /// AUTH command with its arguments, e.g. `PLAIN dXNlcg==`
    Auth(String),
    /// A line sent in answer to an AUTH LOGIN challenge
    AuthResponse(String),
    /// MAIL FROM reverse path
    MailFrom(String),
    /// RCPT TO forward path
    RcptTo(String),
    /// DATA command
    Data,
    /// Message bytes as they crossed the wire, without the final `.\r\n`
    MessageContent(Vec<u8>),
    /// QUIT command
    Quit,
    /// Unknown/other command
    Other(String),
}

/// Response configuration for SMTP commands
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    /// SMTP status code (e.g., 250, 550)
    pub code: u16,
    /// Response message
    pub message: String,
}

impl SmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct EhloResponse {
    code: u16,
    capabilities: Vec<String>,
}

impl EhloResponse {
    fn to_bytes(&self, starttls: bool) -> Vec<u8> {
        let mut lines = vec![String::from("mock.example.com")];
        lines.extend(self.capabilities.iter().cloned());
        if starttls {
            lines.push(String::from("STARTTLS"));
        }

        let mut response = String::new();
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            let separator = if i < last { '-' } else { ' ' };
            let _ = write!(&mut response, "{}{separator}{line}\r\n", self.code);
        }

        response.into_bytes()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TlsMode {
    None,
    StartTls,
    Implicit,
}

/// Mock SMTP server configuration
#[derive(Clone)]
struct MockServerConfig {
    greeting: SmtpResponse,
    ehlo_response: EhloResponse,
    helo_response: SmtpResponse,
    starttls_response: SmtpResponse,
    auth_response: SmtpResponse,
    mail_from_response: SmtpResponse,
    rcpt_to_response: SmtpResponse,
    rcpt_to_responses: Vec<SmtpResponse>,
    data_response: SmtpResponse,
    data_end_response: SmtpResponse,
    quit_response: SmtpResponse,
    tls_mode: TlsMode,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: SmtpResponse::new(220, "Mock SMTP Server"),
            ehlo_response: EhloResponse {
                code: 250,
                capabilities: vec!["SIZE 10000".to_string()],
            },
            helo_response: SmtpResponse::new(250, "Hello"),
            starttls_response: SmtpResponse::new(220, "Ready to start TLS"),
            auth_response: SmtpResponse::new(235, "Authentication successful"),
            mail_from_response: SmtpResponse::new(250, "OK"),
            rcpt_to_response: SmtpResponse::new(250, "OK"),
            rcpt_to_responses: Vec::new(),
            data_response: SmtpResponse::new(354, "Start mail input; end with <CRLF>.<CRLF>"),
            data_end_response: SmtpResponse::new(250, "OK: Message accepted"),
            quit_response: SmtpResponse::new(221, "Bye"),
            tls_mode: TlsMode::None,
        }
    }
}

/// State shared between the listener task and the test.
struct Shared {
    config: MockServerConfig,
    acceptor: Option<TlsAcceptor>,
    commands: RwLock<Vec<SmtpCommand>>,
    tls_sessions: AtomicUsize,
}

/// What a session loop ended with.
enum Next {
    Closed,
    StartTls,
}

/// Mock SMTP server for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    certificate: Option<Vec<u8>>,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
}

impl MockSmtpServer {
    /// Create a new builder for configuring the mock server
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    /// Get the address the server is listening on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// DER of the self-signed certificate, when TLS is enabled
    #[must_use]
    pub fn certificate_der(&self) -> Option<Vec<u8>> {
        self.certificate.clone()
    }

    /// Get all commands received by the server
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.shared.commands.read().await.clone()
    }

    /// Number of completed TLS handshakes
    #[must_use]
    pub fn tls_sessions(&self) -> usize {
        self.shared.tls_sessions.load(Ordering::Relaxed)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn handle_client(stream: TcpStream, shared: Arc<Shared>) -> io::Result<()> {
        let acceptor = shared.acceptor.clone();
        let mut rcpt_index = 0;

        if shared.config.tls_mode == TlsMode::Implicit {
            let acceptor = acceptor.ok_or_else(|| io::Error::other("no TLS acceptor"))?;
            let stream = acceptor.accept(stream).await?;
            shared.tls_sessions.fetch_add(1, Ordering::Relaxed);

            let mut stream = BufReader::new(stream);
            Self::serve(&mut stream, &shared, &mut rcpt_index, true, true).await?;
            return Ok(());
        }

        let mut plain = BufReader::new(stream);
        match Self::serve(&mut plain, &shared, &mut rcpt_index, true, false).await? {
            Next::Closed => Ok(()),
            Next::StartTls => {
                let acceptor = acceptor.ok_or_else(|| io::Error::other("no TLS acceptor"))?;
                let stream = acceptor.accept(plain.into_inner()).await?;
                shared.tls_sessions.fetch_add(1, Ordering::Relaxed);

                let mut stream = BufReader::new(stream);
                Self::serve(&mut stream, &shared, &mut rcpt_index, false, true).await?;
                Ok(())
            }
        }
    }

    async fn read_line<S>(stream: &mut BufReader<S>, line: &mut Vec<u8>) -> io::Result<usize>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        line.clear();
        timeout(Duration::from_secs(10), stream.read_until(b'\n', line))
            .await
            .unwrap_or(Ok(0))
    }

    async fn reply<S>(stream: &mut BufReader<S>, response: &[u8]) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(response).await?;
        stream.flush().await
    }

    async fn record(shared: &Shared, command: SmtpCommand) {
        shared.commands.write().await.push(command);
    }

    /// Run commands until the client leaves or asks for STARTTLS.
    #[allow(clippy::too_many_lines)]
    async fn serve<S>(
        stream: &mut BufReader<S>,
        shared: &Shared,
        rcpt_index: &mut usize,
        greet: bool,
        encrypted: bool,
    ) -> io::Result<Next>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let config = &shared.config;
        let mut line = Vec::new();

        if greet {
            Self::reply(stream, &config.greeting.to_bytes()).await?;
        }

        loop {
            if Self::read_line(stream, &mut line).await? == 0 {
                return Ok(Next::Closed);
            }

            let cmd_line = String::from_utf8_lossy(&line)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            tracing::debug!("Mock server received: {}", cmd_line);

            let (verb, args) = cmd_line.split_once(' ').unwrap_or((cmd_line.as_str(), ""));
            let path = || {
                args.split_once('<')
                    .and_then(|(_, rest)| rest.split_once('>'))
                    .map_or_else(|| args.to_string(), |(path, _)| path.to_string())
            };

            match verb.to_uppercase().as_str() {
                "EHLO" => {
                    Self::record(shared, SmtpCommand::Ehlo(args.to_string())).await;
                    let response = if config.ehlo_response.code == 250 {
                        config
                            .ehlo_response
                            .to_bytes(config.tls_mode == TlsMode::StartTls && !encrypted)
                    } else {
                        SmtpResponse::new(config.ehlo_response.code, "EHLO not supported")
                            .to_bytes()
                    };
                    Self::reply(stream, &response).await?;
                }
                "HELO" => {
                    Self::record(shared, SmtpCommand::Helo(args.to_string())).await;
                    Self::reply(stream, &config.helo_response.to_bytes()).await?;
                }
                "STARTTLS" => {
                    Self::record(shared, SmtpCommand::StartTls).await;
                    if config.tls_mode != TlsMode::StartTls || encrypted {
                        Self::reply(stream, &SmtpResponse::new(502, "Not available").to_bytes())
                            .await?;
                        continue;
                    }

                    Self::reply(stream, &config.starttls_response.to_bytes()).await?;
                    if config.starttls_response.code == 220 {
                        return Ok(Next::StartTls);
                    }
                }
                "AUTH" => {
                    Self::record(shared, SmtpCommand::Auth(args.to_string())).await;

                    if args.eq_ignore_ascii_case("LOGIN") {
                        for challenge in ["VXNlcm5hbWU6", "UGFzc3dvcmQ6"] {
                            Self::reply(stream, format!("334 {challenge}\r\n").as_bytes()).await?;
                            if Self::read_line(stream, &mut line).await? == 0 {
                                return Ok(Next::Closed);
                            }
                            let answer = String::from_utf8_lossy(&line).trim_end().to_string();
                            Self::record(shared, SmtpCommand::AuthResponse(answer)).await;
                        }
                    }

                    Self::reply(stream, &config.auth_response.to_bytes()).await?;
                }
                "MAIL" => {
                    Self::record(shared, SmtpCommand::MailFrom(path())).await;
                    Self::reply(stream, &config.mail_from_response.to_bytes()).await?;
                }
                "RCPT" => {
                    Self::record(shared, SmtpCommand::RcptTo(path())).await;
                    let response = config
                        .rcpt_to_responses
                        .get(*rcpt_index)
                        .unwrap_or(&config.rcpt_to_response);
                    *rcpt_index += 1;
                    Self::reply(stream, &response.to_bytes()).await?;
                }
                "DATA" => {
                    Self::record(shared, SmtpCommand::Data).await;
                    Self::reply(stream, &config.data_response.to_bytes()).await?;
                    if config.data_response.code != 354 {
                        continue;
                    }

                    let mut content = Vec::new();
                    loop {
                        if Self::read_line(stream, &mut line).await? == 0 {
                            return Ok(Next::Closed);
                        }
                        if line == b".\r\n" {
                            break;
                        }
                        content.extend_from_slice(&line);
                    }

                    Self::record(shared, SmtpCommand::MessageContent(content)).await;
                    Self::reply(stream, &config.data_end_response.to_bytes()).await?;
                }
                "QUIT" => {
                    Self::record(shared, SmtpCommand::Quit).await;
                    Self::reply(stream, &config.quit_response.to_bytes()).await?;
                    return Ok(Next::Closed);
                }
                _ => {
                    Self::record(shared, SmtpCommand::Other(cmd_line.clone())).await;
                    Self::reply(stream, &SmtpResponse::new(500, "Unknown command").to_bytes())
                        .await?;
                }
            }
        }
    }
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    /// Set the greeting message
    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = SmtpResponse::new(code, message);
        self
    }

    /// Set the EHLO reply code and the capabilities listed after the
    /// greeting line. A non-250 code produces a single line reply.
    #[must_use]
    pub fn with_ehlo_response(mut self, code: u16, capabilities: Vec<String>) -> Self {
        self.config.ehlo_response = EhloResponse { code, capabilities };
        self
    }

    /// Set the HELO response
    #[must_use]
    pub fn with_helo_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.helo_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the final AUTH response
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the MAIL FROM response
    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the RCPT TO response used for every recipient
    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = SmtpResponse::new(code, message);
        self
    }

    /// Reply to the n-th RCPT TO with the n-th entry. Recipients past the
    /// end of the list get the default RCPT TO response.
    #[must_use]
    pub fn with_rcpt_to_responses(mut self, responses: Vec<(u16, &str)>) -> Self {
        self.config.rcpt_to_responses = responses
            .into_iter()
            .map(|(code, message)| SmtpResponse::new(code, message))
            .collect();
        self
    }

    /// Set the DATA command response
    #[must_use]
    pub fn with_data_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the response after message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = SmtpResponse::new(code, message);
        self
    }

    /// Set the QUIT response
    #[must_use]
    pub fn with_quit_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.quit_response = SmtpResponse::new(code, message);
        self
    }

    /// Advertise STARTTLS and upgrade with a self-signed `localhost`
    /// certificate when asked
    #[must_use]
    pub const fn with_starttls(mut self) -> Self {
        self.config.tls_mode = TlsMode::StartTls;
        self
    }

    /// Set the STARTTLS response. Anything but 220 leaves the session in
    /// plaintext.
    #[must_use]
    pub fn with_starttls_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.starttls_response = SmtpResponse::new(code, message);
        self
    }

    /// Speak TLS from the first byte with a self-signed `localhost`
    /// certificate
    #[must_use]
    pub const fn with_implicit_tls(mut self) -> Self {
        self.config.tls_mode = TlsMode::Implicit;
        self
    }

    fn acceptor() -> Result<(TlsAcceptor, Vec<u8>), Box<dyn std::error::Error>> {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
        let der = cert.serialize_der()?;
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));

        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![CertificateDer::from(der.clone())], key)?;

        Ok((TlsAcceptor::from(Arc::new(config)), der))
    }

    /// Build and start the mock SMTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port or the
    /// certificate cannot be generated
    pub async fn build(self) -> Result<MockSmtpServer, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (acceptor, certificate) = if self.config.tls_mode == TlsMode::None {
            (None, None)
        } else {
            let (acceptor, der) = Self::acceptor()?;
            (Some(acceptor), Some(der))
        };

        let shared = Arc::new(Shared {
            config: self.config,
            acceptor,
            commands: RwLock::new(Vec::new()),
            tls_sessions: AtomicUsize::new(0),
        });
        let shutdown = Arc::new(AtomicBool::new(false));

        let shared_clone = Arc::clone(&shared);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag is checked
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    let shared = Arc::clone(&shared_clone);

                    tokio::spawn(async move {
                        if let Err(e) = MockSmtpServer::handle_client(stream, shared).await {
                            tracing::debug!("Mock server client error: {}", e);
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            certificate,
            shared,
            shutdown,
        })
    }
}
