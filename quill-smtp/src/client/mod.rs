//! SMTP client session.
//!
//! [`SmtpClient`] speaks one command at a time and hands every reply back
//! to the caller; deciding whether a reply is acceptable is left to the
//! transport driving it. It supports:
//!
//! - Plain TCP and implicit TLS connections
//! - STARTTLS upgrade
//! - AUTH PLAIN and AUTH LOGIN
//! - Dot-stuffed DATA transfer
//!
//! # Examples
//!
//! ```no_run
//! use quill_smtp::client::SmtpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SmtpClient::connect("localhost", 2525).await?;
//! client.read_greeting().await?;
//! client.ehlo("client.example.com").await?;
//! client.mail_from("sender@example.com").await?;
//! client.rcpt_to("recipient@example.com").await?;
//! client.data().await?;
//! let response = client.send_data(b"Subject: Test\r\n\r\nHello World").await?;
//! assert!(response.is_success());
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod connection;
mod error;
mod extensions;
mod response;
mod smtp_client;
pub mod tls;

pub use error::{ClientError, Result, Stage};
pub use extensions::Extensions;
pub use response::{Response, ResponseLine};
pub use smtp_client::SmtpClient;
