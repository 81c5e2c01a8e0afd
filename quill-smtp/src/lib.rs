//! SMTP submission for quill.
//!
//! [`Transport`] is the entry point: pick a strategy, describe the
//! [`Envelope`] and hand over the message bytes. [`client::SmtpClient`] is
//! the lower level session it drives.

pub mod auth;
pub mod client;
pub mod data;
pub mod envelope;
pub mod transport;

pub use auth::{Credentials, Mechanism};
pub use client::{ClientError, Response, Result, Stage};
pub use envelope::Envelope;
pub use transport::Transport;
