//! Configuration types shared by the transport and the CLI.
//!
//! - [`tls`]: certificate trust, server name and protocol version settings
//! - [`transport`]: which SMTP transport strategy a mailer uses

pub mod tls;
pub mod transport;

pub use tls::{TlsSettings, TlsVersion, TrustRoots};
pub use transport::TransportKind;
