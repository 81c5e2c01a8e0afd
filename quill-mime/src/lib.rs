//! Builds RFC 5322 / MIME messages.
//!
//! A [`Message`] holds the headers, bodies and attachments. [`build`] turns
//! it into a `multipart/mixed` document whose first part is a
//! `multipart/alternative` section with the quoted-printable text and HTML
//! bodies, followed by one base64 part per attachment.

pub mod attachment;
pub mod body;
pub mod builder;
pub mod error;
pub mod message;
pub mod multipart;
pub mod sniff;
pub mod splitter;

pub use attachment::{Attachment, ContentIdPolicy, encode_attachments};
pub use builder::{Boundaries, build, write_message};
pub use error::{MimeError, Result};
pub use message::{Body, Message, strip_display_name};
pub use multipart::{MultipartWriter, PartCreator, PartHeaders};
pub use sniff::detect_content_type;
pub use splitter::LineSplitter;
