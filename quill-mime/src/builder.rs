//! Serializes a [`Message`] into a complete MIME document.

use std::io::Write;

use rand::{TryRngCore, rngs::OsRng};

use crate::{
    MimeError, Result,
    attachment::encode_attachments,
    body::write_body,
    message::Message,
    multipart::{MultipartWriter, PartCreator, PartHeaders},
};

/// Random bytes per boundary, hex encoded to 60 characters.
const BOUNDARY_BYTES: usize = 30;

/// The two boundaries a message needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundaries {
    /// Delimits the outer multipart/mixed section.
    pub mixed: String,
    /// Delimits the inner multipart/alternative section.
    pub alternative: String,
}

impl Boundaries {
    pub fn new(mixed: impl Into<String>, alternative: impl Into<String>) -> Self {
        Self {
            mixed: mixed.into(),
            alternative: alternative.into(),
        }
    }

    /// Two independent boundaries from the operating system's random source.
    ///
    /// # Errors
    ///
    /// [`MimeError::Boundary`] if the random source fails.
    pub fn generate() -> Result<Self> {
        Ok(Self {
            mixed: random_boundary()?,
            alternative: random_boundary()?,
        })
    }
}

fn random_boundary() -> Result<String> {
    let mut bytes = [0; BOUNDARY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| MimeError::Boundary(e.to_string()))?;

    Ok(hex::encode(bytes))
}

/// Build `message` into a buffer with fresh boundaries and the current date.
///
/// # Errors
///
/// Fails if no boundary can be generated or an attachment cannot be read.
/// The partial output is dropped.
pub fn build(message: &mut Message) -> Result<Vec<u8>> {
    let boundaries = Boundaries::generate()?;
    message.refresh_date();

    let mut out = Vec::new();
    write_message(message, &boundaries, &mut out)?;

    Ok(out)
}

fn write_headers(message: &Message, out: &mut impl Write) -> Result<()> {
    if message.from_name().is_empty() {
        write!(out, "From: {}\r\n", message.from())?;
    } else {
        write!(out, "From: {} <{}>\r\n", message.from_name(), message.from())?;
    }

    write!(out, "Mime-Version: 1.0\r\n")?;
    write!(out, "Date: {}\r\n", message.date())?;

    if !message.reply_to().is_empty() {
        write!(out, "Reply-To: {}\r\n", message.reply_to())?;
    }

    write!(out, "Subject: {}\r\n", message.subject())?;
    write!(out, "To: {}\r\n", message.to().join(","))?;

    if !message.cc().is_empty() {
        write!(out, "CC: {}\r\n", message.cc().join(","))?;
    }

    if message.writes_bcc_header() && !message.bcc().is_empty() {
        write!(out, "BCC: {}\r\n", message.bcc().join(","))?;
    }

    for (name, values) in message.headers() {
        for value in values {
            write!(out, "{name}: {value}\r\n")?;
        }
    }

    Ok(())
}

fn write_parts(
    message: &mut Message,
    alternative: &str,
    mixed: &mut impl PartCreator,
) -> Result<()> {
    let mut headers = PartHeaders::new();
    headers.insert(
        "Content-Type".to_string(),
        format!("multipart/alternative;\r\n\tboundary=\"{alternative}\""),
    );

    let part = mixed.create_part(&headers)?;
    write_body(message.plain().as_bytes(), message.html().as_bytes(), alternative, part)?;

    let policy = message.content_id_policy();
    encode_attachments(message.attachments_mut(), mixed, policy)
}

/// Serialize `message` with the given boundaries, leaving the date as is.
///
/// Attachment content streams are consumed.
///
/// # Errors
///
/// Any write error, or [`MimeError::Attachment`] if a content stream fails.
pub fn write_message(message: &mut Message, boundaries: &Boundaries, out: &mut impl Write) -> Result<()> {
    write_headers(message, out)?;
    write!(
        out,
        "Content-Type: multipart/mixed;\r\n\tboundary=\"{}\"; charset=UTF-8\r\n\r\n",
        boundaries.mixed
    )?;

    let mut mixed = MultipartWriter::new(&mut *out, boundaries.mixed.as_str());
    let written = write_parts(message, &boundaries.alternative, &mut mixed);
    let closed = mixed.close();

    written?;
    closed?;

    Ok(())
}
