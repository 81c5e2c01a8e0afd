//! The multipart/alternative section holding the text and HTML bodies.

use std::io::{self, Write};

use crate::multipart::{MultipartWriter, PartCreator, PartHeaders};

const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
const TEXT_HTML: &str = "text/html; charset=UTF-8";

/// Quoted-printable encode `text`, treating bare LF as a line break.
#[must_use]
pub fn encode_quoted_printable(text: &[u8]) -> Vec<u8> {
    quoted_printable::encode(normalize_line_endings(text))
}

/// Turn every LF that is not already preceded by CR into CRLF.
fn normalize_line_endings(text: &[u8]) -> Vec<u8> {
    let mut normalized = Vec::with_capacity(text.len());
    let mut previous = None;

    for &byte in text {
        if byte == b'\n' && previous != Some(b'\r') {
            normalized.push(b'\r');
        }
        normalized.push(byte);
        previous = Some(byte);
    }

    normalized
}

fn write_text_part(parts: &mut impl PartCreator, content_type: &str, text: &[u8]) -> io::Result<()> {
    let mut headers = PartHeaders::new();
    headers.insert(
        "Content-Transfer-Encoding".to_string(),
        "quoted-printable".to_string(),
    );
    headers.insert("Content-Type".to_string(), content_type.to_string());

    parts
        .create_part(&headers)?
        .write_all(&encode_quoted_printable(text))
}

fn write_parts(parts: &mut impl PartCreator, plain: &[u8], html: &[u8]) -> io::Result<()> {
    if !plain.is_empty() {
        write_text_part(parts, TEXT_PLAIN, plain)?;
    }

    if !html.is_empty() {
        write_text_part(parts, TEXT_HTML, html)?;
    }

    Ok(())
}

/// Write the plain text part, then the HTML part, each only when non-empty.
///
/// The section is always closed, even when writing a part failed; in that
/// case the part's error is the one returned. With both bodies empty the
/// output is just the closing delimiter.
///
/// # Errors
///
/// Any error from `out`.
pub fn write_body(plain: &[u8], html: &[u8], boundary: &str, out: &mut dyn Write) -> io::Result<()> {
    let mut parts = MultipartWriter::new(out, boundary);
    let written = write_parts(&mut parts, plain, html);
    let closed = parts.close();

    written.and(closed.map(|_| ()))
}
