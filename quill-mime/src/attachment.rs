//! Attachments and their encoding into base64 MIME parts.

use std::{
    fmt,
    io::{self, Read, Write},
};

use base64::{engine::general_purpose::STANDARD, write::EncoderWriter};
use serde::{Deserialize, Serialize};

use crate::{
    MimeError, Result,
    multipart::{PartCreator, PartHeaders},
    sniff::{SNIFF_LEN, detect_content_type},
    splitter::{LineSplitter, MAX_LINE_LEN},
};

const COPY_BUFFER_LEN: usize = 8 * 1024;

/// Which attachments carry a `Content-ID` header.
///
/// HTML bodies reference a part through `cid:<filename>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentIdPolicy {
    /// Only regular (non inline) attachments.
    #[default]
    NonInline,

    /// Only inline attachments.
    Inline,

    /// Every attachment.
    Both,
}

impl ContentIdPolicy {
    /// Whether an attachment with the given disposition gets a `Content-ID`.
    #[must_use]
    pub const fn applies_to(self, inline: bool) -> bool {
        match self {
            Self::NonInline => !inline,
            Self::Inline => inline,
            Self::Both => true,
        }
    }
}

/// A file to embed in a message.
///
/// The content is read lazily, exactly once, when the message is built.
pub struct Attachment {
    filename: String,
    content: Box<dyn Read + Send>,
    inline: bool,
    mime_type: Option<String>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("inline", &self.inline)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

impl Attachment {
    /// A regular attachment, shown by mail clients as a separate file.
    pub fn new(filename: impl Into<String>, content: impl Read + Send + 'static) -> Self {
        Self {
            filename: filename.into(),
            content: Box::new(content),
            inline: false,
            mime_type: None,
        }
    }

    /// An attachment displayed inline, referenced from HTML as `cid:<filename>`.
    pub fn inline(filename: impl Into<String>, content: impl Read + Send + 'static) -> Self {
        Self {
            inline: true,
            ..Self::new(filename, content)
        }
    }

    /// Use `mime_type` instead of sniffing the content.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn headers(&self, sniffed: &[u8], content_id: ContentIdPolicy) -> PartHeaders {
        let name = quote(&self.filename);
        let content_type = self
            .mime_type
            .as_deref()
            .unwrap_or_else(|| detect_content_type(sniffed));
        let disposition = if self.inline { "inline" } else { "attachment" };

        let mut headers = PartHeaders::new();
        headers.insert(
            "Content-Type".to_string(),
            format!("{content_type};\n\tfilename=\"{name}\""),
        );
        headers.insert(
            "Content-Disposition".to_string(),
            format!("{disposition};\n\tfilename=\"{name}\""),
        );
        headers.insert(
            "Content-Transfer-Encoding".to_string(),
            "base64".to_string(),
        );

        if content_id.applies_to(self.inline) {
            headers.insert("Content-ID".to_string(), format!("<{name}>"));
        }

        headers
    }

    fn read_error(&self, source: io::Error) -> MimeError {
        MimeError::Attachment {
            filename: self.filename.clone(),
            source,
        }
    }

    /// Write this attachment as one base64 part.
    fn encode(&mut self, parts: &mut impl PartCreator, content_id: ContentIdPolicy) -> Result<()> {
        let mut sniff = [0; SNIFF_LEN];
        let sniffed = read_up_to(&mut self.content, &mut sniff).map_err(|e| self.read_error(e))?;

        let headers = self.headers(&sniff[..sniffed], content_id);
        let part = parts.create_part(&headers)?;
        let mut encoder = EncoderWriter::new(WholeLines::new(LineSplitter::new(part)), &STANDARD);

        encoder.write_all(&sniff[..sniffed])?;

        // A short read means the whole content is already in the sniff buffer.
        if sniffed == SNIFF_LEN {
            let mut buffer = vec![0; COPY_BUFFER_LEN];
            loop {
                let read = match self.content.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => read,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(self.read_error(e)),
                };
                encoder.write_all(&buffer[..read])?;
            }
        }

        encoder.finish()?.finish()?;

        Ok(())
    }
}

/// Feeds the splitter whole lines only.
///
/// The base64 encoder flushes in chunks that are not a multiple of the line
/// width, and the splitter restarts its column count on every write. Holding
/// back the partial line keeps every line but the last at full width.
struct WholeLines<W: Write> {
    splitter: LineSplitter<W>,
    pending: Vec<u8>,
}

impl<W: Write> WholeLines<W> {
    fn new(splitter: LineSplitter<W>) -> Self {
        Self {
            splitter,
            pending: Vec::with_capacity(COPY_BUFFER_LEN),
        }
    }

    /// Write the held back partial line.
    fn finish(mut self) -> io::Result<()> {
        self.splitter.write_wrapped(&self.pending)?;
        self.splitter.flush()
    }
}

impl<W: Write> Write for WholeLines<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        let whole = self.pending.len() - self.pending.len() % MAX_LINE_LEN;
        if whole > 0 {
            self.splitter.write_wrapped(&self.pending[..whole])?;
            self.pending.drain(..whole);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.splitter.flush()
    }
}

/// Fill as much of `buffer` as the reader allows, stopping at end of stream.
fn read_up_to(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

/// Make a filename safe inside a quoted header parameter.
fn quote(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());

    for c in filename.chars() {
        match c {
            '\r' | '\n' => {}
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            _ => quoted.push(c),
        }
    }

    quoted
}

/// Append one base64 part per attachment, in list order.
///
/// Stops at the first failure; the parts written so far are left in the sink.
///
/// # Errors
///
/// [`MimeError::Attachment`] when a content stream fails to read, and
/// [`MimeError::Io`] when a part cannot be created or written.
pub fn encode_attachments(
    attachments: &mut [Attachment],
    parts: &mut impl PartCreator,
    content_id: ContentIdPolicy,
) -> Result<()> {
    for attachment in attachments {
        attachment.encode(parts, content_id)?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::io::Cursor;

    use base64::Engine;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Records every part instead of writing a multipart body.
    #[derive(Default)]
    struct RecordingParts {
        parts: Vec<(PartHeaders, Vec<u8>)>,
    }

    impl PartCreator for RecordingParts {
        fn create_part(&mut self, headers: &PartHeaders) -> io::Result<&mut dyn Write> {
            self.parts.push((headers.clone(), Vec::new()));
            let (_, body) = self.parts.last_mut().expect("part just pushed");
            Ok(body)
        }
    }

    struct FailingParts;

    impl PartCreator for FailingParts {
        fn create_part(&mut self, _: &PartHeaders) -> io::Result<&mut dyn Write> {
            Err(io::Error::other("no more parts"))
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    /// Reads one byte at a time.
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    fn encode(attachments: &mut [Attachment], policy: ContentIdPolicy) -> RecordingParts {
        let mut parts = RecordingParts::default();
        encode_attachments(attachments, &mut parts, policy).expect("encode");
        parts
    }

    fn header<'a>(headers: &'a PartHeaders, name: &str) -> &'a str {
        headers.get(name).map_or("", String::as_str)
    }

    fn unwrap_lines(body: &[u8]) -> String {
        String::from_utf8(body.to_vec())
            .expect("base64 is ascii")
            .replace("\r\n", "")
    }

    #[test]
    fn test_single_text_attachment() {
        let parts = encode(
            &mut [Attachment::new("advice", Cursor::new("Don't Panic"))],
            ContentIdPolicy::NonInline,
        );

        assert_eq!(parts.parts.len(), 1);
        let (headers, body) = &parts.parts[0];

        assert_eq!(
            header(headers, "Content-Type"),
            "text/plain; charset=utf-8;\n\tfilename=\"advice\""
        );
        assert_eq!(
            header(headers, "Content-Disposition"),
            "attachment;\n\tfilename=\"advice\""
        );
        assert_eq!(header(headers, "Content-Transfer-Encoding"), "base64");
        assert_eq!(header(headers, "Content-ID"), "<advice>");
        assert_eq!(body, b"RG9uJ3QgUGFuaWM=");
    }

    #[test]
    fn test_inline_attachment() {
        let parts = encode(
            &mut [Attachment::inline("test.html", Cursor::new("<html><head></head></html>"))],
            ContentIdPolicy::NonInline,
        );

        let (headers, body) = &parts.parts[0];
        assert_eq!(
            header(headers, "Content-Type"),
            "text/html; charset=utf-8;\n\tfilename=\"test.html\""
        );
        assert_eq!(
            header(headers, "Content-Disposition"),
            "inline;\n\tfilename=\"test.html\""
        );
        assert!(!headers.contains_key("Content-ID"));
        assert_eq!(body, b"PGh0bWw+PGhlYWQ+PC9oZWFkPjwvaHRtbD4=");
    }

    #[test]
    fn test_content_id_policy() {
        let make = || {
            [
                Attachment::new("file", Cursor::new("a")),
                Attachment::inline("logo", Cursor::new("b")),
            ]
        };

        let ids = |policy| {
            encode(&mut make(), policy)
                .parts
                .iter()
                .map(|(headers, _)| headers.get("Content-ID").cloned())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(ContentIdPolicy::NonInline), vec![Some("<file>".to_string()), None]);
        assert_eq!(ids(ContentIdPolicy::Inline), vec![None, Some("<logo>".to_string())]);
        assert_eq!(
            ids(ContentIdPolicy::Both),
            vec![Some("<file>".to_string()), Some("<logo>".to_string())]
        );
    }

    #[test]
    fn test_explicit_mime_type() {
        let parts = encode(
            &mut [Attachment::new("data.xml", Cursor::new("<?xml version=\"1.0\"?>"))
                .with_mime_type("application/xml")],
            ContentIdPolicy::NonInline,
        );

        assert_eq!(
            header(&parts.parts[0].0, "Content-Type"),
            "application/xml;\n\tfilename=\"data.xml\""
        );
    }

    #[test]
    fn test_empty_attachment() {
        let parts = encode(
            &mut [Attachment::new("empty", Cursor::new(Vec::<u8>::new()))],
            ContentIdPolicy::NonInline,
        );

        let (headers, body) = &parts.parts[0];
        assert_eq!(
            header(headers, "Content-Type"),
            "text/plain; charset=utf-8;\n\tfilename=\"empty\""
        );
        assert!(body.is_empty());
    }

    #[test]
    fn test_long_attachment_is_fully_encoded() {
        let content: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let parts = encode(
            &mut [Attachment::new("blob.bin", Cursor::new(content.clone()))],
            ContentIdPolicy::NonInline,
        );

        let (headers, body) = &parts.parts[0];
        assert_eq!(
            header(headers, "Content-Type"),
            "application/octet-stream;\n\tfilename=\"blob.bin\""
        );

        let decoded = STANDARD.decode(unwrap_lines(body)).expect("valid base64");
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_exactly_sniff_len() {
        let content = vec![b'x'; SNIFF_LEN];
        let parts = encode(
            &mut [Attachment::new("x.txt", Cursor::new(content.clone()))],
            ContentIdPolicy::NonInline,
        );

        let decoded = STANDARD
            .decode(unwrap_lines(&parts.parts[0].1))
            .expect("valid base64");
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_short_reads_fill_the_sniff_buffer() {
        let mut content = b"<html><body>".to_vec();
        content.extend(std::iter::repeat_n(b'z', 1000));

        let parts = encode(
            &mut [Attachment::new("page", Trickle(Cursor::new(content.clone())))],
            ContentIdPolicy::NonInline,
        );

        let (headers, body) = &parts.parts[0];
        assert!(header(headers, "Content-Type").starts_with("text/html; charset=utf-8;"));
        assert_eq!(STANDARD.decode(unwrap_lines(body)).expect("valid base64"), content);
    }

    #[test]
    fn test_short_payload_is_wrapped_at_sixty() {
        let content = vec![b'q'; 200];
        let parts = encode(
            &mut [Attachment::new("q.txt", Cursor::new(content.clone()))],
            ContentIdPolicy::NonInline,
        );

        let body = String::from_utf8(parts.parts[0].1.clone()).expect("ascii");
        let expected = STANDARD.encode(&content);
        let lines: Vec<&str> = body.split("\r\n").collect();

        assert!(lines[..lines.len() - 1].iter().all(|line| line.len() == 60));
        assert_eq!(lines.concat(), expected);
    }

    #[test]
    fn test_full_final_line_ends_with_crlf() {
        let content = vec![b'a'; 45];
        let parts = encode(
            &mut [Attachment::new("a.txt", Cursor::new(content.clone()))],
            ContentIdPolicy::NonInline,
        );

        let body = String::from_utf8(parts.parts[0].1.clone()).expect("ascii");
        assert_eq!(body, format!("{}\r\n", STANDARD.encode(&content)));
    }

    #[test]
    fn test_long_payload_lines_stay_at_sixty() {
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        let parts = encode(
            &mut [Attachment::new("big.bin", Cursor::new(content.clone()))],
            ContentIdPolicy::NonInline,
        );

        let body = String::from_utf8(parts.parts[0].1.clone()).expect("ascii");
        let lines: Vec<&str> = body.split("\r\n").collect();
        let (last, full) = lines.split_last().expect("at least one line");

        assert!(full.iter().all(|line| line.len() == 60), "{full:?}");
        assert!(last.len() < 60);
        assert_eq!(lines.concat(), STANDARD.encode(&content));
    }

    #[test]
    fn test_order_is_preserved() {
        let parts = encode(
            &mut [
                Attachment::new("first", Cursor::new(vec![b'1'; 700])),
                Attachment::new("second", Cursor::new("2")),
                Attachment::inline("third", Cursor::new("3")),
            ],
            ContentIdPolicy::NonInline,
        );

        let names: Vec<&str> = parts
            .parts
            .iter()
            .map(|(headers, _)| header(headers, "Content-Disposition"))
            .collect();

        assert_eq!(
            names,
            vec![
                "attachment;\n\tfilename=\"first\"",
                "attachment;\n\tfilename=\"second\"",
                "inline;\n\tfilename=\"third\"",
            ]
        );
    }

    #[test]
    fn test_filename_is_quoted() {
        let parts = encode(
            &mut [Attachment::new("a \"b\"\r\nX-Evil: 1", Cursor::new("x"))],
            ContentIdPolicy::NonInline,
        );

        assert_eq!(
            header(&parts.parts[0].0, "Content-Disposition"),
            "attachment;\n\tfilename=\"a \\\"b\\\"X-Evil: 1\""
        );
    }

    #[test]
    fn test_read_error_aborts() {
        let mut parts = RecordingParts::default();
        let err = encode_attachments(
            &mut [
                Attachment::new("ok", Cursor::new("fine")),
                Attachment::new("broken", FailingReader),
                Attachment::new("never", Cursor::new("unread")),
            ],
            &mut parts,
            ContentIdPolicy::NonInline,
        )
        .expect_err("read fails");

        assert!(matches!(&err, MimeError::Attachment { filename, .. } if filename == "broken"));
        assert_eq!(parts.parts.len(), 1);
    }

    #[test]
    fn test_part_creation_error_aborts() {
        let err = encode_attachments(
            &mut [Attachment::new("a", Cursor::new("b"))],
            &mut FailingParts,
            ContentIdPolicy::NonInline,
        )
        .expect_err("part creation fails");

        assert!(matches!(err, MimeError::Io(_)));
    }

    #[test]
    fn test_debug_hides_content() {
        let attachment = Attachment::new("secret.txt", Cursor::new("hunter2"));
        let debug = format!("{attachment:?}");

        assert!(debug.contains("secret.txt"));
        assert!(!debug.contains("hunter2"));
    }
}
