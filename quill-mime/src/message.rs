//! The state of an email before it is serialized.

use std::{
    fmt,
    io::{self, Read},
};

use chrono::Utc;
use regex::Regex;

use crate::attachment::{Attachment, ContentIdPolicy};

/// Removed from addresses and the subject so they cannot start new header lines.
///
/// Lone CRs are removed as well.
const LINE_BREAK_PATTERN: &str = r"[\r\n]";

/// RFC 5322 date, e.g. `Mon, 02 Jan 2006 15:04:05 +0000`.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// An append-only body buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Body(Vec<u8>);

impl Body {
    /// Replace the contents.
    pub fn set(&mut self, content: impl AsRef<[u8]>) {
        self.0.clear();
        self.0.extend_from_slice(content.as_ref());
    }

    pub fn reset(&mut self) {
        self.0.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl io::Write for Body {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for Body {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Everything needed to serialize one email.
///
/// Setters that take addresses or the subject drop embedded line breaks.
#[derive(Debug)]
pub struct Message {
    from: String,
    from_name: String,
    reply_to: String,
    subject: String,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    headers: Vec<(String, Vec<String>)>,
    plain: Body,
    html: Body,
    attachments: Vec<Attachment>,
    write_bcc_header: bool,
    content_id: ContentIdPolicy,
    date: String,
    line_breaks: Regex,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    #[must_use]
    pub fn new() -> Self {
        #[allow(
            clippy::expect_used,
            reason = "compile-time constant regex should be valid"
        )]
        let line_breaks = Regex::new(LINE_BREAK_PATTERN).expect("line break regex should be valid");

        Self {
            from: String::new(),
            from_name: String::new(),
            reply_to: String::new(),
            subject: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            headers: Vec::new(),
            plain: Body::default(),
            html: Body::default(),
            attachments: Vec::new(),
            write_bcc_header: false,
            content_id: ContentIdPolicy::default(),
            date: String::new(),
            line_breaks,
        }
    }

    fn trim(&self, value: &str) -> String {
        self.line_breaks.replace_all(value, "").into_owned()
    }

    fn trim_all<I, S>(&self, addresses: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses
            .into_iter()
            .map(|address| self.trim(address.as_ref()))
            .filter(|address| !address.is_empty())
            .collect()
    }

    /// Replace the `To` recipients. Empty entries are skipped.
    pub fn set_to<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.to = self.trim_all(addresses);
        self
    }

    /// Replace the `Cc` recipients. Empty entries are skipped.
    pub fn set_cc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cc = self.trim_all(addresses);
        self
    }

    /// Replace the `Bcc` recipients. Empty entries are skipped.
    ///
    /// Bcc recipients only appear in the header block when
    /// [`Message::set_write_bcc_header`] is enabled.
    pub fn set_bcc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bcc = self.trim_all(addresses);
        self
    }

    pub fn set_from(&mut self, address: &str) -> &mut Self {
        self.from = self.trim(address);
        self
    }

    pub fn set_from_name(&mut self, name: &str) -> &mut Self {
        self.from_name = self.trim(name);
        self
    }

    pub fn set_reply_to(&mut self, address: &str) -> &mut Self {
        self.reply_to = self.trim(address);
        self
    }

    pub fn set_subject(&mut self, subject: &str) -> &mut Self {
        self.subject = self.trim(subject);
        self
    }

    /// Add a header value. The same name may be added more than once.
    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        let name = self.trim(name);
        let value = self.trim(value);

        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => self.headers.push((name, vec![value])),
        }

        self
    }

    pub fn add_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self.add_header(name.as_ref(), value.as_ref());
        }
        self
    }

    /// Include Bcc recipients in the header block.
    pub const fn set_write_bcc_header(&mut self, write: bool) -> &mut Self {
        self.write_bcc_header = write;
        self
    }

    pub const fn set_content_id_policy(&mut self, policy: ContentIdPolicy) -> &mut Self {
        self.content_id = policy;
        self
    }

    /// Set the `Date` header value. Building a message overwrites it.
    pub fn set_date(&mut self, date: impl Into<String>) -> &mut Self {
        self.date = date.into();
        self
    }

    /// Stamp the message with the current time.
    pub fn refresh_date(&mut self) {
        self.date = Utc::now().format(DATE_FORMAT).to_string();
    }

    pub const fn plain_mut(&mut self) -> &mut Body {
        &mut self.plain
    }

    pub const fn html_mut(&mut self) -> &mut Body {
        &mut self.html
    }

    pub fn attach(&mut self, filename: &str, content: impl Read + Send + 'static) -> &mut Self {
        self.attachments.push(Attachment::new(filename, content));
        self
    }

    pub fn attach_inline(&mut self, filename: &str, content: impl Read + Send + 'static) -> &mut Self {
        self.attachments.push(Attachment::inline(filename, content));
        self
    }

    pub fn attach_with_mime_type(
        &mut self,
        filename: &str,
        content: impl Read + Send + 'static,
        mime_type: &str,
    ) -> &mut Self {
        self.attachments
            .push(Attachment::new(filename, content).with_mime_type(mime_type));
        self
    }

    pub fn attach_inline_with_mime_type(
        &mut self,
        filename: &str,
        content: impl Read + Send + 'static,
        mime_type: &str,
    ) -> &mut Self {
        self.attachments
            .push(Attachment::inline(filename, content).with_mime_type(mime_type));
        self
    }

    pub fn clear_attachments(&mut self) -> &mut Self {
        self.attachments.clear();
        self
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    pub fn reply_to(&self) -> &str {
        &self.reply_to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    /// Custom headers in insertion order.
    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub const fn plain(&self) -> &Body {
        &self.plain
    }

    pub const fn html(&self) -> &Body {
        &self.html
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub(crate) fn attachments_mut(&mut self) -> &mut [Attachment] {
        &mut self.attachments
    }

    pub const fn writes_bcc_header(&self) -> bool {
        self.write_bcc_header
    }

    pub const fn content_id_policy(&self) -> ContentIdPolicy {
        self.content_id
    }

    /// The sender address for `MAIL FROM`.
    pub fn envelope_sender(&self) -> &str {
        strip_display_name(&self.from)
    }

    /// Every recipient for `RCPT TO`: To, then Cc, then Bcc, without display names.
    pub fn envelope_recipients(&self) -> Vec<String> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|address| strip_display_name(address).to_string())
            .collect()
    }
}

/// Reduce `Name <user@host>` to `user@host`.
///
/// Anything that does not look like an address in angle brackets is
/// returned unchanged.
pub fn strip_display_name(address: &str) -> &str {
    let trimmed = address.trim();

    trimmed
        .strip_suffix('>')
        .and_then(|rest| rest.rfind('<').map(|start| rest[start + 1..].trim()))
        .filter(|inner| inner.contains('@'))
        .unwrap_or(address)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attachments: Vec<&str> = self.attachments.iter().map(Attachment::filename).collect();
        let headers: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();

        write!(
            f,
            "Message {{ date: {:?}, from: {:?}, from_name: {:?}, reply_to: {:?}, subject: {:?}, \
             to: {:?}, cc: {:?}, bcc: {:?}, headers: {:?}, html: {} bytes, plain: {} bytes, \
             attachments ({}): {:?} }}",
            self.date,
            self.from,
            self.from_name,
            self.reply_to,
            self.subject,
            self.to,
            self.cc,
            self.bcc,
            headers,
            self.html.len(),
            self.plain.len(),
            attachments.len(),
            attachments,
        )
    }
}
