//! A minimal multipart writer.
//!
//! Parts are delimited as `--boundary` (first part) or `\r\n--boundary`
//! (every later part), followed by the part headers in name order, a blank
//! line and the part body. Closing writes `\r\n--boundary--\r\n`.

use std::{
    collections::BTreeMap,
    io::{self, Write},
};

/// Headers of a single part, written in name order.
pub type PartHeaders = BTreeMap<String, String>;

/// Something that can open a new MIME part.
///
/// The returned sink receives the raw body of the part; its headers have
/// already been written.
pub trait PartCreator {
    /// Open a new part with the given headers.
    ///
    /// # Errors
    ///
    /// Fails if the delimiter or headers cannot be written.
    fn create_part(&mut self, headers: &PartHeaders) -> io::Result<&mut dyn Write>;
}

#[derive(Debug)]
pub struct MultipartWriter<W> {
    inner: W,
    boundary: String,
    has_parts: bool,
}

impl<W: Write> MultipartWriter<W> {
    pub fn new(inner: W, boundary: impl Into<String>) -> Self {
        Self {
            inner,
            boundary: boundary.into(),
            has_parts: false,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Write the closing delimiter and hand back the sink.
    ///
    /// # Errors
    ///
    /// Fails if the closing delimiter cannot be written.
    pub fn close(mut self) -> io::Result<W> {
        write!(self.inner, "\r\n--{}--\r\n", self.boundary)?;
        Ok(self.inner)
    }
}

impl<W: Write> PartCreator for MultipartWriter<W> {
    fn create_part(&mut self, headers: &PartHeaders) -> io::Result<&mut dyn Write> {
        let mut head = Vec::new();

        if self.has_parts {
            write!(head, "\r\n--{}\r\n", self.boundary)?;
        } else {
            write!(head, "--{}\r\n", self.boundary)?;
        }

        for (name, value) in headers {
            write!(head, "{name}: {value}\r\n")?;
        }
        head.extend_from_slice(b"\r\n");

        self.inner.write_all(&head)?;
        self.has_parts = true;

        Ok(&mut self.inner)
    }
}
