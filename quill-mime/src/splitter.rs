//! Fixed width line wrapping for base64 payloads.

use std::io::{self, Write};

/// Width of a wrapped base64 line, excluding the line break.
pub const MAX_LINE_LEN: usize = 60;

const CRLF: &[u8] = b"\r\n";

/// Breaks everything written through it into lines of at most `width` bytes.
///
/// Each call to [`LineSplitter::write_wrapped`] (and so each `write`) is
/// wrapped on its own: the width counter restarts at zero for every call, and
/// the trailing partial line is written without a line break. Writing one
/// logical unit with several calls therefore does NOT produce a contiguous
/// wrap across the call boundaries.
#[derive(Debug)]
pub struct LineSplitter<W> {
    inner: W,
    width: usize,
}

impl<W: Write> LineSplitter<W> {
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self::with_width(inner, MAX_LINE_LEN)
    }

    /// A splitter with a custom width. A width of zero disables wrapping.
    #[must_use]
    pub const fn with_width(inner: W, width: usize) -> Self {
        Self { inner, width }
    }

    /// Write `buf`, inserting a CRLF after every full line.
    ///
    /// Returns the number of bytes that reached the sink, that is the input
    /// length plus two for every inserted line break.
    ///
    /// # Errors
    ///
    /// Any error from the underlying sink, returned as soon as it happens.
    pub fn write_wrapped(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.width == 0 {
            self.inner.write_all(buf)?;
            return Ok(buf.len());
        }

        let mut lines = buf.chunks_exact(self.width);
        let mut breaks = 0;

        for line in &mut lines {
            self.inner.write_all(line)?;
            self.inner.write_all(CRLF)?;
            breaks += 1;
        }

        self.inner.write_all(lines.remainder())?;

        Ok(buf.len() + breaks * CRLF.len())
    }

    pub const fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for LineSplitter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_wrapped(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
