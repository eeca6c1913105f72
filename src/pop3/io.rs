//! Line-oriented I/O over a POP3 connection.
//!
//! Works on any byte stream, plain TCP or TLS. Every write is flushed
//! straight away so replies reach the client before the next command is
//! read.

use crate::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Longest command line accepted, terminator included.
pub const MAX_LINE_LENGTH: u64 = 4096;

/// Reads CRLF-terminated lines from and writes replies to a stream.
pub struct LineStream<S> {
    inner: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Read the next line without its terminator, or `None` once the
    /// client has closed the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on a transport failure and
    /// [`Error::MalformedLine`] for a line that is too long, cut off by
    /// the end of the stream, or not UTF-8.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = (&mut self.inner)
            .take(MAX_LINE_LENGTH)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            return Err(Error::MalformedLine);
        }
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| Error::MalformedLine)
    }

    /// Write one reply line, adding CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = String::with_capacity(line.len() + 2);
        out.push_str(line);
        out.push_str("\r\n");
        self.write_raw(out.as_bytes()).await
    }

    /// Write a multi-line reply: the status line, `body` with lines that
    /// start with `.` byte-stuffed, then the terminating `.` line.
    ///
    /// A body that does not end in CRLF gets one, so the reply always
    /// ends in `CRLF.CRLF`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub async fn write_multiline(&mut self, status: &str, body: &str) -> Result<()> {
        let mut out = String::with_capacity(status.len() + body.len() + 8);
        out.push_str(status);
        out.push_str("\r\n");
        for line in body.split_inclusive('\n') {
            if line.starts_with('.') {
                out.push('.');
            }
            out.push_str(line);
        }
        if !body.is_empty() && !body.ends_with("\r\n") {
            out.push_str("\r\n");
        }
        out.push_str(".\r\n");
        self.write_raw(out.as_bytes()).await
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.inner.get_mut().write_all(data).await?;
        self.inner.get_mut().flush().await?;
        Ok(())
    }
}
