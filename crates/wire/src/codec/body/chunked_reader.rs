//! Blocking reader exposing a chunked body as a plain byte stream.

use std::fmt;
use std::io::{self, BufRead, Read};

use tracing::{debug, trace};

use crate::codec::body::chunked_decoder::{ChunkedFraming, DecoderPhase, Progress};
use crate::protocol::ParseError;

/// Decodes an HTTP/1.1 chunked body from a buffered source.
///
/// Framing bytes are consumed through [`BufRead::fill_buf`] and [`BufRead::consume`], so the
/// reader never takes bytes that follow the final CRLF: on a keep-alive connection the next
/// message stays in the source, which [`into_inner`](Self::into_inner) hands back.
///
/// Once the body is exhausted or the reader is [closed](Self::close), every read returns
/// end-of-stream. A source that ends in the middle of the body fails with
/// [`io::ErrorKind::UnexpectedEof`], a malformed size line with [`io::ErrorKind::InvalidData`].
pub struct ChunkedReader<R> {
    inner: R,
    framing: ChunkedFraming,
    closed: bool,
}

impl<R: BufRead> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, framing: ChunkedFraming::new(), closed: false }
    }

    /// Reads one byte of body data, `None` at the end of the body.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0_u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Stops delivering body data.
    ///
    /// Closing twice is a no-op. The source is left untouched, its lifecycle belongs to the
    /// caller.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(phase = ?self.framing.phase(), "close chunked reader");
            self.closed = true;
        }
    }

    pub fn phase(&self) -> DecoderPhase {
        if self.closed {
            DecoderPhase::Closed
        } else {
            self.framing.phase()
        }
    }

    /// Returns true once the terminal chunk and the final CRLF were read.
    pub fn is_exhausted(&self) -> bool {
        self.framing.is_finished()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || buf.is_empty() || self.framing.is_finished() {
            return Ok(0);
        }

        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                let phase = self.framing.phase();
                debug!(?phase, "source ended inside a chunked body");
                return Err(ParseError::unexpected_eof(phase.describe()).into());
            }

            let mut cursor = available;
            let progress = self.framing.advance(&mut cursor);
            let framing_len = available.len() - cursor.len();

            match progress {
                Ok(Progress::Data(len)) => {
                    let len = len.min(buf.len());
                    buf[..len].copy_from_slice(&cursor[..len]);
                    self.inner.consume(framing_len + len);
                    self.framing.consume_data(len);
                    trace!(len, "read chunked bytes");
                    return Ok(len);
                }
                Ok(Progress::NeedMore) => self.inner.consume(framing_len),
                Ok(Progress::Eof) => {
                    self.inner.consume(framing_len);
                    trace!("finished reading chunked data");
                    return Ok(0);
                }
                Err(e) => {
                    self.inner.consume(framing_len);
                    return Err(e.into());
                }
            }
        }
    }
}

impl<R> fmt::Debug for ChunkedReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedReader").field("framing", &self.framing).field("closed", &self.closed).finish_non_exhaustive()
    }
}
