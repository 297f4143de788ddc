//! Blocking writer framing a plain byte stream as a chunked body.

use std::fmt;
use std::io::{self, Write};

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::protocol::{PayloadItem, SendError};

/// Default maximum number of body bytes per emitted chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Lifecycle of a [`ChunkedWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Open,
    Closed,
}

/// Encodes written bytes as an HTTP/1.1 chunked body.
///
/// Written bytes are buffered up to the chunk size; a full buffer is sent as one chunk, and
/// [`flush`](Write::flush) or [`close`](Self::close) send whatever is pending. `close` ends the
/// body with the terminal `0\r\n\r\n` exactly once. Writing after `close` fails with
/// [`io::ErrorKind::BrokenPipe`].
///
/// Framed bytes stay buffered until the sink accepted them, so a failed write can be retried
/// by calling `flush` or `close` again without losing or repeating data.
///
/// The sink is never closed by the writer, [`into_inner`](Self::into_inner) gives it back.
pub struct ChunkedWriter<W: Write> {
    inner: W,
    encoder: ChunkedEncoder,
    pending: BytesMut,
    framed: BytesMut,
    chunk_size: usize,
    state: EncoderState,
}

impl<W: Write> ChunkedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE, inner)
    }

    /// Creates a writer emitting chunks of at most `chunk_size` bytes, a size of zero is
    /// treated as one.
    pub fn with_chunk_size(chunk_size: usize, inner: W) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            encoder: ChunkedEncoder::new(),
            pending: BytesMut::with_capacity(chunk_size),
            framed: BytesMut::new(),
            chunk_size,
            state: EncoderState::Open,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Sends pending data, the terminal chunk, then flushes the sink.
    ///
    /// The writer is closed only once all of it reached the sink. After a failure `close` can be
    /// called again, it sends what is left and never repeats the terminal chunk. Closing a
    /// closed writer writes nothing more.
    pub fn close(&mut self) -> io::Result<()> {
        if self.state == EncoderState::Closed {
            return Ok(());
        }

        self.frame_pending()?;
        if !self.encoder.is_finish() {
            self.encoder.encode(PayloadItem::<BytesMut>::Eof, &mut self.framed)?;
        }
        self.write_framed()?;
        self.inner.flush()?;

        self.state = EncoderState::Closed;
        debug!("closed chunked writer");
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Returns the sink, dropping any data not yet sent.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Moves the pending data into the framed buffer as one chunk.
    fn frame_pending(&mut self) -> Result<(), SendError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        trace!(len = self.pending.len(), "frame chunk");
        self.encoder.encode(PayloadItem::Chunk(&self.pending[..]), &mut self.framed)?;
        self.pending.clear();
        Ok(())
    }

    /// Writes the framed buffer, dropping only the bytes the sink accepted.
    fn write_framed(&mut self) -> Result<(), SendError> {
        while !self.framed.is_empty() {
            match self.inner.write(&self.framed) {
                Ok(0) => return Err(SendError::io(io::ErrorKind::WriteZero)),
                Ok(n) => self.framed.advance(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!(unsent = self.framed.len(), error = %e, "chunked sink write failed");
                    return Err(SendError::io(e));
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> Write for ChunkedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state == EncoderState::Closed || self.encoder.is_finish() {
            return Err(SendError::Closed.into());
        }
        // bytes left over from a failed write go first, nothing of `buf` is taken on error
        self.write_framed()?;

        let mut rest = buf;
        while !rest.is_empty() {
            let room = self.chunk_size - self.pending.len();
            let (head, tail) = rest.split_at(room.min(rest.len()));
            self.pending.extend_from_slice(head);
            rest = tail;

            if self.pending.len() == self.chunk_size {
                self.frame_pending()?;
                if self.write_framed().is_err() {
                    // the accepted bytes are kept framed, the error shows on the next call
                    return Ok(buf.len() - rest.len());
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame_pending()?;
        self.write_framed()?;
        self.inner.flush()
    }
}

impl<W: Write> fmt::Debug for ChunkedWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedWriter")
            .field("pending", &self.pending.len())
            .field("unsent", &self.framed.len())
            .field("chunk_size", &self.chunk_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn encode(data: &[u8], chunk_size: usize) -> Vec<u8> {
        let mut writer = ChunkedWriter::with_chunk_size(chunk_size, Vec::new());
        writer.write_all(data).unwrap();
        writer.close().unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_small_buffer_fragmentation() {
        assert_eq!(encode(b"test data", 2), b"2\r\nte\r\n2\r\nst\r\n2\r\n d\r\n2\r\nat\r\n1\r\na\r\n0\r\n\r\n");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(encode(b"", 2), b"0\r\n\r\n");

        let mut writer = ChunkedWriter::new(Vec::new());
        writer.close().unwrap();
        assert_eq!(writer.into_inner(), b"0\r\n\r\n");
    }

    #[test]
    fn test_default_chunk_size_keeps_one_chunk() {
        let encoded = encode(b"hello world", DEFAULT_CHUNK_SIZE);
        assert_eq!(encoded, b"b\r\nhello world\r\n0\r\n\r\n");
    }

    #[test]
    fn test_flush_emits_pending_chunk() {
        let mut writer = ChunkedWriter::with_chunk_size(16, Vec::new());
        writer.write_all(b"abc").unwrap();
        assert!(writer.get_ref().is_empty());

        writer.flush().unwrap();
        assert_eq!(writer.get_ref(), b"3\r\nabc\r\n");

        // nothing pending, nothing written
        writer.flush().unwrap();
        assert_eq!(writer.get_ref(), b"3\r\nabc\r\n");

        writer.write_all(b"0123456789abcdef").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner(), b"3\r\nabc\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut writer = ChunkedWriter::with_chunk_size(4, Vec::new());
        writer.write_all(b"abc").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert_eq!(writer.state(), EncoderState::Closed);
        assert_eq!(writer.into_inner(), b"3\r\nabc\r\n0\r\n\r\n");
    }

    #[test]
    fn test_write_after_close_is_rejected() {
        let mut writer = ChunkedWriter::new(Vec::new());
        writer.close().unwrap();

        let err = writer.write(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert_eq!(writer.into_inner(), b"0\r\n\r\n");
    }

    /// Sink failing its next `failures` writes, accepting at most `max_write` bytes per write.
    struct FlakySink {
        written: Vec<u8>,
        failures: usize,
        max_write: usize,
    }

    impl FlakySink {
        fn new(failures: usize, max_write: usize) -> Self {
            Self { written: Vec::new(), failures, max_write }
        }
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::other("sink unavailable"));
            }
            let n = buf.len().min(self.max_write);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_close_can_be_retried() {
        let mut writer = ChunkedWriter::with_chunk_size(16, FlakySink::new(1, usize::MAX));
        writer.write_all(b"abc").unwrap();

        assert!(writer.close().is_err());
        assert_eq!(writer.state(), EncoderState::Open);
        assert!(writer.get_ref().written.is_empty());
        assert_eq!(writer.write(b"late").unwrap_err().kind(), ErrorKind::BrokenPipe);

        writer.close().unwrap();
        assert_eq!(writer.state(), EncoderState::Closed);
        writer.close().unwrap();
        assert_eq!(writer.into_inner().written, b"3\r\nabc\r\n0\r\n\r\n");
    }

    #[test]
    fn test_accepted_bytes_survive_a_failed_emit() {
        let mut writer = ChunkedWriter::with_chunk_size(2, FlakySink::new(1, usize::MAX));
        assert_eq!(writer.write(b"a").unwrap(), 1);
        // the full chunk fails to go out but `b` is already taken
        assert_eq!(writer.write(b"b").unwrap(), 1);
        assert!(writer.get_ref().written.is_empty());

        writer.close().unwrap();
        assert_eq!(writer.into_inner().written, b"2\r\nab\r\n0\r\n\r\n");
    }

    #[test]
    fn test_failed_flush_keeps_framed_bytes() {
        let mut writer = ChunkedWriter::with_chunk_size(16, FlakySink::new(2, usize::MAX));
        writer.write_all(b"xyz").unwrap();
        assert!(writer.flush().is_err());
        assert!(writer.write(b"!").is_err());

        writer.write_all(b"!").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner().written, b"3\r\nxyz\r\n1\r\n!\r\n0\r\n\r\n");
    }

    #[test]
    fn test_short_sink_writes() {
        let mut writer = ChunkedWriter::with_chunk_size(4, FlakySink::new(0, 3));
        writer.write_all(b"hello").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner().written, b"4\r\nhell\r\n1\r\no\r\n0\r\n\r\n");
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let writer = ChunkedWriter::with_chunk_size(0, Vec::new());
        assert_eq!(writer.chunk_size(), 1);
        assert_eq!(encode(b"ab", 0), b"1\r\na\r\n1\r\nb\r\n0\r\n\r\n");
    }
}
