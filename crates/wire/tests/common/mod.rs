#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use bytes::{Bytes, BytesMut};
use micro_wire::codec::ChunkedDecoder;
use micro_wire::protocol::{ParseError, PayloadItem};
use tokio_util::codec::Decoder;

/// Installs a test writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

/// Feeds `wire` to a fresh decoder in slices of `step` bytes, collecting the body until `Eof`.
///
/// Returns the body and the bytes left in the buffer after `Eof`.
pub fn decode_in_steps(wire: &[u8], step: usize) -> Result<(Vec<u8>, Bytes), ParseError> {
    let mut decoder = ChunkedDecoder::new();
    let mut buf = BytesMut::new();
    let mut body = Vec::new();

    let mut input = wire.chunks(step.max(1));
    loop {
        match decoder.decode(&mut buf)? {
            Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
            Some(PayloadItem::Eof) => return Ok((body, buf.freeze())),
            None => match input.next() {
                Some(slice) => buf.extend_from_slice(slice),
                None => {
                    // fails unless the body was complete
                    decoder.decode_eof(&mut buf)?;
                    return Ok((body, buf.freeze()));
                }
            },
        }
    }
}
