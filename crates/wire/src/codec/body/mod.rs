//! HTTP/1.1 chunked transfer-coding.
//!
//! # Components
//!
//! ## Sans-io codecs
//! - [`ChunkedDecoder`]: `tokio_util` decoder turning chunked framing into payload items
//! - [`ChunkedEncoder`]: `tokio_util` encoder framing payload items as chunks
//!
//! ## Blocking streams
//! - [`ChunkedReader`]: reads a chunked body from a [`BufRead`](std::io::BufRead) source
//! - [`ChunkedWriter`]: writes a chunked body to a [`Write`](std::io::Write) sink
//!
//! Both layers share one framing state machine, so a body decodes identically whether it
//! arrives through `FramedRead` or a blocking socket.

mod chunked_decoder;
mod chunked_encoder;
mod chunked_reader;
mod chunked_writer;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_decoder::DecoderPhase;
pub use chunked_encoder::ChunkedEncoder;
pub use chunked_reader::ChunkedReader;
pub use chunked_writer::{ChunkedWriter, EncoderState, DEFAULT_CHUNK_SIZE};
