//! HTTP/1.1 chunked body codec
//!
//! This module decodes and encodes message bodies framed with chunked transfer-coding. It uses
//! a state machine to consume size lines, extensions, chunk data and trailers byte by byte.
//!
//! # Example
//!
//! ```
//! use micro_wire::codec::{ChunkedDecoder, ChunkedEncoder};
//! use micro_wire::protocol::PayloadItem;
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::{Bytes, BytesMut};
//!
//! let mut encoder = ChunkedEncoder::new();
//! let mut wire = BytesMut::new();
//! encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut wire).unwrap();
//! encoder.encode(PayloadItem::<Bytes>::Eof, &mut wire).unwrap();
//! assert_eq!(&wire[..], b"5\r\nhello\r\n0\r\n\r\n");
//!
//! let mut decoder = ChunkedDecoder::new();
//! let item = decoder.decode(&mut wire).unwrap().unwrap();
//! assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"hello"));
//! assert!(decoder.decode(&mut wire).unwrap().unwrap().is_eof());
//! ```

mod body;

pub use body::{
    ChunkedDecoder, ChunkedEncoder, ChunkedReader, ChunkedWriter, DecoderPhase, EncoderState, DEFAULT_CHUNK_SIZE,
};
