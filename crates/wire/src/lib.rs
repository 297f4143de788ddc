//! HTTP/1.1 wire level building blocks
//!
//! This crate provides the two byte level cores an HTTP/1.1 framework is built on: the chunked
//! transfer-coding of message bodies, and the tokenizing of header values. Neither part owns a
//! socket; they work on buffers, `BufRead` sources and `Write` sinks handed in by the caller.
//!
//! # Features
//!
//! - Chunked body decoding and encoding as `tokio_util` codecs
//! - Blocking `Read`/`Write` adapters sharing the same framing state machine
//! - Size lines with extensions, trailers, leading blank lines and overflow checks
//! - Header value tokens: values, quoted strings, comments, separators
//! - Quality weighted preferences (`Accept`, `Accept-Encoding`, ...) and cookies
//! - Malformed input always ends in an error carrying its position
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use micro_wire::codec::{ChunkedReader, ChunkedWriter};
//!
//! let mut writer = ChunkedWriter::with_chunk_size(4, Vec::new());
//! writer.write_all(b"hello world").unwrap();
//! writer.close().unwrap();
//! let wire = writer.into_inner();
//! assert_eq!(&wire[..], b"4\r\nhell\r\n4\r\no wo\r\n3\r\nrld\r\n0\r\n\r\n");
//!
//! let mut body = String::new();
//! ChunkedReader::new(&wire[..]).read_to_string(&mut body).unwrap();
//! assert_eq!(body, "hello world");
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: chunked decoder and encoder, sans-io and blocking
//! - [`header`]: header value cursor, tokens and value readers
//! - [`protocol`]: payload items and error types
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: malformed or truncated chunked bodies
//! - [`protocol::SendError`]: writing to a closed chunked body
//! - [`protocol::HeaderError`]: malformed header values
//! - [`protocol::WireError`]: any of the above
//!
//! The body errors convert into [`std::io::Error`], so the blocking adapters report them
//! through the standard `Read` and `Write` traits.

pub mod codec;
pub mod header;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
