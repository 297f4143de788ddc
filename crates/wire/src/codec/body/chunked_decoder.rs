//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module provides functionality to decode HTTP messages that use chunked transfer encoding
//! as specified in [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! The chunked encoding allows the sender to transmit message data in a series of chunks,
//! indicating the size of each chunk before its data.
//!
//! The byte-level state machine lives in [`ChunkedFraming`] and works over any [`Buf`], so the
//! same rules drive both the [`ChunkedDecoder`] used with `tokio_util` framing and the blocking
//! [`ChunkedReader`](super::ChunkedReader).

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};
use ChunkedState::*;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk indicates the end of the message
///
/// Empty lines in front of a chunk size line are skipped, some servers send an extra CRLF
/// before the first chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkedDecoder {
    framing: ChunkedFraming,
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder instance.
    ///
    /// The decoder starts awaiting the size line of the first chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the coarse decoding phase.
    pub fn phase(&self) -> DecoderPhase {
        self.framing.phase()
    }

    /// Returns true once the terminal chunk and the final CRLF were consumed.
    pub fn is_finished(&self) -> bool {
        self.framing.is_finished()
    }
}

/// Observable phase of a chunked decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderPhase {
    /// Reading a chunk size line, including its extension
    AwaitingSizeLine,
    /// Delivering the data of the current chunk
    ReadingChunkData,
    /// Expecting the CRLF that ends a chunk's data
    AwaitingChunkTrailerCrlf,
    /// Terminal chunk seen, skipping trailers up to the final empty line
    AwaitingFinalCrlf,
    /// The reader was closed before the body was exhausted
    Closed,
    /// The whole body was decoded
    Exhausted,
    /// A framing error was detected, the stream position is lost
    Failed,
}

impl DecoderPhase {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            DecoderPhase::AwaitingSizeLine => "reading a chunk size line",
            DecoderPhase::ReadingChunkData => "reading chunk data",
            DecoderPhase::AwaitingChunkTrailerCrlf => "reading the CRLF after chunk data",
            DecoderPhase::AwaitingFinalCrlf => "reading the last chunk trailer",
            DecoderPhase::Closed => "closed",
            DecoderPhase::Exhausted => "exhausted",
            DecoderPhase::Failed => "failed",
        }
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk is processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framing.advance(src)? {
            Progress::Data(len) => {
                let bytes = src.split_to(len).freeze();
                self.framing.consume_data(len);
                trace!(len = bytes.len(), "read chunked bytes");
                Ok(Some(PayloadItem::Chunk(bytes)))
            }
            Progress::Eof => {
                trace!("finished reading chunked data");
                Ok(Some(PayloadItem::Eof))
            }
            Progress::NeedMore => Ok(None),
        }
    }

    /// Decodes the last bytes of a source that reached its end.
    ///
    /// A source that ends before the terminal chunk is an error rather than a truncated body.
    /// Once the body is finished, `Ok(None)` ends the frame stream.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.framing.is_finished() {
            return Ok(None);
        }

        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                let phase = self.framing.phase();
                debug!(?phase, "source ended inside a chunked body");
                Err(ParseError::unexpected_eof(phase.describe()))
            }
        }
    }
}

/// Result of advancing the framing state machine over a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// `n` bytes of chunk data are available at the front of the source
    Data(usize),
    /// The source ran dry inside framing bytes
    NeedMore,
    /// The terminal chunk and the final CRLF were consumed
    Eof,
}

/// Byte-level chunked framing state machine.
///
/// [`advance`](Self::advance) consumes framing bytes (size lines, extensions, CRLFs, trailers)
/// and stops in front of chunk data without consuming it: the caller takes up to `n` bytes
/// itself and reports them with [`consume_data`](Self::consume_data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkedFraming {
    state: ChunkedState,
    remaining_size: u64,
}

impl Default for ChunkedFraming {
    fn default() -> Self {
        Self { state: Start, remaining_size: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Expect the first hex digit of a size line, or an empty line
    Start,
    /// Read LF of an empty line in front of the first size line
    StartLf,
    /// Expect the first hex digit of a size line following chunk data
    NextSize,
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read optional trailer fields
    Trailer,
    /// Read LF after trailer
    TrailerLf,
    /// Read final CR
    EndCr,
    /// Read final LF
    EndLf,
    /// Final state after reading last chunk
    End,
    /// A framing error happened, nothing more can be decoded
    Invalid,
}

impl ChunkedFraming {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state == End
    }

    pub(crate) fn phase(&self) -> DecoderPhase {
        match self.state {
            Start | StartLf | NextSize | Size | SizeLws | Extension | SizeLf => DecoderPhase::AwaitingSizeLine,
            Body => DecoderPhase::ReadingChunkData,
            BodyCr | BodyLf => DecoderPhase::AwaitingChunkTrailerCrlf,
            Trailer | TrailerLf | EndCr | EndLf => DecoderPhase::AwaitingFinalCrlf,
            End => DecoderPhase::Exhausted,
            Invalid => DecoderPhase::Failed,
        }
    }

    /// Consumes framing bytes from `src` until chunk data is available at its front, the body
    /// ends or `src` runs dry.
    pub(crate) fn advance<B: Buf>(&mut self, src: &mut B) -> Result<Progress, ParseError> {
        loop {
            match self.state {
                End => return Ok(Progress::Eof),
                Invalid => {
                    return Err(ParseError::invalid_framing("chunked body is unreadable after a framing error"));
                }
                Body => {
                    if !src.has_remaining() {
                        return Ok(Progress::NeedMore);
                    }
                    // cap remaining bytes at the max capacity of usize
                    let remaining = usize::try_from(self.remaining_size).unwrap_or(usize::MAX);
                    return Ok(Progress::Data(remaining.min(src.remaining())));
                }
                _ => {}
            }

            if !src.has_remaining() {
                return Ok(Progress::NeedMore);
            }

            let byte = src.get_u8();
            self.state = match self.state.step(byte, &mut self.remaining_size) {
                Ok(state) => state,
                Err(e) => {
                    debug!(cause = %e, "invalid chunked framing");
                    self.state = Invalid;
                    return Err(e);
                }
            };
        }
    }

    /// Records that `len` bytes of chunk data were handed to the caller.
    pub(crate) fn consume_data(&mut self, len: usize) {
        debug_assert!(self.state == Body && len as u64 <= self.remaining_size);
        self.remaining_size -= len as u64;
        if self.remaining_size == 0 {
            self.state = BodyCr;
        }
    }
}

impl ChunkedState {
    /// Processes the next framing byte in the chunked decoding state machine.
    ///
    /// # Returns
    /// The next state in the decoding process or an error if invalid encoding is detected
    fn step(self, byte: u8, remaining_size: &mut u64) -> Result<ChunkedState, ParseError> {
        match self {
            Start => ChunkedState::read_start(byte, remaining_size),
            StartLf => ChunkedState::read_start_lf(byte),
            NextSize => ChunkedState::read_next_size(byte, remaining_size),
            Size => ChunkedState::read_size(byte, remaining_size),
            SizeLws => ChunkedState::read_size_lws(byte),
            Extension => ChunkedState::read_extension(byte),
            SizeLf => ChunkedState::read_size_lf(byte, *remaining_size),
            BodyCr => ChunkedState::read_body_cr(byte),
            BodyLf => ChunkedState::read_body_lf(byte),
            Trailer => Ok(ChunkedState::read_trailer(byte)),
            TrailerLf => ChunkedState::read_trailer_lf(byte),
            EndCr => Ok(ChunkedState::read_end_cr(byte)),
            EndLf => ChunkedState::read_end_lf(byte),
            // data, end and invalid states never consume framing bytes
            Body | End | Invalid => Ok(self),
        }
    }

    /// Reads the first byte of a size line.
    ///
    /// # State Transitions
    /// - On hex digit: Move to Size state with the digit as current size
    /// - On CR: Move to StartLf state, the line is an empty line to skip
    /// - On anything else: Return error, a size line needs at least one digit
    fn read_start(byte: u8, size_per_chunk: &mut u64) -> Result<ChunkedState, ParseError> {
        match hex_value(byte) {
            Some(digit) => {
                *size_per_chunk = u64::from(digit);
                Ok(Size)
            }
            None if byte == b'\r' => Ok(StartLf),
            None => Err(ParseError::invalid_chunk_size(format!("expected hex digit, found {:?}", char::from(byte)))),
        }
    }

    /// Reads the first byte of a size line after chunk data, empty lines are not allowed here.
    fn read_next_size(byte: u8, size_per_chunk: &mut u64) -> Result<ChunkedState, ParseError> {
        match hex_value(byte) {
            Some(digit) => {
                *size_per_chunk = u64::from(digit);
                Ok(Size)
            }
            None => Err(ParseError::invalid_chunk_size(format!("expected hex digit, found {:?}", char::from(byte)))),
        }
    }

    /// Validates the LF byte of an empty line in front of the first size line.
    fn read_start_lf(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' => Ok(Start),
            _ => Err(ParseError::invalid_chunk_size("CR not followed by LF")),
        }
    }

    /// Reads and parses the chunk size in hexadecimal format.
    ///
    /// # State Transitions
    /// - On hex digit (0-9, a-f, A-F): Stay in Size state to read more digits
    /// - On whitespace (tab/space): Transition to SizeLws state
    /// - On semicolon: Transition to Extension state to handle chunk extensions
    /// - On CR: Transition to SizeLf state to finish size line
    /// - On invalid character: Return error
    fn read_size(byte: u8, size_per_chunk: &mut u64) -> Result<ChunkedState, ParseError> {
        if let Some(digit) = hex_value(byte) {
            *size_per_chunk = size_per_chunk
                .checked_mul(16)
                .and_then(|size| size.checked_add(u64::from(digit)))
                .ok_or(ParseError::ChunkSizeOverflow)?;
            return Ok(Size);
        }

        match byte {
            b'\t' | b' ' => Ok(SizeLws),
            b';' => Ok(Extension),
            b'\r' => Ok(SizeLf),
            _ => Err(ParseError::invalid_chunk_size(format!("invalid size character {:?}", char::from(byte)))),
        }
    }

    /// Processes linear whitespace (LWS) after the chunk size.
    ///
    /// Only tabs and spaces may follow the size, then an extension or the end of the line.
    fn read_size_lws(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Ok(SizeLws),
            b';' => Ok(Extension),
            b'\r' => Ok(SizeLf),
            _ => Err(ParseError::invalid_chunk_size("invalid chunk size linear white space")),
        }
    }

    /// Skips chunk extensions, they end at the next CRLF.
    ///
    /// A plain LF inside an extension is rejected.
    fn read_extension(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\r' => Ok(SizeLf),
            b'\n' => Err(ParseError::invalid_chunk_size("chunk extension contains newline")),
            _ => Ok(Extension),
        }
    }

    /// Validates the LF byte after the chunk size line.
    ///
    /// # State Transitions
    /// - On LF with size 0: Move to EndCr state for trailers and the final CRLF
    /// - On LF with size > 0: Move to Body state to read chunk data
    /// - On any other byte: Return error
    fn read_size_lf(byte: u8, size_per_chunk: u64) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' if size_per_chunk == 0 => Ok(EndCr),
            b'\n' => Ok(Body),
            _ => Err(ParseError::invalid_chunk_size("invalid chunk size LF")),
        }
    }

    /// Validates the CR byte after chunk data.
    fn read_body_cr(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\r' => Ok(BodyLf),
            _ => Err(ParseError::invalid_framing("missing CR after chunk data")),
        }
    }

    /// Validates the LF byte after chunk data, then goes back to reading a size line.
    fn read_body_lf(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' => Ok(NextSize),
            _ => Err(ParseError::invalid_framing("missing LF after chunk data")),
        }
    }

    /// Skips a trailer field after the last chunk, trailers are not exposed.
    fn read_trailer(byte: u8) -> ChunkedState {
        match byte {
            b'\r' => TrailerLf,
            _ => Trailer,
        }
    }

    /// Validates the LF byte after a trailer field.
    fn read_trailer_lf(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' => Ok(EndCr),
            _ => Err(ParseError::invalid_framing("invalid trailer end LF")),
        }
    }

    /// Reads the first byte after the last chunk size line or a trailer field.
    ///
    /// # State Transitions
    /// - On CR: Move to EndLf state
    /// - On any other byte: Move to Trailer state to skip a trailer field
    fn read_end_cr(byte: u8) -> ChunkedState {
        match byte {
            b'\r' => EndLf,
            _ => Trailer,
        }
    }

    /// Validates the final LF byte of the chunked message.
    fn read_end_lf(byte: u8) -> Result<ChunkedState, ParseError> {
        match byte {
            b'\n' => Ok(End),
            _ => Err(ParseError::invalid_framing("invalid chunk end LF")),
        }
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte + 10 - b'a'),
        b'A'..=b'F' => Some(byte + 10 - b'A'),
        _ => None,
    }
}
