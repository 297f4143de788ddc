use std::io;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("chunked decode error: {source}")]
    Decode {
        #[from]
        source: ParseError,
    },

    #[error("chunked encode error: {source}")]
    Encode {
        #[from]
        source: SendError,
    },

    #[error("header error: {source}")]
    Header {
        #[from]
        source: HeaderError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid chunk size line: {reason}")]
    InvalidChunkSize { reason: String },

    #[error("chunk size overflows u64")]
    ChunkSizeOverflow,

    #[error("invalid chunked framing: {reason}")]
    InvalidFraming { reason: String },

    #[error("chunked body ended early while {phase}")]
    UnexpectedEof { phase: &'static str },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_chunk_size<S: ToString>(str: S) -> Self {
        Self::InvalidChunkSize { reason: str.to_string() }
    }

    pub fn invalid_framing<S: ToString>(str: S) -> Self {
        Self::InvalidFraming { reason: str.to_string() }
    }

    pub fn unexpected_eof(phase: &'static str) -> Self {
        Self::UnexpectedEof { phase }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<ParseError> for io::Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Io { source } => source,
            e @ ParseError::UnexpectedEof { .. } => io::Error::new(ErrorKind::UnexpectedEof, e),
            e => io::Error::new(ErrorKind::InvalidData, e),
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("chunked stream already closed")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<SendError> for io::Error {
    fn from(e: SendError) -> Self {
        match e {
            SendError::Io { source } => source,
            e @ SendError::Closed => io::Error::new(ErrorKind::BrokenPipe, e),
        }
    }
}

/// Errors raised while tokenizing a header value.
///
/// Every variant records the byte offset in the header value where reading
/// stopped, so callers can report the faulty part of the value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("unterminated quoted string starting at {position}")]
    UnterminatedQuotedString { position: usize },

    #[error("unterminated comment starting at {position}")]
    UnterminatedComment { position: usize },

    #[error("unexpected character {found:?} at {position}: {reason}")]
    InvalidCharacter { found: char, position: usize, reason: &'static str },

    #[error("header value ended at {position}: {reason}")]
    UnexpectedEnd { position: usize, reason: &'static str },

    #[error("empty {what} at {position}")]
    EmptyName { what: &'static str, position: usize },

    #[error("empty {what} value at {position}")]
    EmptyValue { what: &'static str, position: usize },

    #[error("invalid quality value {value:?}, must be between 0 and 1")]
    InvalidQuality { value: String },

    #[error("invalid cookie version {value:?}")]
    InvalidCookieVersion { value: String },

    #[error("reading the header value made no progress at {position}")]
    InfiniteLoop { position: usize },
}

impl HeaderError {
    pub fn invalid_character(found: char, position: usize, reason: &'static str) -> Self {
        Self::InvalidCharacter { found, position, reason }
    }

    pub fn unexpected_end(position: usize, reason: &'static str) -> Self {
        Self::UnexpectedEnd { position, reason }
    }

    pub fn empty_name(what: &'static str, position: usize) -> Self {
        Self::EmptyName { what, position }
    }

    pub fn empty_value(what: &'static str, position: usize) -> Self {
        Self::EmptyValue { what, position }
    }

    pub fn invalid_quality<S: ToString>(value: S) -> Self {
        Self::InvalidQuality { value: value.to_string() }
    }

    pub fn invalid_cookie_version<S: ToString>(value: S) -> Self {
        Self::InvalidCookieVersion { value: value.to_string() }
    }

    /// Byte offset in the header value at which the error was detected, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::UnterminatedQuotedString { position }
            | Self::UnterminatedComment { position }
            | Self::InvalidCharacter { position, .. }
            | Self::UnexpectedEnd { position, .. }
            | Self::EmptyName { position, .. }
            | Self::EmptyValue { position, .. }
            | Self::InfiniteLoop { position } => Some(*position),
            Self::InvalidQuality { .. } | Self::InvalidCookieVersion { .. } => None,
        }
    }
}
