//! Core protocol types shared by the codecs and the header readers.
//!
//! - **Payload items**: [`PayloadItem`] carries either a slice of
//!   body data or the end-of-body marker between the chunked codecs and their
//!   callers.
//!
//! - **Error handling**:
//!   - [`WireError`]: Top-level error type
//!   - [`ParseError`]: Chunked body decoding errors
//!   - [`SendError`]: Chunked body encoding errors
//!   - [`HeaderError`]: Header value tokenizing errors

mod message;
pub use message::PayloadItem;

mod error;
pub use error::HeaderError;
pub use error::ParseError;
pub use error::SendError;
pub use error::WireError;
