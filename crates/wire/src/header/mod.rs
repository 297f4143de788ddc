//! HTTP/1.1 header value tokenizer
//!
//! Header values are read through a [`HeaderReader`] cursor. The cursor splits a value into
//! [`HeaderToken`]s and offers the reading primitives the value readers are built from:
//!
//! - [`read_string_values`]: plain comma separated values
//! - [`PreferenceReader`]: quality weighted `Accept-*` preferences, written back with
//!   [`PreferenceWriter`]
//! - [`CookieReader`]: `Cookie` request headers
//!
//! # Example
//!
//! ```
//! use micro_wire::header::{read_preferences, PreferenceKind, PreferenceWriter};
//!
//! let preferences = read_preferences(PreferenceKind::Encoding, Some("gzip;q=0.8, br")).unwrap();
//! assert_eq!(preferences[0].metadata(), "gzip");
//! assert_eq!(PreferenceWriter::write(&preferences), "gzip;q=0.8, br");
//! ```

pub mod chars;
mod cookie;
mod header_reader;
mod preference;

pub use cookie::{read_cookies, Cookie, CookieReader};
pub use header_reader::{read_string_values, HeaderReader, HeaderToken, Parameter, Tokens, ValueReader};
pub use preference::{read_preferences, read_quality, Preference, PreferenceKind, PreferenceReader, PreferenceWriter};
