//! Cursor based reader over a single header value.
//!
//! [`HeaderReader`] owns one read position into the value and offers the primitives the
//! higher-level readers are built from: skipping white space and separators, reading tokens,
//! quoted strings, comments and parameters. [`ValueReader`] runs the multi-value loop shared
//! by all comma separated headers.
//!
//! Malformed input (an unterminated quoted string or comment, a character that does not fit
//! the grammar) stops reading with a [`HeaderError`] carrying the byte position; readers never
//! loop forever and never return a silently truncated list.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::ensure;
use crate::header::chars::{
    is_comma, is_comment_text, is_double_quote, is_linear_white_space, is_quote_character, is_quoted_text,
    is_semicolon, is_space, is_token_char,
};
use crate::protocol::HeaderError;

/// A cursor over one header value, already separated from the header name.
#[derive(Debug, Clone)]
pub struct HeaderReader<'a> {
    header: &'a str,
    index: usize,
    mark: usize,
}

/// A syntactic unit of a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderToken<'a> {
    /// A run of characters up to white space, a separator, a quote or a comment
    Value(&'a str),
    /// The content of a quoted string, quoted pairs unescaped
    QuotedString(Cow<'a, str>),
    /// The content of a comment without its outer parentheses
    Comment(Cow<'a, str>),
    /// One of `,` `;` `=`
    Separator(char),
}

impl HeaderToken<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderToken::Value(value) => *value,
            HeaderToken::QuotedString(value) | HeaderToken::Comment(value) => value.as_ref(),
            HeaderToken::Separator(',') => ",",
            HeaderToken::Separator(';') => ";",
            HeaderToken::Separator(_) => "=",
        }
    }

    #[inline]
    pub fn is_separator(&self) -> bool {
        matches!(self, HeaderToken::Separator(_))
    }
}

/// A `name[=value]` pair read from a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: Option<String>,
}

impl Parameter {
    pub fn new<N: Into<String>>(name: N, value: Option<String>) -> Self {
        Self { name: name.into(), value }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match &self.value {
            Some(value) => {
                f.write_str("=")?;
                write_value(f, value)
            }
            None => Ok(()),
        }
    }
}

/// Writes `value` as a token when possible, otherwise as a quoted string.
pub(crate) fn write_value<W: fmt::Write>(out: &mut W, value: &str) -> fmt::Result {
    if crate::header::chars::is_token(value) {
        return out.write_str(value);
    }

    out.write_char('"')?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

impl<'a> HeaderReader<'a> {
    pub fn new(header: &'a str) -> Self {
        Self { header, index: 0, mark: 0 }
    }

    /// The whole header value.
    pub fn header(&self) -> &'a str {
        self.header
    }

    /// Current byte offset into the header value.
    pub fn position(&self) -> usize {
        self.index
    }

    /// The part of the value not read yet.
    pub fn remaining(&self) -> &'a str {
        &self.header[self.index..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.header.len()
    }

    /// Returns the next byte without moving the cursor.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.header.as_bytes().get(self.index).copied()
    }

    /// Returns the next byte and moves past it.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        let next = self.peek()?;
        self.index += 1;
        Some(next)
    }

    /// Moves the cursor back by one byte.
    #[inline]
    pub fn unread(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Remembers the current position for a later [`reset`](Self::reset).
    pub fn mark(&mut self) {
        self.mark = self.index;
    }

    /// Moves the cursor back to the last [`mark`](Self::mark).
    pub fn reset(&mut self) {
        self.index = self.mark;
    }

    /// Skips linear white space, folded line breaks included.
    ///
    /// Returns true if anything was skipped.
    pub fn skip_spaces(&mut self) -> bool {
        let start = self.index;
        while self.peek().is_some_and(is_linear_white_space) {
            self.index += 1;
        }
        self.index != start
    }

    /// Skips a value separator (comma) and the white space around it.
    ///
    /// Returns true if a separator was skipped.
    pub fn skip_value_separator(&mut self) -> bool {
        self.skip_separator(is_comma)
    }

    /// Skips a parameter separator (semicolon) and the white space around it.
    ///
    /// Returns true if a separator was skipped.
    pub fn skip_parameter_separator(&mut self) -> bool {
        self.skip_separator(is_semicolon)
    }

    fn skip_separator(&mut self, separator: fn(u8) -> bool) -> bool {
        self.skip_spaces();
        if self.peek().is_some_and(separator) {
            self.index += 1;
            self.skip_spaces();
            true
        } else {
            false
        }
    }

    /// Reads a possibly empty run of token characters.
    pub fn read_token(&mut self) -> &'a str {
        self.read_while(is_token_char)
    }

    /// Reads a possibly empty run of ASCII digits.
    pub fn read_digits(&mut self) -> &'a str {
        self.read_while(|byte| byte.is_ascii_digit())
    }

    fn read_while(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let start = self.index;
        while self.peek().is_some_and(&accept) {
            self.index += 1;
        }
        &self.header[start..self.index]
    }

    /// Reads the next value of a multi-value header, up to the next comma.
    ///
    /// Leading and trailing white space is dropped; `None` when the value is empty. The comma
    /// itself is left for [`skip_value_separator`](Self::skip_value_separator).
    pub fn read_raw_value(&mut self) -> Option<&'a str> {
        self.skip_spaces();
        let value = self.read_while(|byte| !is_comma(byte)).trim_end_matches([' ', '\t', '\r', '\n']);
        (!value.is_empty()).then_some(value)
    }

    /// Reads text up to the next space or comma, `None` when nothing was read.
    pub fn read_raw_text(&mut self) -> Option<&'a str> {
        let value = self.read_while(|byte| !is_space(byte) && !is_comma(byte));
        (!value.is_empty()).then_some(value)
    }

    /// Reads a quoted string, the cursor must be on the opening double quote.
    ///
    /// Returns the content with quoted pairs unescaped, borrowed when there was nothing to
    /// unescape.
    pub fn read_quoted_string(&mut self) -> Result<Cow<'a, str>, HeaderError> {
        let start = self.index;
        match self.peek() {
            Some(byte) if is_double_quote(byte) => self.index += 1,
            other => return Err(self.unexpected(other, "a quoted string must start with a double quote")),
        }

        let mut unescaped: Option<Vec<u8>> = None;
        let content_start = self.index;
        loop {
            match self.read() {
                Some(byte) if is_double_quote(byte) => {
                    return Ok(match unescaped {
                        Some(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
                        None => Cow::Borrowed(&self.header[content_start..self.index - 1]),
                    });
                }
                Some(byte) if is_quote_character(byte) => {
                    let escaped = self.read().ok_or(HeaderError::UnterminatedQuotedString { position: start })?;
                    unescaped
                        .get_or_insert_with(|| self.header.as_bytes()[content_start..self.index - 2].to_vec())
                        .push(escaped);
                }
                Some(byte) if is_quoted_text(byte) => {
                    if let Some(bytes) = unescaped.as_mut() {
                        bytes.push(byte);
                    }
                }
                Some(byte) => {
                    self.unread();
                    return Err(self.unexpected(Some(byte), "invalid character in quoted string"));
                }
                None => return Err(HeaderError::UnterminatedQuotedString { position: start }),
            }
        }
    }

    /// Reads a comment, the cursor must be on the opening parenthesis.
    ///
    /// Returns the content without the outer parentheses; nested comments are kept verbatim
    /// with their parentheses, quoted pairs are unescaped.
    pub fn read_comment(&mut self) -> Result<Cow<'a, str>, HeaderError> {
        let start = self.index;
        match self.peek() {
            Some(b'(') => self.index += 1,
            other => return Err(self.unexpected(other, "a comment must start with a parenthesis")),
        }

        let mut unescaped: Option<Vec<u8>> = None;
        let content_start = self.index;
        let mut depth = 1_usize;
        loop {
            let byte = self.read().ok_or(HeaderError::UnterminatedComment { position: start })?;
            match byte {
                b')' if depth == 1 => {
                    return Ok(match unescaped {
                        Some(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
                        None => Cow::Borrowed(&self.header[content_start..self.index - 1]),
                    });
                }
                b'(' | b')' => {
                    depth = if byte == b'(' { depth + 1 } else { depth - 1 };
                    if let Some(bytes) = unescaped.as_mut() {
                        bytes.push(byte);
                    }
                }
                _ if is_quote_character(byte) => {
                    let escaped = self.read().ok_or(HeaderError::UnterminatedComment { position: start })?;
                    unescaped
                        .get_or_insert_with(|| self.header.as_bytes()[content_start..self.index - 2].to_vec())
                        .push(escaped);
                }
                _ if is_comment_text(byte) => {
                    if let Some(bytes) = unescaped.as_mut() {
                        bytes.push(byte);
                    }
                }
                _ => {
                    self.unread();
                    return Err(self.unexpected(Some(byte), "invalid character in comment"));
                }
            }
        }
    }

    /// Reads a parameter value, either a token or a quoted string, after optional white space.
    ///
    /// Returns `None` when neither starts at the cursor.
    pub fn read_actual_value(&mut self) -> Result<Option<Cow<'a, str>>, HeaderError> {
        self.skip_spaces();
        match self.peek() {
            Some(byte) if is_double_quote(byte) => self.read_quoted_string().map(Some),
            Some(byte) if is_token_char(byte) => Ok(Some(Cow::Borrowed(self.read_token()))),
            _ => Ok(None),
        }
    }

    /// Reads a `name[=value]` parameter.
    pub fn read_parameter(&mut self) -> Result<Parameter, HeaderError> {
        let position = self.index;
        let name = self.read_token();
        ensure!(!name.is_empty(), HeaderError::empty_name("parameter name", position));

        if self.peek() == Some(b'=') {
            self.index += 1;
            let value = self.read_actual_value()?;
            Ok(Parameter::new(name, value.map(Cow::into_owned)))
        } else {
            Ok(Parameter::new(name, None))
        }
    }

    /// Reads the next syntactic unit, `None` once the value is exhausted.
    ///
    /// Runs of linear white space (folded line breaks included) are skipped and never returned.
    pub fn next_token(&mut self) -> Result<Option<HeaderToken<'a>>, HeaderError> {
        self.skip_spaces();
        let Some(next) = self.peek() else {
            return Ok(None);
        };

        let token = match next {
            b'"' => HeaderToken::QuotedString(self.read_quoted_string()?),
            b'(' => HeaderToken::Comment(self.read_comment()?),
            b',' | b';' | b'=' => {
                self.index += 1;
                HeaderToken::Separator(char::from(next))
            }
            _ => HeaderToken::Value(self.read_while(|byte| !is_value_delimiter(byte))),
        };
        Ok(Some(token))
    }

    /// Iterates over the remaining tokens, stopping after the first error.
    pub fn tokens(&mut self) -> Tokens<'_, 'a> {
        Tokens { reader: self, failed: false }
    }

    fn unexpected(&self, found: Option<u8>, reason: &'static str) -> HeaderError {
        match found {
            Some(byte) => HeaderError::invalid_character(char::from(byte), self.index, reason),
            None => HeaderError::unexpected_end(self.index, reason),
        }
    }
}

fn is_value_delimiter(byte: u8) -> bool {
    is_linear_white_space(byte) || matches!(byte, b',' | b';' | b'=' | b'"' | b'(')
}

/// Iterator over the tokens of a header value, see [`HeaderReader::next_token`].
#[derive(Debug)]
pub struct Tokens<'r, 'a> {
    reader: &'r mut HeaderReader<'a>,
    failed: bool,
}

impl<'a> Iterator for Tokens<'_, 'a> {
    type Item = Result<HeaderToken<'a>, HeaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// A reader of the successive values of a comma separated header.
///
/// Implementors provide [`read_value`](Self::read_value); [`read_values`](Self::read_values)
/// drives it across the whole header.
pub trait ValueReader<'a> {
    type Value;

    /// The cursor the values are read from.
    fn cursor(&mut self) -> &mut HeaderReader<'a>;

    /// Reads the value at the cursor, `None` for an empty value.
    fn read_value(&mut self) -> Result<Option<Self::Value>, HeaderError>;

    /// Indicates if `value` should be added to the values read so far.
    fn can_add(&self, value: &Self::Value, values: &[Self::Value]) -> bool {
        let _ = (value, values);
        true
    }

    /// Reads every value of the header.
    fn read_values(&mut self) -> Result<Vec<Self::Value>, HeaderError> {
        let mut values = Vec::new();
        self.cursor().skip_spaces();

        while !self.cursor().is_exhausted() {
            let position = self.cursor().position();

            match self.read_value() {
                Ok(Some(value)) if self.can_add(&value, &values) => values.push(value),
                Ok(_) => {}
                Err(e) => {
                    debug!(cause = %e, header = self.cursor().header(), "unable to read a header value");
                    return Err(e);
                }
            }

            self.cursor().skip_value_separator();
            ensure!(self.cursor().position() != position, HeaderError::InfiniteLoop { position });
        }

        Ok(values)
    }
}

/// Plain comma separated values, duplicates dropped.
impl<'a> ValueReader<'a> for HeaderReader<'a> {
    type Value = &'a str;

    fn cursor(&mut self) -> &mut HeaderReader<'a> {
        self
    }

    fn read_value(&mut self) -> Result<Option<&'a str>, HeaderError> {
        Ok(self.read_raw_value())
    }

    fn can_add(&self, value: &&'a str, values: &[&'a str]) -> bool {
        !values.contains(value)
    }
}

/// Splits a comma separated header value into its trimmed, de-duplicated values.
pub fn read_string_values(header: &str) -> Result<Vec<&str>, HeaderError> {
    HeaderReader::new(header).read_values()
}
