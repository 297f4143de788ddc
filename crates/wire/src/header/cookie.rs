//! `Cookie` request header reader, Netscape (version 0) and RFC 2109 syntax.

use std::borrow::Cow;
use std::fmt;

use http::header::COOKIE;
use http::HeaderMap;
use tracing::trace;

use crate::ensure;
use crate::header::chars::is_double_quote;
use crate::header::header_reader::{write_value, HeaderReader, ValueReader};
use crate::protocol::HeaderError;

const LWS: [char; 4] = [' ', '\t', '\r', '\n'];

/// A cookie sent back by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    pub version: u32,
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(version: u32, name: N, value: V) -> Self {
        Self { version, name: name.into(), value: value.into(), path: None, domain: None }
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        f.write_str("=")?;
        if self.version == 0 {
            f.write_str(&self.value)?;
        } else {
            write_value(f, &self.value)?;
        }
        if let Some(path) = &self.path {
            f.write_str("; $Path=")?;
            write_value(f, path)?;
        }
        if let Some(domain) = &self.domain {
            f.write_str("; $Domain=")?;
            write_value(f, domain)?;
        }
        Ok(())
    }
}

/// Reads the cookies of one `Cookie` header value.
///
/// A leading `$Version` pair sets the version of every cookie in the value. `$Path` and
/// `$Domain` pairs apply to the cookie right before them, other `$` pairs are skipped.
#[derive(Debug, Clone)]
pub struct CookieReader<'a> {
    reader: HeaderReader<'a>,
    version: Option<u32>,
}

impl<'a> CookieReader<'a> {
    pub fn new(header: &'a str) -> Self {
        Self { reader: HeaderReader::new(header), version: None }
    }

    /// The version read from `$Version`, 0 when the header has none.
    ///
    /// `None` until the first cookie was read.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    fn is_separator(&self, byte: u8) -> bool {
        byte == b';' || (byte == b',' && self.version.unwrap_or_default() > 0)
    }

    fn read_version(&mut self) -> Result<u32, HeaderError> {
        self.reader.mark();
        let position = self.reader.position();
        match self.read_pair()? {
            Some((name, value)) if name.eq_ignore_ascii_case("$Version") => {
                let Ok(version) = value.parse::<u32>() else {
                    return Err(HeaderError::invalid_cookie_version(value));
                };
                trace!(version, position, "read cookie version");
                self.skip_cookie_separator();
                Ok(version)
            }
            _ => {
                self.reader.reset();
                Ok(0)
            }
        }
    }

    /// Reads one `name[=value]` pair, `None` for an empty one.
    fn read_pair(&mut self) -> Result<Option<(&'a str, Cow<'a, str>)>, HeaderError> {
        self.reader.skip_spaces();
        let position = self.reader.position();
        let name = self.read_text(|reader, byte| byte == b'=' || reader.is_separator(byte));

        if self.reader.peek() != Some(b'=') {
            return Ok((!name.is_empty()).then_some((name, Cow::Borrowed(""))));
        }
        ensure!(!name.is_empty(), HeaderError::empty_name("cookie name", position));
        self.reader.read();
        self.reader.skip_spaces();

        let value = if self.reader.peek().is_some_and(is_double_quote) {
            let value = self.reader.read_quoted_string()?;
            self.reader.skip_spaces();
            if let Some(byte) = self.reader.peek().filter(|&byte| !self.is_separator(byte)) {
                return Err(HeaderError::invalid_character(
                    char::from(byte),
                    self.reader.position(),
                    "text after quoted cookie value",
                ));
            }
            value
        } else {
            Cow::Borrowed(self.read_text(Self::is_separator))
        };
        Ok(Some((name, value)))
    }

    fn read_text(&mut self, stop: impl Fn(&Self, u8) -> bool) -> &'a str {
        let start = self.reader.position();
        while self.reader.peek().is_some_and(|byte| !stop(self, byte)) {
            self.reader.read();
        }
        self.reader.header()[start..self.reader.position()].trim_matches(LWS)
    }

    /// Reads the `$Path` and `$Domain` attributes following a cookie.
    fn read_attributes(&mut self, cookie: &mut Cookie) -> Result<(), HeaderError> {
        loop {
            self.reader.mark();
            self.reader.skip_spaces();
            if self.reader.peek() != Some(b';') {
                self.reader.reset();
                return Ok(());
            }
            self.reader.read();

            match self.read_pair()? {
                Some((name, value)) if name.eq_ignore_ascii_case("$Path") => cookie.path = Some(value.into_owned()),
                Some((name, value)) if name.eq_ignore_ascii_case("$Domain") => {
                    cookie.domain = Some(value.into_owned());
                }
                _ => {
                    self.reader.reset();
                    return Ok(());
                }
            }
        }
    }

    /// Skips a `;` ending a cookie, a `,` is left to the value loop.
    fn skip_cookie_separator(&mut self) {
        self.reader.skip_spaces();
        if self.reader.peek() == Some(b';') {
            self.reader.read();
            self.reader.skip_spaces();
        }
    }
}

impl<'a> ValueReader<'a> for CookieReader<'a> {
    type Value = Cookie;

    fn cursor(&mut self) -> &mut HeaderReader<'a> {
        &mut self.reader
    }

    fn read_value(&mut self) -> Result<Option<Cookie>, HeaderError> {
        let version = match self.version {
            Some(version) => version,
            None => {
                let version = self.read_version()?;
                self.version = Some(version);
                version
            }
        };

        loop {
            let Some((name, value)) = self.read_pair()? else {
                self.skip_cookie_separator();
                return Ok(None);
            };

            if name.starts_with('$') {
                trace!(attribute = name, "skip unknown cookie attribute");
                self.skip_cookie_separator();
                continue;
            }

            let mut cookie = Cookie::new(version, name, value);
            self.read_attributes(&mut cookie)?;
            self.skip_cookie_separator();
            return Ok(Some(cookie));
        }
    }
}

/// Reads the cookies of every `Cookie` header, in order.
///
/// Header values that are not valid UTF-8 are read lossily.
pub fn read_cookies(headers: &HeaderMap) -> Result<Vec<Cookie>, HeaderError> {
    let mut cookies = Vec::new();
    for value in headers.get_all(COOKIE) {
        let header = String::from_utf8_lossy(value.as_bytes());
        cookies.extend(CookieReader::new(header.trim_matches(LWS)).read_values()?);
    }
    Ok(cookies)
}
