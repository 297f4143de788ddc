//! Character classes of the HTTP/1.1 header grammar (RFC 2616 section 2.2).
//!
//! All predicates work on single bytes. Bytes above 0x7F (obsolete text, or parts of UTF-8
//! sequences in a `&str`) count as text but never as token characters.

/// `CR`
#[inline]
pub fn is_carriage_return(byte: u8) -> bool {
    byte == b'\r'
}

/// `LF`
#[inline]
pub fn is_line_feed(byte: u8) -> bool {
    byte == b'\n'
}

/// `SP`
#[inline]
pub fn is_space(byte: u8) -> bool {
    byte == b' '
}

/// `HT`
#[inline]
pub fn is_horizontal_tab(byte: u8) -> bool {
    byte == b'\t'
}

/// Linear white space: SP, HT, CR or LF.
///
/// Skipping runs of these bytes also skips obsolete line folding (CRLF followed by SP or HT).
#[inline]
pub fn is_linear_white_space(byte: u8) -> bool {
    is_space(byte) || is_horizontal_tab(byte) || is_carriage_return(byte) || is_line_feed(byte)
}

#[inline]
pub fn is_comma(byte: u8) -> bool {
    byte == b','
}

#[inline]
pub fn is_semicolon(byte: u8) -> bool {
    byte == b';'
}

#[inline]
pub fn is_double_quote(byte: u8) -> bool {
    byte == b'"'
}

/// The backslash starting a quoted pair.
#[inline]
pub fn is_quote_character(byte: u8) -> bool {
    byte == b'\\'
}

/// `CTL`: 0-31 and DEL.
#[inline]
pub fn is_control_char(byte: u8) -> bool {
    byte <= 31 || byte == 127
}

/// Any byte that is not a control character.
#[inline]
pub fn is_text(byte: u8) -> bool {
    !is_control_char(byte)
}

/// Text allowed unescaped inside a quoted string, linear white space included.
#[inline]
pub fn is_quoted_text(byte: u8) -> bool {
    (is_text(byte) || is_linear_white_space(byte)) && !is_double_quote(byte) && !is_quote_character(byte)
}

/// Text allowed unescaped inside a comment, linear white space included.
#[inline]
pub fn is_comment_text(byte: u8) -> bool {
    (is_text(byte) || is_linear_white_space(byte)) && byte != b'(' && byte != b')' && !is_quote_character(byte)
}

#[inline]
pub fn is_separator(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
            | b' '
            | b'\t'
    )
}

/// `token` character: ASCII, neither a control character nor a separator.
#[inline]
pub fn is_token_char(byte: u8) -> bool {
    byte.is_ascii() && !is_control_char(byte) && !is_separator(byte)
}

/// Returns true if `value` is a non-empty `token`.
pub fn is_token(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(is_token_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token() {
        assert!(is_token("Accept-Encoding"));
        assert!(is_token("gzip"));
        assert!(is_token("!#$%&'*+-.^_`|~"));
        assert!(!is_token(""));
        assert!(!is_token("text/html"));
        assert!(!is_token("a b"));
        assert!(!is_token("a\r"));
        assert!(!is_token("caf\u{e9}"));
    }

    #[test]
    fn test_linear_white_space() {
        for byte in [b' ', b'\t', b'\r', b'\n'] {
            assert!(is_linear_white_space(byte));
        }
        assert!(!is_linear_white_space(b','));
    }

    #[test]
    fn test_quoted_and_comment_text() {
        assert!(is_quoted_text(b'a'));
        assert!(is_quoted_text(b'\t'));
        assert!(is_quoted_text(b'('));
        assert!(!is_quoted_text(b'"'));
        assert!(!is_quoted_text(0x07));

        assert!(is_comment_text(b'"'));
        assert!(!is_comment_text(b'('));
        assert!(!is_comment_text(b')'));
    }
}
