//! Quality weighted preference headers: `Accept`, `Accept-Charset`, `Accept-Encoding`,
//! `Accept-Language` and `Accept-Patch`.
//!
//! Each value has the shape `metadata[;param]*[;q=<quality>][;ext]*`. Parameters in front of
//! the quality belong to the metadata (media type parameters such as `level=1`), the ones after
//! it are accept extensions.

use std::fmt;
use std::fmt::Write as _;

use mime::Mime;
use tracing::trace;

use crate::ensure;
use crate::header::chars::{is_comma, is_double_quote, is_linear_white_space, is_text, is_token_char};
use crate::header::header_reader::{HeaderReader, Parameter, ValueReader};
use crate::protocol::HeaderError;

/// Which kind of metadata a preference header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKind {
    CharacterSet,
    Encoding,
    Language,
    MediaType,
    Patch,
}

impl PreferenceKind {
    /// Preferences assumed when the header is absent from the request.
    pub fn default_preferences(self) -> Vec<Preference> {
        match self {
            PreferenceKind::CharacterSet | PreferenceKind::Language => vec![Preference::new("*")],
            PreferenceKind::Encoding => vec![Preference::new("identity")],
            PreferenceKind::MediaType => vec![Preference::new("*/*")],
            PreferenceKind::Patch => Vec::new(),
        }
    }
}

/// One entry of a preference header.
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    metadata: String,
    metadata_params: Vec<Parameter>,
    quality: f32,
    parameters: Vec<Parameter>,
}

impl Preference {
    /// Creates a preference with the default quality of 1.
    pub fn new<S: Into<String>>(metadata: S) -> Self {
        Self::with_quality(metadata, 1.0)
    }

    pub fn with_quality<S: Into<String>>(metadata: S, quality: f32) -> Self {
        Self { metadata: metadata.into(), metadata_params: Vec::new(), quality, parameters: Vec::new() }
    }

    /// The metadata name, e.g. `text/html`, `gzip` or `en-us`.
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// Parameters attached to the metadata, read in front of the quality.
    pub fn metadata_params(&self) -> &[Parameter] {
        &self.metadata_params
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Accept extensions, read after the quality.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parses the metadata and its parameters as a media type.
    pub fn media_type(&self) -> Option<Mime> {
        let mut media_type = self.metadata.clone();
        for param in &self.metadata_params {
            write!(media_type, ";{param}").ok()?;
        }
        media_type.parse().ok()
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metadata)?;
        for param in &self.metadata_params {
            write!(f, ";{param}")?;
        }
        if self.quality < 1.0 {
            write!(f, ";q={}", PreferenceWriter::format_quality(self.quality))?;
        }
        for param in &self.parameters {
            write!(f, ";{param}")?;
        }
        Ok(())
    }
}

/// Parses a quality value: `0` or `1` followed by at most three decimals, never above 1.
pub fn read_quality(quality: &str) -> Result<f32, HeaderError> {
    let value = quality.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let valid = fraction.len() <= 3
        && match whole {
            "0" => fraction.bytes().all(|byte| byte.is_ascii_digit()),
            "1" => fraction.bytes().all(|byte| byte == b'0'),
            _ => false,
        };
    ensure!(valid, HeaderError::invalid_quality(quality));

    match value.parse::<f32>() {
        Ok(value) if PreferenceWriter::is_valid_quality(value) => Ok(value),
        _ => Err(HeaderError::invalid_quality(quality)),
    }
}

/// Reads the preferences of a header, or the defaults of `kind` when the header is absent.
///
/// An empty `Accept-Charset` header means ISO-8859-1 only.
pub fn read_preferences(kind: PreferenceKind, header: Option<&str>) -> Result<Vec<Preference>, HeaderError> {
    match header {
        None => Ok(kind.default_preferences()),
        Some(header) if header.trim().is_empty() && kind == PreferenceKind::CharacterSet => {
            Ok(vec![Preference::new("ISO-8859-1")])
        }
        Some(header) => PreferenceReader::new(kind, header).read_values(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Metadata,
    ParamName,
    ParamValue,
}

/// Reads the preferences of one header value.
#[derive(Debug, Clone)]
pub struct PreferenceReader<'a> {
    kind: PreferenceKind,
    reader: HeaderReader<'a>,
}

impl<'a> PreferenceReader<'a> {
    pub fn new(kind: PreferenceKind, header: &'a str) -> Self {
        Self { kind, reader: HeaderReader::new(header) }
    }

    pub fn kind(&self) -> PreferenceKind {
        self.kind
    }

    fn create_preference(metadata: &[u8], parameters: Option<Vec<Parameter>>) -> Result<Preference, HeaderError> {
        let metadata = String::from_utf8_lossy(metadata).into_owned();
        let Some(parameters) = parameters else {
            return Ok(Preference::new(metadata));
        };

        let mut preference = Preference::new(metadata);
        let mut params = parameters.into_iter();
        for param in params.by_ref() {
            if param.name.eq_ignore_ascii_case("q") {
                preference.quality = read_quality(param.value.as_deref().unwrap_or_default())?;
                break;
            }
            preference.metadata_params.push(param);
        }
        preference.parameters.extend(params);
        Ok(preference)
    }
}

impl<'a> ValueReader<'a> for PreferenceReader<'a> {
    type Value = Preference;

    fn cursor(&mut self) -> &mut HeaderReader<'a> {
        &mut self.reader
    }

    fn read_value(&mut self) -> Result<Option<Preference>, HeaderError> {
        let mut state = ReadState::Metadata;
        let mut metadata = Vec::new();
        let mut name = Vec::new();
        let mut value = Vec::new();
        let mut parameters: Vec<Parameter> = Vec::new();

        loop {
            let position = self.reader.position();
            let next = self.reader.read();

            match state {
                ReadState::Metadata => match next {
                    None | Some(b',') => {
                        if next.is_some() {
                            self.reader.unread();
                        }
                        if metadata.is_empty() {
                            // empty metadata between two commas
                            return Ok(None);
                        }
                        return Self::create_preference(&metadata, None).map(Some);
                    }
                    Some(b';') => {
                        ensure!(!metadata.is_empty(), HeaderError::empty_name("preference metadata", position));
                        state = ReadState::ParamName;
                    }
                    Some(byte) if is_linear_white_space(byte) => {}
                    Some(byte) if is_text(byte) => metadata.push(byte),
                    Some(byte) => {
                        return Err(HeaderError::invalid_character(char::from(byte), position, "invalid metadata character"));
                    }
                },

                ReadState::ParamName => match next {
                    Some(b'=') => {
                        ensure!(!name.is_empty(), HeaderError::empty_name("parameter name", position));
                        state = ReadState::ParamValue;
                    }
                    None | Some(b',' | b';') => {
                        ensure!(!name.is_empty(), HeaderError::empty_name("parameter name", position));
                        parameters.push(Parameter::new(String::from_utf8_lossy(&name), None));
                        name.clear();
                        if next != Some(b';') {
                            if next.is_some() {
                                self.reader.unread();
                            }
                            return Self::create_preference(&metadata, Some(parameters)).map(Some);
                        }
                    }
                    Some(byte) if is_linear_white_space(byte) => {
                        self.reader.skip_spaces();
                        ensure!(
                            name.is_empty() || !self.reader.peek().is_some_and(is_token_char),
                            HeaderError::invalid_character(char::from(byte), position, "white space inside parameter name")
                        );
                    }
                    Some(byte) if is_token_char(byte) => name.push(byte),
                    Some(byte) => {
                        return Err(HeaderError::invalid_character(char::from(byte), position, "invalid parameter name character"));
                    }
                },

                ReadState::ParamValue => match next {
                    None | Some(b',' | b';') => {
                        ensure!(!value.is_empty(), HeaderError::empty_value("parameter", position));
                        parameters.push(Parameter::new(
                            String::from_utf8_lossy(&name),
                            Some(String::from_utf8_lossy(&value).into_owned()),
                        ));
                        name.clear();
                        value.clear();
                        if next == Some(b';') {
                            state = ReadState::ParamName;
                        } else {
                            if next.is_some() {
                                self.reader.unread();
                            }
                            return Self::create_preference(&metadata, Some(parameters)).map(Some);
                        }
                    }
                    Some(byte) if is_linear_white_space(byte) => {
                        // white space ends the value, only a separator may follow
                        self.reader.skip_spaces();
                        ensure!(
                            value.is_empty() || self.reader.peek().is_none_or(|next| is_comma(next) || next == b';'),
                            HeaderError::invalid_character(char::from(byte), position, "white space inside parameter value")
                        );
                    }
                    Some(byte) if is_double_quote(byte) && value.is_empty() => {
                        self.reader.unread();
                        let quoted = self.reader.read_quoted_string()?;
                        ensure!(!quoted.is_empty(), HeaderError::empty_value("parameter", position));
                        value.extend_from_slice(quoted.as_bytes());
                    }
                    Some(byte) if is_token_char(byte) => value.push(byte),
                    Some(byte) => {
                        return Err(HeaderError::invalid_character(char::from(byte), position, "invalid parameter value character"));
                    }
                },
            }
        }
    }
}

/// Formats preferences back into a header value.
#[derive(Debug, Clone, Copy)]
pub struct PreferenceWriter;

impl PreferenceWriter {
    /// Writes the preferences in order, separated by `", "`.
    ///
    /// The quality is written only when it is lower than 1.
    pub fn write(preferences: &[Preference]) -> String {
        let mut out = String::new();
        for preference in preferences {
            Self::append(&mut out, preference);
        }
        trace!(count = preferences.len(), header = %out, "wrote preferences");
        out
    }

    /// Appends one preference to a header value under construction.
    pub fn append(out: &mut String, preference: &Preference) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(&preference.to_string());
    }

    /// Formats a quality with at most three decimals and no trailing zeros.
    pub fn format_quality(quality: f32) -> String {
        let formatted = format!("{quality:.3}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }

    pub fn is_valid_quality(quality: f32) -> bool {
        (0.0..=1.0).contains(&quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(kind: PreferenceKind, header: &str) -> Vec<Preference> {
        PreferenceReader::new(kind, header).read_values().unwrap()
    }

    fn pairs(preferences: &[Preference]) -> Vec<(String, f32)> {
        preferences.iter().map(|p| (p.metadata().to_string(), p.quality())).collect()
    }

    #[test]
    fn test_round_trip() {
        let header = "text/*;q=0.3, text/html;q=0.7, */*;q=0.5";
        let preferences = read(PreferenceKind::MediaType, header);
        assert_eq!(
            pairs(&preferences),
            vec![("text/*".to_string(), 0.3), ("text/html".to_string(), 0.7), ("*/*".to_string(), 0.5)]
        );

        let written = PreferenceWriter::write(&preferences);
        assert_eq!(written, header);
        assert_eq!(read(PreferenceKind::MediaType, &written), preferences);
    }

    #[test]
    fn test_default_quality() {
        let preferences = read(PreferenceKind::Encoding, "gzip, deflate;q=0.5 ,identity");
        assert_eq!(pairs(&preferences), vec![("gzip".to_string(), 1.0), ("deflate".to_string(), 0.5), ("identity".to_string(), 1.0)]);
        assert_eq!(PreferenceWriter::write(&preferences), "gzip, deflate;q=0.5, identity");
    }

    #[test]
    fn test_media_params_and_extensions() {
        let preferences = read(PreferenceKind::MediaType, r#"text/html;level=1;q=0.8;ext="a b", application/xml"#);
        let html = &preferences[0];

        assert_eq!(html.metadata(), "text/html");
        assert_eq!(html.metadata_params(), [Parameter::new("level", Some("1".to_string()))]);
        assert!((html.quality() - 0.8).abs() < f32::EPSILON);
        assert_eq!(html.parameters(), [Parameter::new("ext", Some("a b".to_string()))]);
        assert_eq!(html.to_string(), r#"text/html;level=1;q=0.8;ext="a b""#);

        let media_type = html.media_type().unwrap();
        assert_eq!(media_type.type_(), mime::TEXT);
        assert_eq!(media_type.get_param("level").unwrap(), "1");

        assert_eq!(preferences[1].metadata(), "application/xml");
    }

    #[test]
    fn test_folded_header() {
        let preferences = read(PreferenceKind::Language, "en-us,\r\n\tfr;q=0.5 ; x , de ;q=0.1");
        assert_eq!(preferences.len(), 3);
        assert_eq!(preferences[1].metadata(), "fr");
        assert_eq!(preferences[1].parameters(), [Parameter::new("x", None)]);
        assert_eq!(preferences[2].metadata(), "de");
        assert!((preferences[2].quality() - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_entries_are_skipped() {
        assert_eq!(read(PreferenceKind::Encoding, ", gzip,, br ,").len(), 2);
    }

    #[test]
    fn test_invalid_quality() {
        let result = PreferenceReader::new(PreferenceKind::MediaType, "text/html;q=1.5").read_values();
        assert!(matches!(result, Err(HeaderError::InvalidQuality { .. })));

        assert!(read_quality("abc").is_err());
        assert!(read_quality("-0.1").is_err());
        assert!(read_quality("0.001").is_ok());
        assert!(read_quality("1.000").is_ok());
        assert!(read_quality("0.").is_ok());
        assert!(read_quality("0.9999").is_err());
        assert!(read_quality("0.0004").is_err());
        assert!(read_quality("1.001").is_err());
        assert!(read_quality(".5").is_err());
        assert!(read_quality("1e-1").is_err());
    }

    #[test]
    fn test_written_quality_reads_back_unchanged() {
        for header in ["a;q=0.001", "a;q=0.25", "a;q=0.999", "a;q=0"] {
            let first = read(PreferenceKind::MediaType, header);
            let written = PreferenceWriter::write(&first);
            assert_eq!(written, header);
            assert_eq!(read(PreferenceKind::MediaType, &written), first);
        }

        let result = PreferenceReader::new(PreferenceKind::MediaType, "a;q=0.9999").read_values();
        assert!(matches!(result, Err(HeaderError::InvalidQuality { .. })));
    }

    #[test]
    fn test_malformed_preferences() {
        let result = PreferenceReader::new(PreferenceKind::MediaType, ";q=0.5").read_values();
        assert!(matches!(result, Err(HeaderError::EmptyName { position: 0, .. })));

        let result = PreferenceReader::new(PreferenceKind::MediaType, "text/html;q=").read_values();
        assert!(matches!(result, Err(HeaderError::EmptyValue { .. })));

        let result = PreferenceReader::new(PreferenceKind::MediaType, "text/html;level=\"1").read_values();
        assert!(matches!(result, Err(HeaderError::UnterminatedQuotedString { .. })));
    }

    #[test]
    fn test_absent_header_defaults() {
        assert_eq!(read_preferences(PreferenceKind::MediaType, None).unwrap(), vec![Preference::new("*/*")]);
        assert_eq!(read_preferences(PreferenceKind::Encoding, None).unwrap(), vec![Preference::new("identity")]);
        assert_eq!(read_preferences(PreferenceKind::Language, None).unwrap(), vec![Preference::new("*")]);
        assert!(read_preferences(PreferenceKind::Patch, None).unwrap().is_empty());
        assert_eq!(read_preferences(PreferenceKind::CharacterSet, Some("")).unwrap(), vec![Preference::new("ISO-8859-1")]);
        assert_eq!(
            read_preferences(PreferenceKind::CharacterSet, Some("utf-8, iso-8859-1;q=0.5")).unwrap(),
            vec![Preference::new("utf-8"), Preference::with_quality("iso-8859-1", 0.5)]
        );
    }

    #[test]
    fn test_format_quality() {
        assert_eq!(PreferenceWriter::format_quality(0.5), "0.5");
        assert_eq!(PreferenceWriter::format_quality(0.0), "0");
        assert_eq!(PreferenceWriter::format_quality(0.125), "0.125");
        assert_eq!(PreferenceWriter::format_quality(0.3), "0.3");
    }
}
