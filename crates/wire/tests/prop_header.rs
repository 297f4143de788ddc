//! Properties of the header value readers.

use micro_wire::header::{
    read_preferences, read_string_values, CookieReader, HeaderReader, Preference, PreferenceKind, PreferenceReader,
    PreferenceWriter, ValueReader,
};
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9!#$%&'*+.^_`|~-]{0,11}"
}

fn lws() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just(" "), Just("\t"), Just(" \t "), Just("\r\n "), Just("\r\n\t"), Just("\r ")]
}

fn media_range() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*/*".to_string()),
        token().prop_map(|t| format!("{t}/*")),
        (token(), token()).prop_map(|(t, s)| format!("{t}/{s}")),
    ]
}

fn quality() -> impl Strategy<Value = f32> {
    (0u16..=1000).prop_map(|q| f32::from(q) / 1000.0)
}

proptest! {
    #[test]
    fn comma_list_ignores_white_space(values in proptest::collection::vec(token(), 1..6), spaces in proptest::collection::vec(lws(), 12)) {
        let mut header = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                header.push_str(spaces[i * 2 % spaces.len()]);
                header.push(',');
                header.push_str(spaces[(i * 2 + 1) % spaces.len()]);
            }
            header.push_str(value);
        }

        let mut expected: Vec<&str> = Vec::new();
        for value in &values {
            if !expected.contains(&value.as_str()) {
                expected.push(value);
            }
        }
        prop_assert_eq!(read_string_values(&header).unwrap(), expected);
    }
}

proptest! {
    #[test]
    fn preferences_survive_write_and_read(entries in proptest::collection::vec((media_range(), quality()), 1..6)) {
        let preferences: Vec<Preference> =
            entries.iter().map(|(range, q)| Preference::with_quality(range.clone(), *q)).collect();

        let header = PreferenceWriter::write(&preferences);
        let read = read_preferences(PreferenceKind::MediaType, Some(&header)).unwrap();

        prop_assert_eq!(read.len(), preferences.len());
        for (read, written) in read.iter().zip(&preferences) {
            prop_assert_eq!(read.metadata(), written.metadata());
            prop_assert!((read.quality() - written.quality()).abs() < 0.0005);
        }
        prop_assert_eq!(PreferenceWriter::write(&read), header);
    }
}

proptest! {
    #[test]
    fn accepted_quality_is_written_back_exactly(whole in "[01]", fraction in "(\\.[0-9]{0,5})?") {
        let header = format!("text/plain;q={whole}{fraction}");
        let Ok(first) = PreferenceReader::new(PreferenceKind::MediaType, &header).read_values() else {
            prop_assert!(fraction.len() > 4 || (whole == "1" && fraction.trim_start_matches('.').contains(|c: char| c != '0')));
            return Ok(());
        };

        let written = PreferenceWriter::write(&first);
        let second = PreferenceReader::new(PreferenceKind::MediaType, &written).read_values().unwrap();
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #[test]
    fn readers_terminate_on_any_input(header in "\\PC{0,64}|[ -~\t\r\n]{0,64}") {
        let mut reader = HeaderReader::new(&header);
        let tokens = reader.tokens().count();
        prop_assert!(tokens <= header.len() + 1);

        // Ok or Err, never a hang or a panic
        let _ = HeaderReader::new(&header).read_values();
        let _ = PreferenceReader::new(PreferenceKind::Language, &header).read_values();
        let _ = CookieReader::new(&header).read_values();
    }
}
