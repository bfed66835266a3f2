use std::num::NonZeroU64;

use proptest::prelude::*;
use srm_types::FileKind;

use crate::{DEFAULT_TTL, EntryStore, Error, FormatError, decode, encode};

fn ttl(secs: u64) -> NonZeroU64 {
    NonZeroU64::new(secs).unwrap()
}

fn format_reason(err: Error) -> (usize, FormatError) {
    match err {
        Error::Format { line, reason } => (line, reason),
        other => panic!("expected a format error, found {other:?}"),
    }
}

#[test]
fn smoketest_encode_exact() {
    let mut store = EntryStore::new(ttl(24));
    store.add_entry("filename", FileKind::File, 100000).unwrap();
    store.add_entry("target", FileKind::Directory, 0).unwrap();

    let expected = "Entry {
    defaultTime: 24,
    numFiles: 2,
    files: [
        fileEntry { time: 100000, name: \"filename\"},
        fileEntry { time: 24, name: \"target/\"},
    ]
}";
    assert_eq!(encode(&store), expected);
}

#[test]
fn smoketest_encode_empty() {
    let store = EntryStore::new(ttl(60));
    let encoded = encode(&store);
    assert_eq!(
        encoded,
        "Entry {\n    defaultTime: 60,\n    numFiles: 0,\n    files: [\n    ]\n}"
    );
    assert_eq!(decode(&encoded).unwrap(), store);
}

#[test]
fn smoketest_decode_derives_kind() {
    let raw = "Entry {
    defaultTime: 86400,
    numFiles: 2,
    files: [
        fileEntry { time: 5, name: \"a.txt\"},
        fileEntry { time: 6, name: \"build/\"},
    ]
}
";
    let store = decode(raw).unwrap();
    assert_eq!(store.default_ttl(), DEFAULT_TTL);

    let kinds: Vec<_> = store.list_entries().iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec![FileKind::File, FileKind::Directory]);
    let ttls: Vec<_> = store.list_entries().iter().map(|r| r.ttl().get()).collect();
    assert_eq!(ttls, vec![5, 6]);
}

#[test]
fn smoketest_empty_input() {
    assert_eq!(decode("").unwrap(), EntryStore::default());
    assert_eq!(decode("\n  \n").unwrap(), EntryStore::default());
}

#[test]
fn smoketest_garbage() {
    let (line, reason) = format_reason(decode("garbage").unwrap_err());
    assert_eq!(line, 1);
    assert_eq!(reason, FormatError::Expected { expected: "Entry {" });
}

#[test]
fn smoketest_quote_and_space() {
    let mut store = EntryStore::default();
    let name = "my \"quoted\" file.txt";
    store.add_entry(name, FileKind::File, 10).unwrap();

    let encoded = encode(&store);
    assert!(encoded.contains(r#"name: "my \"quoted\" file.txt"},"#));

    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded.list_entries()[0].name(), name);
    assert_eq!(decoded, store);
}

#[test]
fn smoketest_control_characters() {
    let mut store = EntryStore::default();
    let name = "tab\there\nnew\\line\u{7}\u{1b}\u{85}é";
    store.add_entry(name, FileKind::Directory, 3).unwrap();

    let encoded = encode(&store);
    // Every record stays on a single line.
    assert_eq!(encoded.lines().count(), 7);
    assert!(encoded.contains(r#"tab\there\nnew\\line\a\x1b\u0085é/"#));

    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded, store);
}

#[test]
fn smoketest_foreign_escapes() {
    let raw = "Entry {
    defaultTime: 1,
    numFiles: 1,
    files: [
        fileEntry { time: 2, name: \"\\x41\\101\\u00e9\\U0001F600\"},
    ]
}";
    let store = decode(raw).unwrap();
    assert_eq!(store.list_entries()[0].name(), "AAé😀");
}

#[test]
fn smoketest_count_exceeds_lines() {
    let raw = "Entry {
    defaultTime: 10,
    numFiles: 3,
    files: [
        fileEntry { time: 2, name: \"a\"},
    ]
}";
    let (_, reason) = format_reason(decode(raw).unwrap_err());
    // The closing bracket gets parsed as the second entry.
    assert_eq!(
        reason,
        FormatError::Expected {
            expected: "        fileEntry { time: "
        }
    );

    let raw = "Entry {\n    defaultTime: 10,\n    numFiles: 2,\n    files: [\n        fileEntry { time: 2, name: \"a\"},";
    let (line, reason) = format_reason(decode(raw).unwrap_err());
    assert_eq!(line, 5);
    assert_eq!(
        reason,
        FormatError::Truncated {
            declared: 2,
            found: 1
        }
    );
}

#[test]
fn smoketest_count_below_lines() {
    let raw = "Entry {
    defaultTime: 10,
    numFiles: 0,
    files: [
        fileEntry { time: 2, name: \"a\"},
    ]
}";
    let (line, reason) = format_reason(decode(raw).unwrap_err());
    assert_eq!(line, 5);
    assert_eq!(reason, FormatError::Expected { expected: "    ]" });
}

#[test]
fn smoketest_invalid_numbers() {
    let raw = "Entry {\n    defaultTime: soon,\n    numFiles: 0,\n    files: [\n    ]\n}";
    let (line, reason) = format_reason(decode(raw).unwrap_err());
    assert_eq!(line, 2);
    assert_eq!(reason, FormatError::InvalidNumber("soon".to_string()));

    let raw = "Entry {\n    defaultTime: 0,\n    numFiles: 0,\n    files: [\n    ]\n}";
    let (_, reason) = format_reason(decode(raw).unwrap_err());
    assert_eq!(reason, FormatError::ZeroTtl);

    let raw = "Entry {\n    defaultTime: 1,\n    numFiles: 1,\n    files: [\n        fileEntry { time: +4, name: \"a\"},\n    ]\n}";
    let (line, reason) = format_reason(decode(raw).unwrap_err());
    assert_eq!(line, 5);
    assert_eq!(reason, FormatError::InvalidNumber("+4".to_string()));
}

#[test]
fn smoketest_malformed_quoting() {
    let entry = |name: &str| {
        format!(
            "Entry {{\n    defaultTime: 1,\n    numFiles: 1,\n    files: [\n        fileEntry {{ time: 2, name: {name}}},\n    ]\n}}"
        )
    };

    let (_, reason) = format_reason(decode(&entry("\"abc")).unwrap_err());
    assert_eq!(reason, FormatError::UnterminatedQuote);

    let (_, reason) = format_reason(decode(&entry("abc")).unwrap_err());
    assert_eq!(reason, FormatError::Expected { expected: "\"" });

    let (_, reason) = format_reason(decode(&entry("\"a\\qb\"")).unwrap_err());
    assert_eq!(reason, FormatError::InvalidEscape("\\q".to_string()));

    let (_, reason) = format_reason(decode(&entry("\"\\xff\"")).unwrap_err());
    assert_eq!(reason, FormatError::InvalidEscape("\\xff".to_string()));

    let (_, reason) = format_reason(decode(&entry("\"\"")).unwrap_err());
    assert_eq!(reason, FormatError::EmptyName);

    let (_, reason) = format_reason(decode(&entry("\"a\"  ")).unwrap_err());
    assert_eq!(reason, FormatError::Expected { expected: "}," });
}

#[test]
fn smoketest_names_outside_quarantine() {
    let entry = |name: &str| {
        format!(
            "Entry {{\n    defaultTime: 1,\n    numFiles: 1,\n    files: [\n        fileEntry {{ time: 2, name: \"{name}\"}},\n    ]\n}}"
        )
    };

    for name in ["../victim.txt", "/tmp/x", "a/b", "..", "./", "../"] {
        let (line, reason) = format_reason(decode(&entry(name)).unwrap_err());
        assert_eq!(line, 5, "{name:?}");
        assert_eq!(reason, FormatError::PathName(name.to_string()), "{name:?}");
    }

    // Dots are fine as part of a name.
    let store = decode(&entry("..hidden")).unwrap();
    assert_eq!(store.list_entries()[0].name(), "..hidden");
    let store = decode(&entry("...")).unwrap();
    assert_eq!(store.list_entries()[0].name(), "...");
}

#[test]
fn smoketest_trailing_content() {
    let mut raw = encode(&EntryStore::default());
    raw.push_str("\n\nEntry {");
    let (_, reason) = format_reason(decode(&raw).unwrap_err());
    assert_eq!(reason, FormatError::TrailingContent);
}

/// Names as they'd be staged, paired with whether they're a directory.
fn arb_entry() -> impl Strategy<Value = (String, bool, u64)> {
    let name = "[^/]{1,24}".prop_filter("names a single component", |n| n != "." && n != "..");
    (name, any::<bool>(), 0u64..=u64::MAX)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_round_trip(
        default_ttl in 1u64..=u64::MAX,
        entries in prop::collection::vec(arb_entry(), 0..16),
    ) {
        let mut store = EntryStore::new(ttl(default_ttl));
        for (name, is_dir, ttl_secs) in entries {
            let kind = if is_dir { FileKind::Directory } else { FileKind::File };
            store.add_entry(&name, kind, ttl_secs).unwrap();
        }

        let encoded = encode(&store);
        let decoded = decode(&encoded).unwrap();
        prop_assert_eq!(&decoded, &store);
        prop_assert_eq!(encode(&decoded), encoded);
    }
}
