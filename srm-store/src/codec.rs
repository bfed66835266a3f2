//! Text format for persisting an [`EntryStore`].
//!
//! ```text
//! Entry {
//!     defaultTime: 86400,
//!     numFiles: 2,
//!     files: [
//!         fileEntry { time: 100000, name: "notes.txt"},
//!         fileEntry { time: 3600, name: "target/"},
//!     ]
//! }
//! ```
//!
//! The format is line oriented and exact, [`decode`] accepts precisely what [`encode`] emits
//! (plus a single trailing newline). The kind of each record isn't stored, directories are
//! recognized by the trailing separator on their name.

use std::fmt::{self, Write};
use std::num::NonZeroU64;

use srm_types::{DIRECTORY_SEPARATOR, FileRecord};

use crate::store::{EntryStore, is_single_component};
use crate::{Error, FormatError};

static HEADER: &str = "Entry {";
static DEFAULT_TIME_PREFIX: &str = "    defaultTime: ";
static NUM_FILES_PREFIX: &str = "    numFiles: ";
static FILES_OPEN: &str = "    files: [";
static ENTRY_PREFIX: &str = "        fileEntry { time: ";
static ENTRY_NAME_SEP: &str = ", name: ";
static ENTRY_SUFFIX: &str = "},";
static FILES_CLOSE: &str = "    ]";
static FOOTER: &str = "}";

/// Serialize `store` into its persisted form.
pub fn encode(store: &EntryStore) -> String {
    Encoded(store).to_string()
}

/// Parse a persisted [`EntryStore`].
///
/// An empty (or entirely whitespace) input is a store that has never been written and decodes
/// to [`EntryStore::default`].
pub fn decode(raw: &str) -> Result<EntryStore, Error> {
    if raw.trim().is_empty() {
        return Ok(EntryStore::default());
    }
    let raw = raw.strip_suffix('\n').unwrap_or(raw);

    let mut lines = Lines::new(raw);
    lines.expect_exact(HEADER)?;

    let default_ttl = lines.expect_field(DEFAULT_TIME_PREFIX)?;
    let default_ttl = lines.with_line(parse_ttl(default_ttl))?;

    let declared = lines.expect_field(NUM_FILES_PREFIX)?;
    let declared = lines.with_line(parse_u64(declared))?;

    lines.expect_exact(FILES_OPEN)?;

    // Don't trust the declared count for pre-allocating.
    let mut records = Vec::with_capacity(usize::try_from(declared).unwrap_or(0).min(1024));
    for found in 0..declared {
        let Some(line) = lines.next_line() else {
            return Err(lines.error(FormatError::Truncated { declared, found }));
        };
        let record = lines.with_line(parse_record(line))?;
        records.push(record);
    }

    lines.expect_exact(FILES_CLOSE)?;
    lines.expect_exact(FOOTER)?;
    if lines.next_line().is_some() {
        return Err(lines.error(FormatError::TrailingContent));
    }

    Ok(EntryStore::from_parts(default_ttl, records))
}

/// [`fmt::Display`] implementation of the persisted format.
struct Encoded<'a>(&'a EntryStore);

impl fmt::Display for Encoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.0;
        writeln!(f, "{HEADER}")?;
        writeln!(f, "{DEFAULT_TIME_PREFIX}{},", store.default_ttl())?;
        writeln!(f, "{NUM_FILES_PREFIX}{},", store.len())?;
        writeln!(f, "{FILES_OPEN}")?;
        for record in store.list_entries() {
            writeln!(
                f,
                "{ENTRY_PREFIX}{}{ENTRY_NAME_SEP}{}{ENTRY_SUFFIX}",
                record.ttl(),
                Quoted(record.name()),
            )?;
        }
        writeln!(f, "{FILES_CLOSE}")?;
        write!(f, "{FOOTER}")
    }
}

/// Double quoted, escaped, representation of a string.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                '\x07' => f.write_str("\\a")?,
                '\x08' => f.write_str("\\b")?,
                '\x0c' => f.write_str("\\f")?,
                '\x0b' => f.write_str("\\v")?,
                c if c.is_ascii_control() => write!(f, "\\x{:02x}", u32::from(c))?,
                c if c.is_control() => write!(f, "\\u{:04x}", u32::from(c))?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

/// Iterator over the lines of a persisted store that tracks the current line number.
struct Lines<'a> {
    inner: std::str::Split<'a, char>,
    /// 1-indexed number of the most recently returned line.
    line: usize,
}

impl<'a> Lines<'a> {
    fn new(raw: &'a str) -> Self {
        Lines {
            inner: raw.split('\n'),
            line: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let next = self.inner.next()?;
        self.line += 1;
        Some(next)
    }

    fn error(&self, reason: FormatError) -> Error {
        Error::Format {
            line: self.line.max(1),
            reason,
        }
    }

    fn with_line<T>(&self, result: Result<T, FormatError>) -> Result<T, Error> {
        result.map_err(|reason| self.error(reason))
    }

    fn expect_exact(&mut self, expected: &'static str) -> Result<(), Error> {
        match self.next_line() {
            Some(line) if line == expected => Ok(()),
            Some(_) => Err(self.error(FormatError::Expected { expected })),
            None => {
                // Point at the line that should have been there.
                self.line += 1;
                Err(self.error(FormatError::Expected { expected }))
            }
        }
    }

    /// Expects a line of the form `<prefix><value>,` returning `<value>`.
    fn expect_field(&mut self, prefix: &'static str) -> Result<&'a str, Error> {
        let Some(line) = self.next_line() else {
            self.line += 1;
            return Err(self.error(FormatError::Expected { expected: prefix }));
        };
        line.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(','))
            .ok_or_else(|| self.error(FormatError::Expected { expected: prefix }))
    }
}

fn parse_u64(raw: &str) -> Result<u64, FormatError> {
    // `u64::from_str` accepts a leading '+', the format never contains one.
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::InvalidNumber(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| FormatError::InvalidNumber(raw.to_string()))
}

fn parse_ttl(raw: &str) -> Result<NonZeroU64, FormatError> {
    NonZeroU64::new(parse_u64(raw)?).ok_or(FormatError::ZeroTtl)
}

fn parse_record(line: &str) -> Result<FileRecord, FormatError> {
    let rest = line
        .strip_prefix(ENTRY_PREFIX)
        .ok_or(FormatError::Expected {
            expected: ENTRY_PREFIX,
        })?;
    let (ttl, rest) = rest.split_once(ENTRY_NAME_SEP).ok_or(FormatError::Expected {
        expected: ENTRY_NAME_SEP,
    })?;
    let ttl = parse_ttl(ttl)?;

    let (name, rest) = unquote(rest)?;
    if rest != ENTRY_SUFFIX {
        return Err(FormatError::Expected {
            expected: ENTRY_SUFFIX,
        });
    }
    let base = name.trim_end_matches(DIRECTORY_SEPARATOR);
    if base.is_empty() {
        return Err(FormatError::EmptyName);
    }
    if !is_single_component(base) {
        return Err(FormatError::PathName(name));
    }

    Ok(FileRecord::new(name, ttl))
}

/// Parse a double quoted string from the start of `raw`, returning it and the remainder.
fn unquote(raw: &str) -> Result<(String, &str), FormatError> {
    let rest = raw.strip_prefix('"').ok_or(FormatError::Expected { expected: "\"" })?;

    let mut value = String::with_capacity(rest.len());
    let mut chars = rest.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &rest[idx + 1..])),
            '\\' => {
                let (_, escape) = chars.next().ok_or(FormatError::UnterminatedQuote)?;
                let c = match escape {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'v' => '\x0b',
                    'x' => {
                        let digits = take_digits(&mut chars, 2)?;
                        ascii_from_digits(&digits, 16, "x")?
                    }
                    '0'..='7' => {
                        // Octal escapes are exactly three digits, the first we already consumed.
                        let digits = format!("{escape}{}", take_digits(&mut chars, 2)?);
                        ascii_from_digits(&digits, 8, "")?
                    }
                    'u' => unescape_unicode(&mut chars, 4, 'u')?,
                    'U' => unescape_unicode(&mut chars, 8, 'U')?,
                    other => return Err(FormatError::InvalidEscape(format!("\\{other}"))),
                };
                value.push(c);
            }
            c if c.is_control() => return Err(FormatError::RawControl(c)),
            c => value.push(c),
        }
    }

    Err(FormatError::UnterminatedQuote)
}

fn take_digits(
    chars: &mut std::str::CharIndices<'_>,
    count: usize,
) -> Result<String, FormatError> {
    let mut digits = String::with_capacity(count);
    for _ in 0..count {
        let (_, d) = chars.next().ok_or(FormatError::UnterminatedQuote)?;
        digits.push(d);
    }
    Ok(digits)
}

/// Only ASCII can be spelled as a single byte escape, anything else wouldn't be valid UTF-8.
fn ascii_from_digits(digits: &str, radix: u32, marker: &str) -> Result<char, FormatError> {
    let invalid = || FormatError::InvalidEscape(format!("\\{marker}{digits}"));
    if !digits.chars().all(|d| d.is_digit(radix)) {
        return Err(invalid());
    }
    let value = u8::from_str_radix(digits, radix).map_err(|_| invalid())?;
    if !value.is_ascii() {
        return Err(invalid());
    }
    Ok(char::from(value))
}

fn unescape_unicode(
    chars: &mut std::str::CharIndices<'_>,
    count: usize,
    marker: char,
) -> Result<char, FormatError> {
    let digits = take_digits(chars, count)?;
    Some(&digits)
        .filter(|digits| digits.chars().all(|d| d.is_ascii_hexdigit()))
        .and_then(|digits| u32::from_str_radix(digits, 16).ok())
        .and_then(char::from_u32)
        .ok_or_else(|| FormatError::InvalidEscape(format!("\\{marker}{digits}")))
}
