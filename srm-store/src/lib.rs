//! The authoritative set of entries that `srm` has staged for deletion, and the text format it
//! is persisted in.

pub mod codec;
pub mod store;

#[cfg(test)]
mod tests;

pub use codec::{decode, encode};
pub use store::{DEFAULT_TTL, EntryStore};

/// Errors from manipulating or loading an [`EntryStore`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed entry file at line {line}: {reason}")]
    Format { line: usize, reason: FormatError },
    #[error("no entry named '{name}'")]
    NotFound { name: String },
    #[error("invalid entry name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Specifics of why a persisted [`EntryStore`] could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("expected `{expected}`")]
    Expected { expected: &'static str },
    #[error("file ends after {found} of {declared} declared entries")]
    Truncated { declared: u64, found: u64 },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("time-to-live must be positive")]
    ZeroTtl,
    #[error("entry name is empty")]
    EmptyName,
    #[error("entry name '{0}' is not a single path component")]
    PathName(String),
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("invalid escape sequence '{0}'")]
    InvalidEscape(String),
    #[error("unescaped control character {0:?} in quoted string")]
    RawControl(char),
    #[error("unexpected content after the end of the entry list")]
    TrailingContent,
}
