//! Utilities for reading environment variables.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Returns true if the environment variable is set, and is _not_ one of the following:
/// `'0', '', 'no', 'false'`.
pub fn is_truthy<K: AsRef<OsStr>>(var: K) -> bool {
    let Some(value) = std::env::var_os(var) else {
        return false;
    };
    is_truthy_value(value)
}

fn is_truthy_value(mut value: OsString) -> bool {
    static FALSEY: &[&str] = &["0", "", "no", "false"];

    value.make_ascii_lowercase();
    !FALSEY.iter().any(|falsey| value == *falsey)
}

/// Name of the environment variable that overrides the setting `name` for `prefix`.
///
/// e.g. `override_var("SRM", "default_ttl_secs")` is `SRM_DEFAULT_TTL_SECS`.
pub fn override_var(prefix: &str, name: &str) -> String {
    let mut var = String::with_capacity(prefix.len() + name.len() + 1);
    var.push_str(prefix);
    var.push('_');
    var.extend(name.chars().map(|c| match c {
        '-' | '.' => '_',
        c => c.to_ascii_uppercase(),
    }));
    var
}

/// The current user's home directory, from `$HOME`.
///
/// Returns `None` if the variable is unset or empty.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoketest_truthy_values() {
        assert!(is_truthy_value("1".into()));
        assert!(is_truthy_value("yes".into()));
        assert!(!is_truthy_value("".into()));
        assert!(!is_truthy_value("FALSE".into()));
        assert!(!is_truthy_value("No".into()));
    }

    #[test]
    fn smoketest_override_var() {
        assert_eq!(override_var("SRM", "default_ttl_secs"), "SRM_DEFAULT_TTL_SECS");
        assert_eq!(override_var("SRM", "entries.file-name"), "SRM_ENTRIES_FILE_NAME");
    }
}
