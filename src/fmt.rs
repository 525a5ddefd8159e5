//! Debug formatting helpers for [`custom_debug_derive`].

use std::fmt;

/// Formats any value as a fixed placeholder.
///
/// Use with `#[debug(with = "crate::fmt::redacted")]` on secret fields.
pub fn redacted<T>(_value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"<redacted>\"")
}
