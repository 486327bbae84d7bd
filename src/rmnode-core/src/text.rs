//! Conversions between the host's wide strings and UTF-8.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid UTF-16 sequence: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),
    #[error("invalid UTF-8 sequence: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Decode a wide string, stopping at the first NUL if one is present.
pub fn try_to_utf8(wide: &[u16]) -> Result<String, EncodingError> {
    let end = wide.iter().position(|&unit| unit == 0).unwrap_or(wide.len());
    Ok(String::from_utf16(&wide[..end])?)
}

/// Soft-failing variant of [`try_to_utf8`]: invalid input yields an empty string.
pub fn to_utf8(wide: &[u16]) -> String {
    match try_to_utf8(wide) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(error = %err, "dropping undecodable wide string");
            String::new()
        }
    }
}

pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Wide encoding with a trailing NUL, ready to hand across the plugin ABI.
pub fn to_wide_nul(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

pub fn try_line_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    Ok(std::str::from_utf8(bytes)?.to_owned())
}

/// Decode one line of child output. Invalid UTF-8 yields an empty string.
pub fn line_to_utf8(bytes: &[u8]) -> String {
    match try_line_to_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(error = %err, "dropping undecodable output line");
            String::new()
        }
    }
}

/// Rewrite platform separators as `/` so a path can sit inside a script
/// string literal without escaping.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trips_to_empty() {
        assert_eq!(to_utf8(&to_wide("")), "");
        assert!(to_wide("").is_empty());
    }

    #[test]
    fn wide_round_trip_keeps_non_ascii() {
        let text = "Grüße, 世界 🎵";
        assert_eq!(to_utf8(&to_wide(text)), text);
    }

    #[test]
    fn nul_terminated_input_stops_at_terminator() {
        let wide = to_wide_nul("abc");
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(to_utf8(&wide), "abc");
    }

    #[test]
    fn lone_surrogate_is_soft_failure() {
        let wide = [0x0061, 0xD800, 0x0062];
        assert!(try_to_utf8(&wide).is_err());
        assert_eq!(to_utf8(&wide), "");
    }

    #[test]
    fn invalid_utf8_line_is_empty() {
        assert_eq!(line_to_utf8(b"ok"), "ok");
        assert_eq!(line_to_utf8(&[0x66, 0xFF, 0x66]), "");
    }

    #[test]
    fn invalid_utf8_line_reports_the_byte_offset() {
        let err = try_line_to_utf8(&[0x66, 0xFF, 0x66]).unwrap_err();
        assert!(matches!(err, EncodingError::Utf8(ref inner) if inner.valid_up_to() == 1));
        assert_eq!(try_line_to_utf8("ünï".as_bytes()).unwrap(), "ünï");
    }

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(
            normalize_path(r"C:\Users\me\Skins\clock.js"),
            "C:/Users/me/Skins/clock.js"
        );
        assert_eq!(normalize_path("already/fine"), "already/fine");
    }
}
