//! Field name case conversion (`snake_case` ↔ camelCase).
//!
//! GraphQL exposes camelCase field names; database columns and JSONB keys
//! are `snake_case`. Both directions are byte transforms over raw ASCII:
//! the response builder re-cases keys camel-wards while copying rows, and
//! the executor re-cases mutation input keys snake-wards before binding.
//! Only ASCII letters and underscores participate; every other byte
//! (including UTF-8 continuation bytes) passes through verbatim, so the
//! transforms never corrupt multi-byte content.

/// Hot-path variant: append the camelCase form of `key` to `out`.
///
/// Leading underscores pass through untouched (`__typename` stays
/// `__typename`); interior underscore runs collapse to a single case
/// shift; trailing underscores are dropped.
pub fn camelize_into(key: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;

    // Leading underscores pass through untouched.
    while i < key.len() && key[i] == b'_' {
        out.push(b'_');
        i += 1;
    }

    let mut shift_next = false;
    while i < key.len() {
        let b = key[i];
        if b == b'_' {
            // Collapse a run of underscores into one pending case shift.
            shift_next = true;
            i += 1;
            continue;
        }
        if shift_next {
            out.push(b.to_ascii_uppercase());
            shift_next = false;
        } else {
            out.push(b);
        }
        i += 1;
    }
}

/// Byte counterpart of [`camelize_into`]: append the `snake_case` form of
/// `key` to `out`.
///
/// An underscore lands before an uppercase byte when the previous byte was
/// a lowercase letter (`firstName`), or when an uppercase run ends at a
/// lowercase byte (`HTTPResponse` → `http_response`). Digits never break a
/// word.
pub fn snakeize_into(key: &[u8], out: &mut Vec<u8>) {
    for i in 0..key.len() {
        let b = key[i];
        if !b.is_ascii_uppercase() {
            out.push(b);
            continue;
        }

        let after_lower = i > 0 && key[i - 1].is_ascii_lowercase();
        let run_ends = i > 0
            && key[i - 1].is_ascii_uppercase()
            && key.get(i + 1).is_some_and(u8::is_ascii_lowercase);
        if after_lower || run_ends {
            out.push(b'_');
        }
        out.push(b.to_ascii_lowercase());
    }
}

/// Convert `snake_case` to camelCase (allocating variant).
///
/// # Examples
///
/// ```
/// use fraiseql_core::utils::casing::to_camel_case;
///
/// assert_eq!(to_camel_case("first_name"), "firstName");
/// assert_eq!(to_camel_case("a__b"), "aB");
/// assert_eq!(to_camel_case("__typename"), "__typename");
/// ```
#[must_use]
pub fn to_camel_case(s: &str) -> String {
    if !s.contains('_') {
        return s.to_string();
    }
    let mut out = Vec::with_capacity(s.len());
    camelize_into(s.as_bytes(), &mut out);
    into_string(out, s)
}

/// Convert camelCase or PascalCase to `snake_case` (allocating variant).
///
/// # Examples
///
/// ```
/// use fraiseql_core::utils::casing::to_snake_case;
///
/// assert_eq!(to_snake_case("firstName"), "first_name");
/// assert_eq!(to_snake_case("HTTPResponse"), "http_response");
/// assert_eq!(to_snake_case("already_snake"), "already_snake");
/// ```
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    if !s.bytes().any(|b| b.is_ascii_uppercase()) {
        return s.to_string();
    }
    let mut out = Vec::with_capacity(s.len() + 4);
    snakeize_into(s.as_bytes(), &mut out);
    into_string(out, s)
}

/// The transforms only touch ASCII bytes, so the output stays valid UTF-8
/// whenever the input was.
fn into_string(bytes: Vec<u8>, original: &str) -> String {
    String::from_utf8(bytes).unwrap_or_else(|_| original.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_camel_to_snake() {
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("firstName"), "first_name");
    }

    #[test]
    fn test_pascal_to_snake() {
        assert_eq!(to_snake_case("UserId"), "user_id");
        assert_eq!(to_snake_case("FirstName"), "first_name");
    }

    #[test]
    fn test_consecutive_capitals() {
        assert_eq!(to_snake_case("HTTPResponse"), "http_response");
        assert_eq!(to_snake_case("IOError"), "io_error");
    }

    #[test]
    fn test_already_snake_case() {
        assert_eq!(to_snake_case("user_id"), "user_id");
    }

    #[test]
    fn test_digits_do_not_break_words() {
        assert_eq!(to_snake_case("user2FA"), "user2fa");
        assert_eq!(to_snake_case("level99Boss"), "level99boss");
    }

    #[test]
    fn test_snakeize_into_bytes() {
        let mut out = Vec::new();
        snakeize_into(b"createdAt", &mut out);
        assert_eq!(out, b"created_at");

        out.clear();
        snakeize_into(b"XMLParser", &mut out);
        assert_eq!(out, b"xml_parser");
    }

    #[test]
    fn test_simple_snake_to_camel() {
        assert_eq!(to_camel_case("user_id"), "userId");
        assert_eq!(to_camel_case("first_name"), "firstName");
        assert_eq!(to_camel_case("http_response"), "httpResponse");
    }

    #[test]
    fn test_already_camel_passes_through() {
        assert_eq!(to_camel_case("firstName"), "firstName");
    }

    #[test]
    fn test_multi_underscore_collapses_to_single_shift() {
        assert_eq!(to_camel_case("a__b"), "aB");
        assert_eq!(to_camel_case("http___response"), "httpResponse");
    }

    #[test]
    fn test_leading_underscores_preserved() {
        assert_eq!(to_camel_case("__typename"), "__typename");
        assert_eq!(to_camel_case("_entities"), "_entities");
        assert_eq!(to_camel_case("_private_field"), "_privateField");
    }

    #[test]
    fn test_trailing_underscores_dropped() {
        assert_eq!(to_camel_case("user_id_"), "userId");
    }

    #[test]
    fn test_camelize_into_bytes() {
        let mut out = Vec::new();
        camelize_into(b"created_at", &mut out);
        assert_eq!(out, b"createdAt");

        out.clear();
        camelize_into(b"deleted_at_utc", &mut out);
        assert_eq!(out, b"deletedAtUtc");
    }

    #[test]
    fn test_roundtrip() {
        for original in ["userId", "firstName", "createdAt"] {
            let snake = to_snake_case(original);
            assert_eq!(to_camel_case(&snake), original);
        }
    }
}
