//! Stateless field validators.
//!
//! Each validator takes the raw value and either returns the accepted value
//! or a field-scoped [`DomainError::InvalidField`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DomainError, DomainResult};

type Pattern = LazyLock<Result<Regex, regex::Error>>;

static HEX_COLOR: Pattern = LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$"));
static SLUG: Pattern = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$"));
static USERNAME: Pattern = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$"));

fn is_match(pattern: &Pattern, value: &str) -> DomainResult<bool> {
    match &**pattern {
        Ok(re) => Ok(re.is_match(value)),
        Err(e) => Err(DomainError::invariant(format!("validator pattern: {e}"))),
    }
}

/// `#RRGGBB` colors.
pub fn hex_color(field: &str, value: &str) -> DomainResult<()> {
    if is_match(&HEX_COLOR, value)? {
        Ok(())
    } else {
        Err(DomainError::invalid_field(
            field,
            "color must be in HEX format (e.g. \"#RRGGBB\")",
        ))
    }
}

/// Slugs: ASCII letters, digits and underscores.
pub fn slug(field: &str, value: &str) -> DomainResult<()> {
    if is_match(&SLUG, value)? {
        Ok(())
    } else {
        Err(DomainError::invalid_field(
            field,
            "slug may contain only letters, digits and underscores",
        ))
    }
}

/// Usernames: word characters plus `.@+-`.
pub fn username(field: &str, value: &str) -> DomainResult<()> {
    if is_match(&USERNAME, value)? {
        Ok(())
    } else {
        Err(DomainError::invalid_field(
            field,
            "username may contain only letters, digits and @/./+/-/_",
        ))
    }
}

/// Integers that must be at least 1 (amounts, cooking time). The upper
/// bound is the range of a SQL `INTEGER` column.
pub fn positive_integer(field: &str, value: i64) -> DomainResult<u32> {
    if value < 1 {
        return Err(DomainError::invalid_field(field, "value must be greater than 0"));
    }
    if value > i64::from(i32::MAX) {
        return Err(DomainError::invalid_field(field, "value is too large"));
    }
    u32::try_from(value).map_err(|_| DomainError::invalid_field(field, "value is too large"))
}

/// Trimmed, non-blank text of at most `max_chars` characters.
pub fn bounded_text(field: &str, value: &str, max_chars: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_field(field, "must not be blank"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::invalid_field(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Minimal structural e-mail check: one `@`, non-empty local part, dotted domain.
pub fn email(field: &str, value: &str) -> DomainResult<String> {
    let value = bounded_text(field, value, 254)?;
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(value)
    } else {
        Err(DomainError::invalid_field(
            field,
            "enter a valid e-mail address (mail@example.com)",
        ))
    }
}
