use crate::AliasError;

/// Checks a caller-supplied alias against the format rules and
/// returns its canonical (lowercase) form.
///
/// Only ASCII letters and digits are accepted, and the length must
/// lie within `min..=max`.
pub fn normalize_alias(alias: &str, min: usize, max: usize) -> Result<String, AliasError> {
    if let Some((position, ch)) = alias
        .chars()
        .enumerate()
        .find(|(_, ch)| !ch.is_ascii_alphanumeric())
    {
        return Err(AliasError::InvalidCharacter { ch, position });
    }
    // All ASCII from here on, so bytes and characters agree.
    let len = alias.len();
    if len < min {
        return Err(AliasError::TooShort { len, min });
    }
    if len > max {
        return Err(AliasError::TooLong { len, max });
    }
    Ok(alias.to_ascii_lowercase())
}
