use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::shared::constants::BANNED_WORDS;

/// Minimum length of a task slug
pub const MIN_SLUG_LENGTH: usize = 10;

lazy_static! {
    /// Regex for validating slugs
    /// Lowercase alphanumeric words joined by runs of hyphens or underscores
    /// - Valid: "fix-the-login", "release_notes", "a--b"
    /// - Invalid: "-fix", "fix-", "Fix", "fix the"
    pub static ref SLUG_REGEX: Regex =
        Regex::new(r"^[a-z0-9]+(?:(?:-|_)+[a-z0-9]+)*$").expect("valid slug regex");
}

/// Reject text containing any banned word, ignoring case
pub fn validate_no_banned_words(value: &str) -> Result<(), ValidationError> {
    let lowered = value.to_lowercase();
    match BANNED_WORDS.iter().find(|word| lowered.contains(*word)) {
        Some(word) => Err(ValidationError::new("banned_word").with_message(Cow::Owned(
            format!("This contains a banned word: \"{}\"", word),
        ))),
        None => Ok(()),
    }
}

pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if value.len() < MIN_SLUG_LENGTH {
        return Err(ValidationError::new("slug_length").with_message(Cow::Owned(format!(
            "Slug must be at least {} characters",
            MIN_SLUG_LENGTH
        ))));
    }
    if !SLUG_REGEX.is_match(value) {
        return Err(ValidationError::new("slug_format").with_message(Cow::Borrowed(
            "Slug must contain only lowercase letters, digits, hyphens and underscores",
        )));
    }
    Ok(())
}
