//! User input validation
//!
//! Provides the checks applied to free-text input before it reaches a backend:
//! - generation name and prompt length limits
//! - a blocked-term screen for obscene input
//! - e-mail shape check for card payments
//! - lead name normalization

use lazy_regex::regex_is_match;
use thiserror::Error;

/// Minimum/maximum length of the name rendered into a video (characters)
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 30;

/// Limits for the paid custom prompt
pub const CUSTOM_PROMPT_MIN_CHARS: usize = 10;
pub const CUSTOM_PROMPT_MAX_CHARS: usize = 1000;

/// Limits for the free prompt
pub const FREE_PROMPT_MIN_CHARS: usize = 10;
pub const FREE_PROMPT_MAX_CHARS: usize = 500;

/// Lower-case substrings that make input unacceptable. Substring matching
/// means harmless words containing a token are rejected too.
pub const BLOCKED_TERMS: &[&str] = &[
    "хуй", "пизд", "ебл", "ебан", "ебат", "бля", "сука", "уеб", "мудак", "мудил", "гандон", "педик", "пидор", "хер",
    "манда", "шлюха", "блядь", "ублюдок", "долбоеб", "говно", "жопа", "fuck", "shit", "bitch", "ass", "dick", "cunt",
    "whore",
];

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Text is too short: {actual} < {min} characters")]
    TooShort { min: usize, actual: usize },

    #[error("Text is too long: {actual} > {max} characters")]
    TooLong { max: usize, actual: usize },

    #[error("Text contains a blocked term")]
    BlockedTerm,

    #[error("Invalid e-mail address: {0}")]
    InvalidEmail(String),
}

/// Case-insensitive substring screen against [`BLOCKED_TERMS`].
pub fn contains_blocked_term(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BLOCKED_TERMS.iter().any(|term| lowered.contains(term))
}

fn check_length(text: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual < min {
        return Err(ValidationError::TooShort { min, actual });
    }
    if actual > max {
        return Err(ValidationError::TooLong { max, actual });
    }
    Ok(())
}

/// Validates the name rendered into a catalog video.
///
/// Returns the trimmed name on success.
///
/// # Examples
/// ```
/// use meemee::core::validation::validate_name;
///
/// assert_eq!(validate_name("  Маша ").unwrap(), "Маша");
/// assert!(validate_name("A").is_err());
/// ```
pub fn validate_name(text: &str) -> Result<String, ValidationError> {
    let name = text.trim();
    check_length(name, NAME_MIN_CHARS, NAME_MAX_CHARS)?;
    if contains_blocked_term(name) {
        return Err(ValidationError::BlockedTerm);
    }
    Ok(name.to_string())
}

/// Validates a paid custom prompt. Only length is checked.
pub fn validate_custom_prompt(text: &str) -> Result<String, ValidationError> {
    let prompt = text.trim();
    check_length(prompt, CUSTOM_PROMPT_MIN_CHARS, CUSTOM_PROMPT_MAX_CHARS)?;
    Ok(prompt.to_string())
}

/// Validates a free prompt: length plus the blocked-term screen.
pub fn validate_free_prompt(text: &str) -> Result<String, ValidationError> {
    let prompt = text.trim();
    check_length(prompt, FREE_PROMPT_MIN_CHARS, FREE_PROMPT_MAX_CHARS)?;
    if contains_blocked_term(prompt) {
        return Err(ValidationError::BlockedTerm);
    }
    Ok(prompt.to_string())
}

/// Validates the e-mail used for a card receipt: `local@domain.tld`, no whitespace.
pub fn validate_email(text: &str) -> Result<String, ValidationError> {
    let email = text.trim();
    if regex_is_match!(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", email) {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Normalizes a lead name: trims it and upper-cases the first letter of each word.
///
/// Returns `None` when nothing is left after trimming.
pub fn normalize_lead_name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut result = String::with_capacity(trimmed.len());
    let mut at_word_start = true;
    for c in trimmed.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.push(c);
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    Some(result)
}
