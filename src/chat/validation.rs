//! Comment validation
//!
//! Length is measured in UTF-16 code units, the unit browsers report for
//! text input length.

use thiserror::Error;

/// Default maximum comment length
pub const MAX_COMMENT_LEN: usize = 1000;

/// Why a comment was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No message written")]
    Empty,

    #[error("Message is too long ({len} of at most {max} characters)")]
    TooLong { len: usize, max: usize },
}

/// Length of a comment as the input field counts it
pub fn comment_len(comment: &str) -> usize {
    comment.encode_utf16().count()
}

/// Accept a non-empty comment of at most `max` units
pub fn validate_comment(comment: &str, max: usize) -> Result<(), ValidationError> {
    if comment.is_empty() {
        return Err(ValidationError::Empty);
    }

    let len = comment_len(comment);
    if len > max {
        return Err(ValidationError::TooLong { len, max });
    }

    Ok(())
}
