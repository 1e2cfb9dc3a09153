// Error types for the subscription book, the add/edit form and backups.
//
// Domain failures are typed with `thiserror`; the binaries wrap them in
// `anyhow` at the edges.

use thiserror::Error;

/// Rejections raised while validating add/edit form input.
///
/// A rejected form is a no-op: nothing is mutated and nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The amount text is not a finite decimal number.
    #[error("invalid amount '{input}': expected a decimal number")]
    InvalidAmount { input: String },

    /// The amount parsed but is below zero.
    #[error("invalid amount '{input}': must not be negative")]
    NegativeAmount { input: String },

    /// The amount is above the largest accepted cost.
    #[error("invalid amount '{input}': must not exceed 1000000000")]
    AmountTooLarge { input: String },

    /// The date text is not a `YYYY-MM-DD` calendar date.
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },
}

/// Errors returned by `SubscriptionBook` mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// No subscription with this id (or at this position) exists.
    #[error("subscription not found: {0}")]
    NotFound(String),

    /// The submitted form did not validate.
    #[error(transparent)]
    Form(#[from] FormError),
}

/// Errors raised while decoding a backup document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackupError {
    /// The backup content is not a valid backup document.
    #[error("undecodable backup: {message}")]
    Decode { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_error_invalid_amount_formats_correctly() {
        let err = FormError::InvalidAmount {
            input: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid amount 'abc': expected a decimal number"
        );
    }

    #[test]
    fn form_error_negative_amount_formats_correctly() {
        let err = FormError::NegativeAmount {
            input: "-3".to_string(),
        };
        assert_eq!(err.to_string(), "invalid amount '-3': must not be negative");
    }

    #[test]
    fn form_error_amount_too_large_formats_correctly() {
        let err = FormError::AmountTooLarge {
            input: "1e308".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid amount '1e308': must not exceed 1000000000"
        );
    }

    #[test]
    fn book_error_wraps_form_error_transparently() {
        let err: BookError = FormError::InvalidDate {
            input: "31/01/2025".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid date '31/01/2025': expected YYYY-MM-DD");
    }

    #[test]
    fn book_error_not_found_formats_correctly() {
        let err = BookError::NotFound("1234".to_string());
        assert_eq!(err.to_string(), "subscription not found: 1234");
    }
}
