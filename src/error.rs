//! Global error handling for tokenkit
//!
//! This module provides a centralized error type that can represent errors
//! from all modules in the project.

use thiserror::Error;

use crate::tokenizer::TokenizerError;

/// Global error type for tokenkit operations
#[derive(Error, Debug)]
pub enum Error {
    /// Token counting or embedding failed; the provider error is kept as is
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// A fragment stayed above the ceiling after every enabled delimiter
    #[error(
        "Cannot split text below {max_tokens} tokens: a fragment of {tokens} tokens has no remaining boundary"
    )]
    SegmentationImpossible {
        /// Measured size of the offending fragment
        tokens: usize,
        /// Requested ceiling
        max_tokens: usize,
    },

    /// Message trimming was requested without a positive token budget
    #[error("A positive max_tokens budget is required to trim messages")]
    MissingBudget,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized Result type for tokenkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Creates an Error with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::Error::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}
