//! Error type for API misuse.
//!
//! Solving outcomes are never errors: checks report [`crate::LBool`].

use crate::ast::SortFamily;
use thiserror::Error;

/// Error type for MBQI operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MbqiError {
    /// A projection plugin for this family is already registered
    #[error("duplicate projection plugin for family {0}")]
    DuplicatePlugin(SortFamily),
    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for MBQI operations
pub type MbqiResult<T> = Result<T, MbqiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MbqiError::DuplicatePlugin(SortFamily::Arith);
        assert_eq!(err.to_string(), "duplicate projection plugin for family arith");
        let err = MbqiError::InvalidConfig("mbqi_max_cexs must be positive".into());
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
