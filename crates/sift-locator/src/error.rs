//! Error types for locator processing and item retrieval.

use thiserror::Error;

/// Errors that can occur while parsing a locator or retrieving items with it.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Syntactic violation: unbalanced parentheses, bad escape, bad name.
    #[error("bad locator syntax: {message}{}", position_suffix(.position))]
    Malformed {
        message: String,
        position: Option<usize>,
    },

    /// A dimension name not known to the finder.
    #[error("unknown dimension '{name}'; supported dimensions are: {}", .supported.join(", "))]
    UnknownDimension {
        name: String,
        supported: Vec<String>,
    },

    /// Known dimensions left unread after the whole locator was processed.
    #[error("locator {} {} ignored: {}", plural(.names.len(), "dimension", "dimensions"), plural(.names.len(), "was", "were"), .names.join(", "))]
    UnusedDimension { names: Vec<String> },

    /// A single-valued dimension given more than once.
    #[error("only a single '{name}' dimension is supported, found {count}")]
    RepeatedDimension { name: String, count: usize },

    /// A dimension value that cannot be converted to its declared type.
    #[error("invalid value '{value}' for dimension '{dimension}': {reason}")]
    TypeConversion {
        dimension: String,
        value: String,
        reason: String,
    },

    /// Invalid regular expression in a `matches`/`does-not-match` condition.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Structurally disallowed combination of dimensions.
    #[error("unsupported locator: {0}")]
    UnsupportedCombination(String),

    /// Nothing matched where exactly one item was required.
    #[error("nothing found by locator '{0}'")]
    NotFound(String),

    /// More than one item matched where exactly one was required.
    #[error("locator '{locator}' matched more than one item")]
    MultipleMatches { locator: String },

    /// A collaborator refused access to an item.
    #[error("access denied: {0}")]
    AccessDenied(String),
}

/// Machine-distinguishable category of a [`LocatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Malformed,
    UnknownDimension,
    UnusedDimension,
    RepeatedDimension,
    TypeConversion,
    UnsupportedCombination,
    NotFound,
    MultipleMatches,
    AccessDenied,
}

impl LocatorError {
    /// Creates a syntax error without position information.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            position: None,
        }
    }

    /// Creates a syntax error pointing at a byte offset of the locator text.
    pub fn malformed_at(message: impl Into<String>, position: usize) -> Self {
        Self::Malformed {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Creates a type conversion error for a dimension value.
    pub fn conversion(
        dimension: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeConversion {
            dimension: dimension.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-combination error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedCombination(message.into())
    }

    /// Creates an access-denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::UnknownDimension { .. } => ErrorKind::UnknownDimension,
            Self::UnusedDimension { .. } => ErrorKind::UnusedDimension,
            Self::RepeatedDimension { .. } => ErrorKind::RepeatedDimension,
            Self::TypeConversion { .. } | Self::InvalidRegex(_) => ErrorKind::TypeConversion,
            Self::UnsupportedCombination(_) => ErrorKind::UnsupportedCombination,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MultipleMatches { .. } => ErrorKind::MultipleMatches,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
        }
    }

    /// Returns `true` for errors in the locator-processing family: the query
    /// itself is structurally wrong for this finder.
    pub fn is_locator_processing(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Malformed
                | ErrorKind::UnknownDimension
                | ErrorKind::UnusedDimension
                | ErrorKind::RepeatedDimension
                | ErrorKind::UnsupportedCombination
        )
    }

    /// Returns `true` when a well-formed dimension carried a value that could
    /// not be interpreted.
    pub fn is_bad_request(&self) -> bool {
        self.kind() == ErrorKind::TypeConversion
    }

    /// Returns `true` if this error is an access denial from a collaborator.
    pub fn is_access_denied(&self) -> bool {
        self.kind() == ErrorKind::AccessDenied
    }
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(pos) => format!(" (at position {pos})"),
        None => String::new(),
    }
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Result type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        assert_eq!(LocatorError::malformed("x").kind(), ErrorKind::Malformed);
        assert_eq!(
            LocatorError::conversion("count", "abc", "not a number").kind(),
            ErrorKind::TypeConversion
        );
        assert_eq!(
            LocatorError::unsupported("two or groups").kind(),
            ErrorKind::UnsupportedCombination
        );
    }

    #[test]
    fn classification() {
        assert!(LocatorError::malformed("x").is_locator_processing());
        assert!(LocatorError::UnusedDimension {
            names: vec!["a".into()]
        }
        .is_locator_processing());
        assert!(!LocatorError::conversion("a", "b", "c").is_locator_processing());
        assert!(LocatorError::conversion("a", "b", "c").is_bad_request());
        assert!(LocatorError::access_denied("no").is_access_denied());
    }

    #[test]
    fn messages() {
        assert_eq!(
            LocatorError::malformed_at("unbalanced parenthesis", 4).to_string(),
            "bad locator syntax: unbalanced parenthesis (at position 4)"
        );
        assert_eq!(
            LocatorError::UnusedDimension {
                names: vec!["state".into()]
            }
            .to_string(),
            "locator dimension was ignored: state"
        );
        assert_eq!(
            LocatorError::UnusedDimension {
                names: vec!["a".into(), "b".into()]
            }
            .to_string(),
            "locator dimensions were ignored: a, b"
        );
        assert_eq!(
            LocatorError::RepeatedDimension {
                name: "a".into(),
                count: 2
            }
            .to_string(),
            "only a single 'a' dimension is supported, found 2"
        );
    }
}
