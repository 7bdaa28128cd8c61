//! Unified error handling for the azdo library.
//!
//! Errors fall into four groups that callers treat differently:
//!
//! - [`ValidationError`]: malformed selectors, names and URLs. Reported to the
//!   user with the offending input echoed back.
//! - [`AzdoError::NoResults`]: resolution worked but found nothing. The CLI
//!   renders these as a neutral message instead of a failure.
//! - [`AzdoError::Git`] / [`AzdoError::Api`]: a collaborator failed; the
//!   wrapped chain names the operation that was attempted.
//! - [`AzdoError::CrossOrganizationMismatch`]: a remote URL points at a host
//!   that does not belong to the organization it names. Always fatal.
//!
//! ## Example
//!
//! ```rust
//! use azdo::error::{AzdoError, ValidationError};
//!
//! let err: AzdoError = ValidationError::InvalidSelector {
//!     input: "abc".to_string(),
//! }
//! .into();
//! assert!(!err.is_not_found());
//! ```

use thiserror::Error;

/// The main error type for the azdo library.
#[derive(Error, Debug)]
pub enum AzdoError {
    /// User input could not be parsed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resolution succeeded mechanically but matched nothing.
    #[error("{message}")]
    NoResults {
        /// Human readable description of what was not found.
        message: String,
    },

    /// A git subprocess failed.
    #[error("{context}: {source:#}")]
    Git {
        /// The operation that was attempted.
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// An Azure DevOps REST call failed.
    #[error("{context}: {source:#}")]
    Api {
        /// The operation that was attempted.
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// The host configured for an organization differs from the host in a URL.
    #[error(
        "organization '{organization}' is configured for host '{expected_host}' but the URL points to '{actual_host}'"
    )]
    CrossOrganizationMismatch {
        /// Organization parsed from the URL.
        organization: String,
        /// Host derived from the organization's configured URL.
        expected_host: String,
        /// Host found in the URL.
        actual_host: String,
    },

    /// Configuration could not be loaded or is incomplete.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while parsing user supplied identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The pull request selector does not follow `[[ORG/][PROJECT/]REPO:]#<id>`.
    #[error(
        "invalid pull request selector '{input}', expected [[ORGANIZATION/][PROJECT/]REPO:]#<id>"
    )]
    InvalidSelector {
        /// The selector as typed.
        input: String,
    },

    /// An organization, project or repository name is malformed.
    #[error("invalid {kind} '{input}': {reason}, expected format {expected}")]
    InvalidName {
        /// Which kind of name was being parsed (organization, project, repository).
        kind: &'static str,
        /// The value as supplied.
        input: String,
        /// The format the parser expected.
        expected: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A remote URL could not be parsed or is not an Azure DevOps URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as supplied.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },
}

/// Errors from configuration loading and lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is required but no source provided one.
    #[error(
        "Missing required configuration: {field}. Set via config file, {env_var} environment variable, or --{field} argument"
    )]
    MissingRequired {
        /// Name of the missing field.
        field: String,
        /// Environment variable name for this field.
        env_var: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },
}

impl AzdoError {
    /// Creates a [`AzdoError::NoResults`] with the given message.
    pub fn no_results(message: impl Into<String>) -> Self {
        Self::NoResults {
            message: message.into(),
        }
    }

    /// Wraps a git collaborator failure with the operation that was attempted.
    pub fn git(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Git {
            context: context.into(),
            source,
        }
    }

    /// Wraps a REST collaborator failure with the operation that was attempted.
    pub fn api(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Api {
            context: context.into(),
            source,
        }
    }

    /// Whether this error means "nothing matched" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoResults { .. })
    }
}

/// Type alias for Results using AzdoError.
///
/// Note: This is not re-exported from the crate root to avoid shadowing `anyhow::Result`.
pub type AzdoResult<T> = std::result::Result<T, AzdoError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// # Validation Error Display
    ///
    /// Tests that validation errors echo the offending input.
    ///
    /// ## Test Scenario
    /// - Creates each ValidationError variant
    /// - Tests their Display implementation
    ///
    /// ## Expected Outcome
    /// - The input and the expected format appear in the message
    #[test]
    fn test_validation_error_display() {
        let selector = ValidationError::InvalidSelector {
            input: "nope".to_string(),
        };
        assert!(selector.to_string().contains("'nope'"));
        assert!(selector.to_string().contains("#<id>"));

        let name = ValidationError::InvalidName {
            kind: "project",
            input: "_hidden".to_string(),
            expected: "[ORGANIZATION/]PROJECT",
            reason: "must not start with '_' or '.'".to_string(),
        };
        let msg = name.to_string();
        assert!(msg.contains("project '_hidden'"));
        assert!(msg.contains("[ORGANIZATION/]PROJECT"));

        let url = ValidationError::InvalidUrl {
            url: "ftp://x".to_string(),
            reason: "unsupported protocol".to_string(),
        };
        assert!(url.to_string().contains("ftp://x"));
    }

    /// # Collaborator Error Chain
    ///
    /// Tests that wrapped collaborator errors keep the operation and the cause.
    ///
    /// ## Test Scenario
    /// - Wraps an anyhow error as a git failure
    ///
    /// ## Expected Outcome
    /// - Display shows the operation followed by the cause
    /// - The source chain is preserved
    #[test]
    fn test_collaborator_error_chain() {
        let err = AzdoError::git(
            "failed to get current branch",
            anyhow::anyhow!("fatal: not a git repository"),
        );
        assert_eq!(
            err.to_string(),
            "failed to get current branch: fatal: not a git repository"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_not_found());
    }

    /// # Not Found Classification
    ///
    /// Tests that only NoResults is classified as "nothing found".
    #[test]
    fn test_is_not_found() {
        assert!(AzdoError::no_results("pull request not found").is_not_found());

        let mismatch = AzdoError::CrossOrganizationMismatch {
            organization: "org".to_string(),
            expected_host: "dev.azure.com".to_string(),
            actual_host: "example.com".to_string(),
        };
        assert!(!mismatch.is_not_found());
        assert!(mismatch.to_string().contains("example.com"));
    }

    /// # Error Conversion
    ///
    /// Tests that errors convert correctly through the From trait.
    #[test]
    fn test_error_conversion() {
        let err: AzdoError = ConfigError::MissingRequired {
            field: "organization".to_string(),
            env_var: "AZDO_ORGANIZATION".to_string(),
        }
        .into();
        assert!(matches!(err, AzdoError::Config(_)));
        assert!(err.to_string().contains("AZDO_ORGANIZATION"));

        let err: AzdoError = ValidationError::InvalidSelector {
            input: "x".to_string(),
        }
        .into();
        assert!(matches!(err, AzdoError::Validation(_)));
    }
}
