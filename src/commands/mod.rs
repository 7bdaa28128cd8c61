//! Command implementations behind the `azdo` binary.
//!
//! Each command writes its result to the given writer so the rendering can
//! be tested without a terminal.

pub mod pr;
pub mod remote;

use std::io::Write;

use anyhow::Result;

use crate::context::Context;
use crate::error::AzdoError;
use crate::models::{Commands, GitProtocol, PrCommands, RemoteCommands};

/// Process exit codes of `azdo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// The command completed.
    Success = 0,

    /// Configuration, validation, git or REST failure.
    GeneralError = 1,

    /// The lookup worked but matched nothing.
    NoResults = 2,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Command completed successfully",
            ExitCode::GeneralError => "General error occurred",
            ExitCode::NoResults => "Nothing matched the request",
        }
    }

    /// Exit code for a failed command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<AzdoError>() {
            Some(e) if e.is_not_found() => ExitCode::NoResults,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Run `command` against `context`.
pub async fn run<W: Write>(
    command: &Commands,
    context: &Context,
    protocol: GitProtocol,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Pr(PrCommands::View(args)) => pr::view(context, args, out).await,
        Commands::Remote(RemoteCommands::List { format }) => {
            remote::list(context, *format, out).await
        }
        Commands::Remote(RemoteCommands::Url(_)) => remote::url(context, protocol, out).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    /// # Exit Code Mapping
    ///
    /// Tests how command errors map to process exit codes.
    ///
    /// ## Test Scenario
    /// - A NoResults error, a validation error and a plain anyhow error
    ///
    /// ## Expected Outcome
    /// - Only NoResults exits with 2, everything else with 1
    #[test]
    fn test_exit_code_for_error() {
        let not_found = anyhow::Error::new(AzdoError::no_results("no pull requests found"));
        assert_eq!(ExitCode::for_error(&not_found), ExitCode::NoResults);

        let invalid = anyhow::Error::new(AzdoError::from(ValidationError::InvalidSelector {
            input: "x".to_string(),
        }));
        assert_eq!(ExitCode::for_error(&invalid), ExitCode::GeneralError);

        let other = anyhow::anyhow!("io failure");
        assert_eq!(ExitCode::for_error(&other), ExitCode::GeneralError);

        assert_eq!(ExitCode::NoResults.code(), 2);
        assert_eq!(ExitCode::Success.code(), 0);
    }
}
