use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;

use crate::logging::{LogFormat, LogLevel};

/// A pull request as azdo presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    /// Lowercase REST status: `active`, `completed`, `abandoned`, ...
    pub status: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub is_draft: bool,
    pub created_by: CreatedBy,
    /// RFC 3339 timestamp.
    pub creation_date: String,
    pub repository_id: String,
    pub repository_name: String,
    /// REST resource URL of the pull request.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedBy {
    pub display_name: String,
}

/// The REST record of a git repository, carrying its stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRepositoryRecord {
    pub id: String,
    pub name: String,
    pub project: String,
    pub default_branch: Option<String>,
    pub ssh_url: Option<String>,
    pub remote_url: Option<String>,
    pub web_url: Option<String>,
    pub is_fork: bool,
}

/// Output format for commands that print data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Protocol used when printing clone URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum GitProtocol {
    #[default]
    Https,
    Ssh,
}

impl GitProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitProtocol::Https => "https",
            GitProtocol::Ssh => "ssh",
        }
    }

    /// Parse a protocol name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "https" => Some(Self::Https),
            "ssh" => Some(Self::Ssh),
            _ => None,
        }
    }
}

impl std::fmt::Display for GitProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options shared by every command.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct GlobalArgs {
    /// Select another repository using the ORGANIZATION/PROJECT/REPO format
    #[arg(short = 'R', long, global = true, value_name = "ORGANIZATION/PROJECT/REPO")]
    pub repo: Option<String>,

    /// Azure DevOps organization used when a name omits it
    #[arg(short, long, global = true, help_heading = "Azure DevOps Connection")]
    pub organization: Option<String>,

    /// Log level (trace, debug, info, warn, error) [env: AZDO_LOG_LEVEL]
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<LogLevel>,

    /// Append logs to this file instead of stderr [env: AZDO_LOG_FILE]
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Log format (text, json) [env: AZDO_LOG_FORMAT]
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<LogFormat>,
}

/// Arguments for `azdo pr view`.
#[derive(ClapArgs, Clone, Debug, Default)]
pub struct PrViewArgs {
    /// Pull request to show: [[ORGANIZATION/][PROJECT/]REPO:]#<id>.
    /// Defaults to the pull request of the current branch.
    pub selector: Option<String>,

    /// Only match a pull request whose source branch is BASE
    #[arg(short, long = "base", value_name = "BASE")]
    pub base_branch: Option<String>,

    /// Only match pull requests in these states (repeatable)
    #[arg(short, long = "state", value_name = "STATE")]
    pub states: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PrCommands {
    /// Show a pull request
    #[command(
        long_about = "Show a pull request.\n\n\
            Without a selector, the pull request is found from the current branch:\n\
            a branch tracking refs/pull/<id>/head resolves to that pull request,\n\
            any other branch is searched by source branch.",
        after_help = "EXAMPLES:\n    \
            azdo pr view\n    \
            azdo pr view 42\n    \
            azdo pr view myorg/project/repo:#42 --state active"
    )]
    View(PrViewArgs),
}

/// Arguments for `azdo remote url`.
#[derive(ClapArgs, Clone, Debug, Default)]
pub struct RemoteUrlArgs {
    /// Protocol of the printed URL [env: AZDO_GIT_PROTOCOL]
    #[arg(long = "protocol", value_enum)]
    pub git_protocol: Option<GitProtocol>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum RemoteCommands {
    /// List git remotes that point at Azure DevOps repositories
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the clone URL of the base repository
    Url(RemoteUrlArgs),
}

/// Available commands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Work with pull requests
    #[command(subcommand)]
    Pr(PrCommands),

    /// Inspect Azure DevOps git remotes
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Parser, Clone, Debug)]
#[command(
    name = "azdo",
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("AZDO_BUILD_COMMIT"), ")"),
    about = "Work with Azure DevOps pull requests from the command line",
    long_about = "Work with Azure DevOps pull requests from the command line.\n\n\
        The repository is taken from the git remotes of the current directory\n\
        (upstream, then azdo, then origin) unless --repo is given.\n\n\
        Configuration can be provided via CLI arguments, environment variables (AZDO_*)\n\
        or the config file (~/.config/azdo/config.toml)."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Create a sample configuration file at ~/.config/azdo/config.toml
    #[arg(long)]
    pub create_config: bool,
}

impl Args {
    /// Git protocol requested on the command line, if the command takes one.
    pub fn git_protocol(&self) -> Option<GitProtocol> {
        match &self.command {
            Some(Commands::Remote(RemoteCommands::Url(args))) => args.git_protocol,
            _ => None,
        }
    }
}
