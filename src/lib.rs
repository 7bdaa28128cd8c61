//! # azdo
//!
//! Command-line client for Azure DevOps pull requests. The library resolves
//! which repository and pull request a command refers to:
//!
//! - git remote URL parsing and Azure DevOps name parsing
//! - remote preference and base repository resolution
//! - pull request lookup by ID, qualified selector or current branch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use azdo::{AzureDevOpsClient, Config, Context, FindOptions, Finder, git::GitCli};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Arc::new(Config::load_from_file()?.merge(Config::load_from_env()));
//! let context = Context::new(
//!     config.clone(),
//!     Arc::new(GitCli::new(".")),
//!     Arc::new(AzureDevOpsClient::new(config)),
//! );
//!
//! let options = FindOptions {
//!     selector: "42".to_string(),
//!     ..FindOptions::default()
//! };
//! let (pr, repository) = Finder::new(&context).find(&options).await?;
//! println!("{} in {}", pr.title, repository);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod finder;
pub mod git;
pub mod logging;
pub mod models;
pub mod parsed_property;
pub mod remotes;
pub mod repo;

// Re-export commonly used types for convenience
pub use api::AzureDevOpsClient;
pub use config::Config;
pub use context::Context;
pub use error::AzdoError;
pub use finder::{FindOptions, Finder, Selector};
pub use models::Args;
pub use repo::Repository;

/// Core result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
