//! Azure DevOps REST collaborator.
//!
//! The rest of the crate talks to Azure DevOps only through the traits
//! re-exported here, so every resolution path can run against the mocks.

mod client;
mod mappers;
mod traits;

pub use client::AzureDevOpsClient;
pub use traits::{
    GitOperations, PullRequestOperations, RealGitOperations, RepositoryOperations, SearchCriteria,
};

#[cfg(test)]
pub use traits::mocks;
