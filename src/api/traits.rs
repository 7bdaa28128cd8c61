//! Traits for Azure DevOps API operations.
//!
//! These traits abstract the Azure DevOps API operations to enable:
//! - Mocking for unit tests
//! - Alternative implementations
//!
//! Implementations return domain models; the REST types never leave this
//! module and [`super::mappers`].

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{GitRepositoryRecord, PullRequest};

/// Filters for a pull request search. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Full ref name, e.g. `refs/heads/feature`.
    pub source_ref_name: Option<String>,
    /// Full ref name, e.g. `refs/heads/main`.
    pub target_ref_name: Option<String>,
    /// REST status such as `active` or `completed`.
    pub status: Option<String>,
}

/// Trait for pull request operations.
#[async_trait]
pub trait PullRequestOperations: Send + Sync {
    /// Fetches a single pull request by ID within a project.
    async fn get_pull_request_by_id(
        &self,
        organization: &str,
        project: &str,
        pull_request_id: i32,
    ) -> Result<PullRequest>;

    /// Searches the pull requests of a repository.
    ///
    /// # Arguments
    ///
    /// * `organization` - Azure DevOps organization name
    /// * `project` - Project name
    /// * `repository_id` - Repository UUID
    /// * `criteria` - Search filters
    /// * `top` - Maximum number of pull requests to return
    async fn get_pull_requests(
        &self,
        organization: &str,
        project: &str,
        repository_id: &str,
        criteria: &SearchCriteria,
        top: i32,
    ) -> Result<Vec<PullRequest>>;
}

/// Trait for repository operations.
#[async_trait]
pub trait RepositoryOperations: Send + Sync {
    /// Lists the repositories of a project.
    async fn get_repositories(
        &self,
        organization: &str,
        project: &str,
        include_hidden: bool,
    ) -> Result<Vec<GitRepositoryRecord>>;
}

/// Combined trait for all Git-related operations.
pub trait GitOperations: PullRequestOperations + RepositoryOperations + Send + Sync {}

impl<T> GitOperations for T where T: PullRequestOperations + RepositoryOperations + Send + Sync {}

/// Real implementation wrapping azure_devops_rust_api::git::Client.
#[derive(Clone)]
pub struct RealGitOperations {
    client: azure_devops_rust_api::git::Client,
}

impl RealGitOperations {
    /// Creates a new RealGitOperations wrapper.
    pub fn new(client: azure_devops_rust_api::git::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PullRequestOperations for RealGitOperations {
    async fn get_pull_request_by_id(
        &self,
        organization: &str,
        project: &str,
        pull_request_id: i32,
    ) -> Result<PullRequest> {
        let pr = self
            .client
            .pull_requests_client()
            .get_pull_request_by_id(organization, pull_request_id, project)
            .await?;
        Ok(pr.into())
    }

    async fn get_pull_requests(
        &self,
        organization: &str,
        project: &str,
        repository_id: &str,
        criteria: &SearchCriteria,
        top: i32,
    ) -> Result<Vec<PullRequest>> {
        let mut request = self
            .client
            .pull_requests_client()
            .get_pull_requests(organization, repository_id, project)
            .top(top);

        if let Some(source) = &criteria.source_ref_name {
            request = request.search_criteria_source_ref_name(source);
        }
        if let Some(target) = &criteria.target_ref_name {
            request = request.search_criteria_target_ref_name(target);
        }
        if let Some(status) = &criteria.status {
            request = request.search_criteria_status(status);
        }

        let response = request.await?;
        Ok(response.value.into_iter().map(PullRequest::from).collect())
    }
}

#[async_trait]
impl RepositoryOperations for RealGitOperations {
    async fn get_repositories(
        &self,
        organization: &str,
        project: &str,
        include_hidden: bool,
    ) -> Result<Vec<GitRepositoryRecord>> {
        let response = self
            .client
            .repositories_client()
            .list(organization, project)
            .include_hidden(include_hidden)
            .await?;
        Ok(response
            .value
            .into_iter()
            .map(GitRepositoryRecord::from)
            .collect())
    }
}
