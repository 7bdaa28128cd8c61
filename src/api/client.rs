//! Azure DevOps API client construction.
//!
//! Tokens are per organization, and which organization a command talks to is
//! only known once the selector and remotes are resolved. The client
//! therefore builds the underlying REST client on each call from the
//! token configured for that organization.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use azure_devops_rust_api::{Credential, git};
use secrecy::{ExposeSecret, SecretString};

use super::traits::{PullRequestOperations, RealGitOperations, RepositoryOperations, SearchCriteria};
use crate::config::{Config, PAT_ENV};
use crate::error::ConfigError;
use crate::models::{GitRepositoryRecord, PullRequest};

/// Azure DevOps client authenticated with personal access tokens.
///
/// # Example
///
/// ```rust,no_run
/// use azdo::Config;
/// use azdo::api::{AzureDevOpsClient, PullRequestOperations};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = Config::load_from_file()?.merge(Config::load_from_env());
/// let client = AzureDevOpsClient::new(config);
/// let pr = client.get_pull_request_by_id("my-org", "my-project", 42).await?;
/// println!("{}", pr.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AzureDevOpsClient {
    config: Arc<Config>,
}

impl AzureDevOpsClient {
    pub fn new(config: impl Into<Arc<Config>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// REST operations authenticated for `organization`.
    ///
    /// # Errors
    ///
    /// Fails when neither the organization nor the global configuration
    /// holds a token.
    pub fn git_operations(&self, organization: &str) -> Result<RealGitOperations> {
        let pat = self
            .config
            .pat_for(organization)
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "pat".to_string(),
                env_var: PAT_ENV.to_string(),
            })?;
        tracing::debug!(organization, "Creating Azure DevOps git client");
        Ok(RealGitOperations::new(git_client(&pat)))
    }
}

fn git_client(pat: &SecretString) -> git::Client {
    let credential = Credential::from_pat(pat.expose_secret().to_string());
    git::ClientBuilder::new(credential).build()
}

#[async_trait]
impl PullRequestOperations for AzureDevOpsClient {
    async fn get_pull_request_by_id(
        &self,
        organization: &str,
        project: &str,
        pull_request_id: i32,
    ) -> Result<PullRequest> {
        self.git_operations(organization)?
            .get_pull_request_by_id(organization, project, pull_request_id)
            .await
    }

    async fn get_pull_requests(
        &self,
        organization: &str,
        project: &str,
        repository_id: &str,
        criteria: &SearchCriteria,
        top: i32,
    ) -> Result<Vec<PullRequest>> {
        self.git_operations(organization)?
            .get_pull_requests(organization, project, repository_id, criteria, top)
            .await
    }
}

#[async_trait]
impl RepositoryOperations for AzureDevOpsClient {
    async fn get_repositories(
        &self,
        organization: &str,
        project: &str,
        include_hidden: bool,
    ) -> Result<Vec<GitRepositoryRecord>> {
        self.git_operations(organization)?
            .get_repositories(organization, project, include_hidden)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrganizationSettings;
    use crate::parsed_property::ParsedProperty;

    /// # Missing Token
    ///
    /// Tests that a call for an organization without a token fails before
    /// any request is made.
    ///
    /// ## Test Scenario
    /// - Configures a token for `fabrikam` only
    /// - Lists repositories of `contoso`
    ///
    /// ## Expected Outcome
    /// - The error names the missing `pat` setting
    #[tokio::test]
    async fn test_missing_pat_is_a_config_error() {
        let mut config = Config::default();
        config.organizations.insert(
            "fabrikam".to_string(),
            OrganizationSettings {
                url: None,
                pat: Some(SecretString::from("secret".to_string())),
            },
        );
        let client = AzureDevOpsClient::new(config);

        let err = client
            .get_repositories("contoso", "project", true)
            .await
            .unwrap_err();
        let config_error = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_error, ConfigError::MissingRequired { field, .. } if field == "pat"));

        assert!(client.git_operations("Fabrikam").is_ok());
    }

    #[test]
    fn test_global_pat_applies_to_every_organization() {
        let config = Config {
            pat: Some(ParsedProperty::Default(SecretString::from("secret".to_string()))),
            ..Config::default()
        };
        let client = AzureDevOpsClient::new(config);
        assert!(client.git_operations("contoso").is_ok());
        assert!(client.git_operations("fabrikam").is_ok());
    }
}
