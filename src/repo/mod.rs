//! Resolved Azure DevOps repositories.

mod name;

pub use name::{
    OrganizationName, ProjectName, RepositoryName, build_repository, normalized_host,
    parse_organization, parse_project, parse_repository, project_from_url, repository_from_url,
};

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use url::Url;

use crate::api::RepositoryOperations;
use crate::config::{DEFAULT_HOST, OrganizationConfig};
use crate::error::{AzdoError, AzdoResult};
use crate::models::GitRepositoryRecord;

/// A remote Azure DevOps git repository.
///
/// The identity fields never change. The REST record is fetched on first
/// use and shared by every clone of the value.
#[derive(Debug, Clone)]
pub struct Repository {
    name: RepositoryName,
    hostname: String,
    record: Arc<OnceCell<GitRepositoryRecord>>,
}

impl Repository {
    pub fn new(name: RepositoryName, hostname: impl Into<String>) -> Self {
        Self {
            name,
            hostname: hostname.into(),
            record: Arc::new(OnceCell::new()),
        }
    }

    /// Build from `[ORGANIZATION/]PROJECT/REPO`, hosted where the
    /// organization's configured URL points.
    pub fn from_full_name(full_name: &str, config: &dyn OrganizationConfig) -> AzdoResult<Self> {
        let name = parse_repository(full_name, config)?;
        let hostname = organization_hostname(name.organization(), config);
        Ok(Self::new(name, hostname))
    }

    /// Build from a git remote URL.
    pub fn from_url(url: &Url, config: &dyn OrganizationConfig) -> AzdoResult<Self> {
        let name = repository_from_url(url, config)?;
        let hostname = normalized_host(url.host_str().unwrap_or(DEFAULT_HOST), name.organization());
        Ok(Self::new(name, hostname))
    }

    pub fn organization(&self) -> &str {
        self.name.organization()
    }

    pub fn project(&self) -> &str {
        self.name.project()
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn repository_name(&self) -> &RepositoryName {
        &self.name
    }

    pub fn full_name(&self) -> String {
        self.name.full_name()
    }

    /// The REST record of this repository, fetched once.
    ///
    /// Lists every repository of the project, hidden ones included, and
    /// picks the one whose name matches case-insensitively.
    pub async fn git_repository<C>(&self, client: &C) -> AzdoResult<&GitRepositoryRecord>
    where
        C: RepositoryOperations + ?Sized,
    {
        self.record
            .get_or_try_init(|| async {
                tracing::debug!(repository = %self.full_name(), "Fetching repository record");

                let repositories = client
                    .get_repositories(self.organization(), self.project(), true)
                    .await
                    .map_err(|e| {
                        AzdoError::api(
                            format!("failed to list repositories of project '{}'", self.project()),
                            e,
                        )
                    })?;

                if repositories.is_empty() {
                    return Err(AzdoError::no_results(format!(
                        "no repositories found in project '{}/{}'",
                        self.organization(),
                        self.project()
                    )));
                }

                repositories
                    .into_iter()
                    .find(|r| r.name.eq_ignore_ascii_case(self.name()))
                    .ok_or_else(|| {
                        AzdoError::no_results(format!(
                            "repository '{}' not found",
                            self.full_name()
                        ))
                    })
            })
            .await
    }

    /// Clone URL for the given protocol.
    ///
    /// `ssh` yields the scp form, anything else the https form.
    pub fn remote_url(&self, protocol: &str) -> String {
        if protocol == "ssh" {
            format!(
                "git@ssh.{}:v3/{}/{}/{}",
                self.hostname,
                self.organization(),
                self.project(),
                self.name()
            )
        } else {
            format!(
                "https://{}/{}/{}/_git/{}",
                self.hostname,
                self.organization(),
                self.project(),
                self.name()
            )
        }
    }
}

fn organization_hostname(organization: &str, config: &dyn OrganizationConfig) -> String {
    Url::parse(&config.organization_url(organization))
        .ok()
        .and_then(|u| u.host_str().map(|h| normalized_host(h, organization)))
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

fn comparable_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        comparable_host(&self.hostname) == comparable_host(&other.hostname)
            && self.organization().eq_ignore_ascii_case(other.organization())
            && self.project().eq_ignore_ascii_case(other.project())
            && self.name().eq_ignore_ascii_case(other.name())
    }
}

impl Eq for Repository {}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
