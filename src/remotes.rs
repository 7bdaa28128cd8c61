//! Git remotes resolved to Azure DevOps repositories.

use std::cmp::Reverse;
use std::ops::Deref;

use url::Url;

use crate::config::OrganizationConfig;
use crate::error::{AzdoError, AzdoResult};
use crate::git::GitRemote;
use crate::repo::Repository;

/// Marker value of `remote.<name>.azdo-resolved` that designates the base remote.
pub const BASE_MARKER: &str = "base";

/// A git remote pointing at an Azure DevOps repository.
#[derive(Debug, Clone)]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<Url>,
    pub push_url: Option<Url>,
    pub repository: Repository,
    /// Value of `remote.<name>.azdo-resolved`, empty when unset.
    pub resolved: String,
}

impl Remote {
    /// Preference of this remote when several point at Azure DevOps.
    pub fn score(&self) -> u8 {
        match self.name.as_str() {
            "upstream" => 3,
            "azdo" => 2,
            "origin" => 1,
            _ => 0,
        }
    }
}

/// Ordered set of resolved remotes.
#[derive(Debug, Clone, Default)]
pub struct Remotes(Vec<Remote>);

impl Remotes {
    pub fn new(remotes: Vec<Remote>) -> Self {
        Self(remotes)
    }

    /// First remote matching the candidate names, tried in order.
    ///
    /// Every remote is checked against one candidate before moving on to the
    /// next. `*` matches the first remote.
    pub fn find_by_name(&self, names: &[&str]) -> AzdoResult<&Remote> {
        names
            .iter()
            .find_map(|candidate| {
                self.0
                    .iter()
                    .find(|remote| *candidate == "*" || remote.name == *candidate)
            })
            .ok_or_else(|| AzdoError::no_results("no matching remote found"))
    }

    /// First remote whose repository matches `project` and `name`, ignoring case.
    pub fn find_by_repo(&self, project: &str, name: &str) -> AzdoResult<&Remote> {
        self.0
            .iter()
            .find(|remote| {
                remote.repository.project().eq_ignore_ascii_case(project)
                    && remote.repository.name().eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| {
                AzdoError::no_results(format!("no matching remote found for '{}/{}'", project, name))
            })
    }

    /// Remotes belonging to any of `organizations`, in their original order.
    pub fn filter_by_organization(&self, organizations: &[&str]) -> Remotes {
        Remotes(
            self.0
                .iter()
                .filter(|remote| {
                    organizations
                        .iter()
                        .any(|org| remote.repository.organization().eq_ignore_ascii_case(org))
                })
                .cloned()
                .collect(),
        )
    }

    /// Order by preference: `upstream`, `azdo`, `origin`, then the rest.
    ///
    /// Remotes of equal rank keep their relative order.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|remote| Reverse(remote.score()));
    }

    /// Repository that commands operate on by default.
    ///
    /// A remote marked `base` wins. A marker holding a full repository name
    /// designates that repository. Otherwise the first remote is used, so
    /// callers sort first.
    pub fn resolved_base(&self, config: &dyn OrganizationConfig) -> AzdoResult<Repository> {
        if let Some(remote) = self.0.iter().find(|r| r.resolved == BASE_MARKER) {
            tracing::debug!(remote = %remote.name, "Base repository from marked remote");
            return Ok(remote.repository.clone());
        }

        for remote in &self.0 {
            if remote.resolved.is_empty() {
                continue;
            }
            match Repository::from_full_name(&remote.resolved, config) {
                Ok(repository) => {
                    tracing::debug!(
                        remote = %remote.name,
                        repository = %repository,
                        "Base repository from resolved marker"
                    );
                    return Ok(repository);
                }
                Err(e) => {
                    tracing::debug!(
                        remote = %remote.name,
                        marker = %remote.resolved,
                        error = %e,
                        "Ignoring unusable resolved marker"
                    );
                }
            }
        }

        self.0
            .first()
            .map(|remote| remote.repository.clone())
            .ok_or_else(|| AzdoError::no_results("no git remotes point at Azure DevOps"))
    }
}

impl Deref for Remotes {
    type Target = [Remote];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Remotes {
    type Item = Remote;
    type IntoIter = std::vec::IntoIter<Remote>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Rewrites remote URLs before they are resolved, e.g. to expand SSH host aliases.
pub trait UrlTranslator: Send + Sync {
    fn translate(&self, url: &Url) -> Url;
}

/// [`UrlTranslator`] that leaves URLs untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl UrlTranslator for IdentityTranslator {
    fn translate(&self, url: &Url) -> Url {
        url.clone()
    }
}

/// Resolve git remotes to Azure DevOps repositories.
///
/// The fetch URL is tried first, then the push URL. Remotes pointing
/// elsewhere are dropped.
pub fn translate_remotes(
    git_remotes: Vec<GitRemote>,
    translator: &dyn UrlTranslator,
    config: &dyn OrganizationConfig,
) -> Remotes {
    let remotes = git_remotes
        .into_iter()
        .filter_map(|remote| {
            let repository = [&remote.fetch_url, &remote.push_url]
                .into_iter()
                .flatten()
                .find_map(|url| {
                    let translated = translator.translate(url);
                    Repository::from_url(&translated, config)
                        .inspect_err(|e| {
                            tracing::debug!(
                                remote = %remote.name,
                                url = %translated,
                                error = %e,
                                "Remote URL is not an Azure DevOps repository"
                            );
                        })
                        .ok()
                });

            let Some(repository) = repository else {
                tracing::debug!(remote = %remote.name, "Skipping remote");
                return None;
            };

            Some(Remote {
                name: remote.name,
                fetch_url: remote.fetch_url,
                push_url: remote.push_url,
                repository,
                resolved: remote.resolved,
            })
        })
        .collect();

    Remotes(remotes)
}
