//! Pull request lookup from user selectors or the current branch.
//!
//! A selector is parsed once into a [`Selector`]. An empty selector is
//! inferred from the checked out branch: a branch tracking
//! `refs/pull/<id>/head` resolves to that pull request, any other branch is
//! searched by source ref.

use std::sync::OnceLock;

use regex::Regex;

use crate::api::SearchCriteria;
use crate::context::Context;
use crate::error::{AzdoError, AzdoResult, ValidationError};
use crate::models::PullRequest;
use crate::repo::Repository;

fn selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:(?:([^/:]+)/)?([^/:]+)/)?([^/:]+):)?#?(\d+)$")
            .expect("Invalid selector regex")
    })
}

fn pull_merge_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^refs/pull/(\d+)/head$").expect("Invalid merge ref regex"))
}

/// The repository part of a selector such as `org/project/repo:#42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub repository: String,
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    ById {
        id: i32,
        qualifier: Option<Qualifier>,
    },
    ByBranch {
        branch: String,
        /// Full name of the repository the branch tracks, when it is not the
        /// base repository.
        owner: Option<String>,
    },
}

impl Selector {
    /// Parse `[[ORGANIZATION/][PROJECT/]REPO:]#?<id>`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidSelector {
            input: input.to_string(),
        };

        let captures = selector_regex().captures(input.trim()).ok_or_else(invalid)?;
        let id = captures[4].parse::<i32>().map_err(|_| invalid())?;

        let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string());
        let qualifier = group(3).map(|repository| Qualifier {
            organization: group(1),
            project: group(2),
            repository,
        });

        Ok(Selector::ById { id, qualifier })
    }
}

/// Parameters of a pull request lookup.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Empty means the pull request of the current branch.
    pub selector: String,
    /// Required source branch, without `refs/heads/`.
    pub base_branch: Option<String>,
    /// Accepted states; empty accepts any.
    pub states: Vec<String>,
}

pub struct Finder<'a> {
    context: &'a Context,
}

impl<'a> Finder<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self { context }
    }

    /// Locate a pull request and the repository it belongs to.
    pub async fn find(&self, options: &FindOptions) -> AzdoResult<(PullRequest, Repository)> {
        let selector = if options.selector.trim().is_empty() {
            self.selector_from_branch().await?
        } else {
            Selector::parse(&options.selector)?
        };
        tracing::debug!(?selector, "Parsed pull request selector");

        let repository = match self.qualified_repository(&selector).await? {
            Some(repository) => repository,
            None => self.context.base_repo().await?.clone(),
        };

        let pr = match &selector {
            Selector::ByBranch { branch, owner } => {
                self.find_by_branch(&repository, branch, owner.as_deref())
                    .await?
            }
            Selector::ById { id, .. } => {
                let pr = self.find_by_id(&repository, *id).await?;
                if let Some(base) = &options.base_branch {
                    let expected = format!("refs/heads/{}", base);
                    if !pr.source_ref_name.eq_ignore_ascii_case(&expected) {
                        return Err(AzdoError::no_results(format!(
                            "pull request #{} does not have base branch '{}'",
                            pr.id, base
                        )));
                    }
                }
                pr
            }
        };

        if !options.states.is_empty()
            && !options
                .states
                .iter()
                .any(|state| state.eq_ignore_ascii_case(&pr.status))
        {
            return Err(AzdoError::no_results(format!(
                "pull request #{} is {}, not {}",
                pr.id,
                pr.status,
                options.states.join(" or ")
            )));
        }

        Ok((pr, repository))
    }

    /// Repository named by a selector's qualifier, if it names one.
    ///
    /// A bare `repo:` qualifier is ignored. `project/repo:` stays within the
    /// organization of the base repository.
    async fn qualified_repository(&self, selector: &Selector) -> AzdoResult<Option<Repository>> {
        let Selector::ById {
            qualifier: Some(qualifier),
            ..
        } = selector
        else {
            return Ok(None);
        };

        let Some(project) = &qualifier.project else {
            tracing::debug!(
                qualifier = %qualifier.repository,
                "Ignoring repository qualifier without project"
            );
            return Ok(None);
        };

        let organization = match &qualifier.organization {
            Some(organization) => organization.clone(),
            None => self.context.base_repo().await?.organization().to_string(),
        };

        let full_name = format!("{}/{}/{}", organization, project, qualifier.repository);
        let repository = Repository::from_full_name(&full_name, self.context.config())?;
        tracing::debug!(repository = %repository, "Selector overrides repository");
        Ok(Some(repository))
    }

    async fn selector_from_branch(&self) -> AzdoResult<Selector> {
        let git = self.context.git();
        let current = git
            .current_branch()
            .map_err(|e| AzdoError::git("failed to get current branch", e))?;
        let branch_config = git
            .read_branch_config(&current)
            .map_err(|e| {
                AzdoError::git(format!("failed to read config of branch '{}'", current), e)
            })?;

        if let Some(merge_ref) = &branch_config.merge_ref
            && let Some(captures) = pull_merge_ref_regex().captures(merge_ref)
            && let Ok(id) = captures[1].parse::<i32>()
        {
            tracing::debug!(branch = %current, id, "Branch tracks a pull request ref");
            return Ok(Selector::ById {
                id,
                qualifier: None,
            });
        }

        let owner = if let Some(url) = &branch_config.remote_url {
            Repository::from_url(url, self.context.config())
                .ok()
                .map(|r| r.full_name())
        } else if let Some(name) = &branch_config.remote_name {
            self.context
                .remotes()
                .await?
                .find_by_name(&[name.as_str()])
                .ok()
                .map(|r| r.repository.full_name())
        } else {
            None
        };

        let branch = branch_config
            .merge_ref
            .as_deref()
            .and_then(|r| r.strip_prefix("refs/heads/"))
            .unwrap_or(&current)
            .to_string();

        let base = self.context.base_repo().await?;
        let owner = owner.filter(|owner| !owner.eq_ignore_ascii_case(&base.full_name()));

        Ok(Selector::ByBranch { branch, owner })
    }

    async fn find_by_branch(
        &self,
        repository: &Repository,
        branch: &str,
        owner: Option<&str>,
    ) -> AzdoResult<PullRequest> {
        let api = self.context.api();
        let record = repository.git_repository(api).await?;

        // The owner is informational; the search only filters by source ref.
        let qualified = match owner {
            Some(owner) => format!("{}:{}", owner, branch),
            None => branch.to_string(),
        };
        tracing::info!(branch = %qualified, repository = %repository, "Searching pull request by branch");

        let criteria = SearchCriteria {
            source_ref_name: Some(format!("refs/heads/{}", branch)),
            ..SearchCriteria::default()
        };
        let prs = api
            .get_pull_requests(
                repository.organization(),
                repository.project(),
                &record.id,
                &criteria,
                1,
            )
            .await
            .map_err(|e| {
                AzdoError::api(
                    format!("failed to search pull requests of '{}'", repository),
                    e,
                )
            })?;

        prs.into_iter().next().ok_or_else(|| {
            AzdoError::no_results(format!(
                "no pull requests found for branch '{}' in '{}'",
                branch, repository
            ))
        })
    }

    async fn find_by_id(&self, repository: &Repository, id: i32) -> AzdoResult<PullRequest> {
        tracing::info!(id, repository = %repository, "Fetching pull request");
        self.context
            .api()
            .get_pull_request_by_id(repository.organization(), repository.project(), id)
            .await
            .map_err(|e| AzdoError::api(format!("failed to get pull request #{}", id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mocks::{MockGitOperations, pull_request};
    use crate::config::mocks::StaticOrganizationConfig;
    use crate::git::mocks::MockGit;
    use crate::git::{BranchConfig, GitRemote, parse_url};
    use crate::models::GitRepositoryRecord;
    use std::sync::Arc;

    fn git_remote(name: &str, url: &str) -> GitRemote {
        let url = parse_url(url).unwrap();
        GitRemote {
            name: name.to_string(),
            fetch_url: Some(url.clone()),
            push_url: Some(url),
            resolved: String::new(),
        }
    }

    fn record(name: &str) -> GitRepositoryRecord {
        GitRepositoryRecord {
            id: format!("{}-id", name),
            name: name.to_string(),
            project: "project".to_string(),
            default_branch: Some("refs/heads/main".to_string()),
            ssh_url: None,
            remote_url: None,
            web_url: None,
            is_fork: false,
        }
    }

    /// Git on `feature` with `upstream` at contoso/project/repo and `origin` at a fork.
    fn git_on_feature() -> MockGit {
        let mut git = MockGit::on_branch("feature");
        git.remotes = vec![
            git_remote("origin", "https://dev.azure.com/contoso/project/_git/fork"),
            git_remote("upstream", "https://dev.azure.com/contoso/project/_git/repo"),
        ];
        git
    }

    fn context(git: MockGit, api: &Arc<MockGitOperations>) -> Context {
        Context::new(
            Arc::new(StaticOrganizationConfig::with_default("contoso")),
            Arc::new(git),
            api.clone(),
        )
    }

    fn by_selector(selector: &str) -> FindOptions {
        FindOptions {
            selector: selector.to_string(),
            ..FindOptions::default()
        }
    }

    /// # Selector Grammar
    ///
    /// Tests parsing of every qualifier depth.
    ///
    /// ## Test Scenario
    /// - Bare IDs with and without `#`
    /// - Qualifiers with one, two and three segments
    ///
    /// ## Expected Outcome
    /// - Segments fill from the repository leftwards
    #[test]
    fn test_selector_parse() {
        assert_eq!(
            Selector::parse("42").unwrap(),
            Selector::ById {
                id: 42,
                qualifier: None
            }
        );
        assert_eq!(Selector::parse("#42").unwrap(), Selector::parse("42").unwrap());

        assert_eq!(
            Selector::parse("upstream:42").unwrap(),
            Selector::ById {
                id: 42,
                qualifier: Some(Qualifier {
                    organization: None,
                    project: None,
                    repository: "upstream".to_string(),
                }),
            }
        );
        assert_eq!(
            Selector::parse("project/repo:#7").unwrap(),
            Selector::ById {
                id: 7,
                qualifier: Some(Qualifier {
                    organization: None,
                    project: Some("project".to_string()),
                    repository: "repo".to_string(),
                }),
            }
        );
        assert_eq!(
            Selector::parse("org/project/repo:#7").unwrap(),
            Selector::ById {
                id: 7,
                qualifier: Some(Qualifier {
                    organization: Some("org".to_string()),
                    project: Some("project".to_string()),
                    repository: "repo".to_string(),
                }),
            }
        );
    }

    #[test]
    fn test_selector_parse_rejects_malformed() {
        for input in [
            "feature",
            "#",
            "a/b/c/d:1",
            "repo:",
            "42abc",
            "99999999999",
        ] {
            assert_eq!(
                Selector::parse(input),
                Err(ValidationError::InvalidSelector {
                    input: input.to_string()
                }),
                "{input}"
            );
        }
    }

    /// # Unqualified And Repo-Qualified IDs
    ///
    /// Tests that `upstream:42` and `42` resolve identically.
    ///
    /// ## Test Scenario
    /// - Finds both selectors against a context whose base is `upstream`
    ///
    /// ## Expected Outcome
    /// - Both fetch PR 42 from contoso/project
    #[tokio::test]
    async fn test_find_by_id_ignores_bare_repo_qualifier() {
        for selector in ["upstream:42", "42"] {
            let api = Arc::new(MockGitOperations::new());
            api.pr_ops
                .set_get_pull_request_by_id_response(Ok(pull_request(42)))
                .await;
            let context = context(git_on_feature(), &api);

            let (pr, repository) = Finder::new(&context)
                .find(&by_selector(selector))
                .await
                .unwrap();

            assert_eq!(pr.id, 42);
            assert_eq!(repository.full_name(), "contoso/project/repo");
            assert_eq!(
                *api.pr_ops.get_pull_request_by_id_calls.lock().await,
                vec![("contoso".to_string(), "project".to_string(), 42)]
            );
        }
    }

    #[tokio::test]
    async fn test_find_by_id_with_organization_override() {
        let api = Arc::new(MockGitOperations::new());
        api.pr_ops
            .set_get_pull_request_by_id_response(Ok(pull_request(5)))
            .await;
        let context = context(git_on_feature(), &api);

        let (_, repository) = Finder::new(&context)
            .find(&by_selector("fabrikam/web/app:#5"))
            .await
            .unwrap();

        assert_eq!(repository.full_name(), "fabrikam/web/app");
        assert_eq!(
            *api.pr_ops.get_pull_request_by_id_calls.lock().await,
            vec![("fabrikam".to_string(), "web".to_string(), 5)]
        );
        assert_eq!(
            context.base_repo().await.unwrap().full_name(),
            "contoso/project/repo"
        );
    }

    #[tokio::test]
    async fn test_find_by_id_with_project_override() {
        let api = Arc::new(MockGitOperations::new());
        api.pr_ops
            .set_get_pull_request_by_id_response(Ok(pull_request(5)))
            .await;
        let context = context(git_on_feature(), &api);

        let (_, repository) = Finder::new(&context)
            .find(&by_selector("other/app:5"))
            .await
            .unwrap();
        assert_eq!(repository.full_name(), "contoso/other/app");
    }

    /// # Pull Request Merge Ref
    ///
    /// Tests that a branch tracking `refs/pull/<id>/head` skips the search.
    ///
    /// ## Test Scenario
    /// - Current branch `feature` merges `refs/pull/77/head`
    /// - Finds with an empty selector
    ///
    /// ## Expected Outcome
    /// - PR 77 is fetched by ID
    /// - No branch search or repository listing happens
    #[tokio::test]
    async fn test_find_from_pull_merge_ref() {
        let mut git = git_on_feature();
        git.branch_config = BranchConfig {
            remote_name: Some("upstream".to_string()),
            remote_url: None,
            merge_ref: Some("refs/pull/77/head".to_string()),
        };
        let api = Arc::new(MockGitOperations::new());
        api.pr_ops
            .set_get_pull_request_by_id_response(Ok(pull_request(77)))
            .await;
        let context = context(git, &api);

        let (pr, _) = Finder::new(&context)
            .find(&FindOptions::default())
            .await
            .unwrap();

        assert_eq!(pr.id, 77);
        assert!(api.pr_ops.get_pull_requests_calls.lock().await.is_empty());
        assert_eq!(*api.repo_ops.get_repositories_calls.lock().await, 0);
    }

    /// # Branch Search
    ///
    /// Tests the search issued for an ordinary tracking branch.
    ///
    /// ## Test Scenario
    /// - `feature` tracks `refs/heads/feature` on `upstream`
    ///
    /// ## Expected Outcome
    /// - One search with the full source ref, the repository UUID and a cap of 1
    #[tokio::test]
    async fn test_find_by_branch() {
        let mut git = git_on_feature();
        git.branch_config = BranchConfig {
            remote_name: Some("upstream".to_string()),
            remote_url: None,
            merge_ref: Some("refs/heads/feature".to_string()),
        };
        let api = Arc::new(MockGitOperations::new());
        api.repo_ops
            .set_get_repositories_response(Ok(vec![record("fork"), record("repo")]))
            .await;
        api.pr_ops
            .set_get_pull_requests_response(Ok(vec![pull_request(9)]))
            .await;
        let context = context(git, &api);

        let (pr, repository) = Finder::new(&context)
            .find(&FindOptions::default())
            .await
            .unwrap();

        assert_eq!(pr.id, 9);
        assert_eq!(repository.name(), "repo");

        let calls = api.pr_ops.get_pull_requests_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].repository_id, "repo-id");
        assert_eq!(
            calls[0].criteria.source_ref_name.as_deref(),
            Some("refs/heads/feature")
        );
        assert_eq!(calls[0].top, 1);
    }

    #[tokio::test]
    async fn test_selector_from_branch_records_foreign_owner() {
        let mut git = git_on_feature();
        git.current_branch = Some("local-name".to_string());
        git.branch_config = BranchConfig {
            remote_name: Some("origin".to_string()),
            remote_url: None,
            merge_ref: Some("refs/heads/topic".to_string()),
        };
        let api = Arc::new(MockGitOperations::new());
        let context = context(git, &api);

        let selector = Finder::new(&context).selector_from_branch().await.unwrap();
        assert_eq!(
            selector,
            Selector::ByBranch {
                branch: "topic".to_string(),
                owner: Some("contoso/project/fork".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_selector_from_branch_owner_matches_base() {
        let mut git = git_on_feature();
        git.branch_config = BranchConfig {
            remote_name: None,
            remote_url: Some(parse_url("git@ssh.dev.azure.com:v3/Contoso/Project/Repo").unwrap()),
            merge_ref: None,
        };
        let api = Arc::new(MockGitOperations::new());
        let context = context(git, &api);

        let selector = Finder::new(&context).selector_from_branch().await.unwrap();
        assert_eq!(
            selector,
            Selector::ByBranch {
                branch: "feature".to_string(),
                owner: None,
            }
        );
    }

    #[tokio::test]
    async fn test_find_by_branch_without_results() {
        let api = Arc::new(MockGitOperations::new());
        api.repo_ops
            .set_get_repositories_response(Ok(vec![record("repo")]))
            .await;
        let context = context(git_on_feature(), &api);

        let err = Finder::new(&context)
            .find(&FindOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("feature"));
    }

    #[tokio::test]
    async fn test_detached_head_is_a_git_error() {
        let mut git = git_on_feature();
        git.current_branch = None;
        let api = Arc::new(MockGitOperations::new());
        let context = context(git, &api);

        let err = Finder::new(&context)
            .find(&FindOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AzdoError::Git { .. }));
        assert!(err.to_string().starts_with("failed to get current branch"));
    }

    /// # Base Branch And State Constraints
    ///
    /// Tests the filters applied after a pull request is found.
    ///
    /// ## Test Scenario
    /// - PR 3 comes from `refs/heads/feature` and is active
    ///
    /// ## Expected Outcome
    /// - A matching base branch and state pass, ignoring case
    /// - A different base branch or state yields NoResults
    #[tokio::test]
    async fn test_find_constraints() {
        async fn find(options: FindOptions) -> AzdoResult<(PullRequest, Repository)> {
            let api = Arc::new(MockGitOperations::new());
            api.pr_ops
                .set_get_pull_request_by_id_response(Ok(pull_request(3)))
                .await;
            let context = context(git_on_feature(), &api);
            Finder::new(&context).find(&options).await
        }

        let ok = find(FindOptions {
            selector: "3".to_string(),
            base_branch: Some("Feature".to_string()),
            states: vec!["merged".to_string(), "ACTIVE".to_string()],
        })
        .await;
        assert!(ok.is_ok());

        let err = find(FindOptions {
            selector: "3".to_string(),
            base_branch: Some("main".to_string()),
            states: vec![],
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("does not have base branch"));

        let err = find(FindOptions {
            selector: "3".to_string(),
            base_branch: None,
            states: vec!["completed".to_string()],
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_by_id_wraps_api_failure() {
        let api = Arc::new(MockGitOperations::new());
        api.pr_ops
            .set_get_pull_request_by_id_response(Err(anyhow::anyhow!("404 Not Found")))
            .await;
        let context = context(git_on_feature(), &api);

        let err = Finder::new(&context)
            .find(&by_selector("#8"))
            .await
            .unwrap_err();
        assert!(matches!(err, AzdoError::Api { .. }));
        assert_eq!(err.to_string(), "failed to get pull request #8: 404 Not Found");
    }
}
