//! Per-invocation resolution context.
//!
//! Bundles the collaborators every command needs and memoizes the two
//! lookups they all share: the resolved remotes and the base repository.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::api::GitOperations;
use crate::config::OrganizationConfig;
use crate::error::{AzdoError, AzdoResult};
use crate::git::GitCommands;
use crate::remotes::{IdentityTranslator, Remotes, UrlTranslator, translate_remotes};
use crate::repo::Repository;

pub struct Context {
    config: Arc<dyn OrganizationConfig>,
    git: Arc<dyn GitCommands>,
    api: Arc<dyn GitOperations>,
    translator: Arc<dyn UrlTranslator>,
    repo_override: Option<Repository>,
    remotes: OnceCell<Remotes>,
    base_repo: OnceCell<Repository>,
}

impl Context {
    pub fn new(
        config: Arc<dyn OrganizationConfig>,
        git: Arc<dyn GitCommands>,
        api: Arc<dyn GitOperations>,
    ) -> Self {
        Self {
            config,
            git,
            api,
            translator: Arc::new(IdentityTranslator),
            repo_override: None,
            remotes: OnceCell::new(),
            base_repo: OnceCell::new(),
        }
    }

    /// Use `translator` for remote URLs instead of the identity mapping.
    pub fn with_translator(mut self, translator: Arc<dyn UrlTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// Operate on `ORGANIZATION/PROJECT/REPO` instead of the repository the
    /// git remotes point at.
    pub fn with_repo_override(mut self, full_name: Option<&str>) -> AzdoResult<Self> {
        self.repo_override = full_name
            .map(|name| Repository::from_full_name(name, self.config.as_ref()))
            .transpose()?;
        Ok(self)
    }

    pub fn config(&self) -> &dyn OrganizationConfig {
        self.config.as_ref()
    }

    pub fn git(&self) -> &dyn GitCommands {
        self.git.as_ref()
    }

    pub fn api(&self) -> &dyn GitOperations {
        self.api.as_ref()
    }

    /// Git remotes that point at Azure DevOps, most preferred first.
    pub async fn remotes(&self) -> AzdoResult<&Remotes> {
        self.remotes
            .get_or_try_init(|| async {
                let git_remotes = self
                    .git
                    .remotes()
                    .map_err(|e| AzdoError::git("failed to list git remotes", e))?;
                let total = git_remotes.len();

                let mut remotes =
                    translate_remotes(git_remotes, self.translator.as_ref(), self.config());
                remotes.sort();

                tracing::debug!(
                    total,
                    resolved = remotes.len(),
                    "Resolved git remotes to Azure DevOps repositories"
                );
                Ok(remotes)
            })
            .await
    }

    /// Repository commands operate on when no selector names one.
    pub async fn base_repo(&self) -> AzdoResult<&Repository> {
        self.base_repo
            .get_or_try_init(|| async {
                if let Some(repository) = &self.repo_override {
                    tracing::debug!(repository = %repository, "Using repository override");
                    return Ok(repository.clone());
                }

                let repository = self.remotes().await?.resolved_base(self.config())?;
                tracing::info!(repository = %repository, "Resolved base repository");
                Ok(repository)
            })
            .await
    }
}
