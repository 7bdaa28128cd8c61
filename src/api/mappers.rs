//! Conversions from azure_devops_rust_api types to the domain models.
//!
//! The generated REST types carry far more than azdo prints; these `From`
//! impls keep only what the commands use.

use azure_devops_rust_api::git::models as git_models;

use crate::models::{CreatedBy, GitRepositoryRecord, PullRequest};

/// REST status as the lowercase string the API itself sends.
fn status_name(status: &git_models::git_pull_request::Status) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_lowercase))
        .unwrap_or_else(|| format!("{:?}", status).to_lowercase())
}

impl From<git_models::GitPullRequest> for PullRequest {
    fn from(pr: git_models::GitPullRequest) -> Self {
        PullRequest {
            id: pr.pull_request_id,
            title: pr.title.unwrap_or_default(),
            description: pr.description,
            status: status_name(&pr.status),
            source_ref_name: pr.source_ref_name,
            target_ref_name: pr.target_ref_name,
            is_draft: pr.is_draft,
            created_by: CreatedBy {
                display_name: pr
                    .created_by
                    .graph_subject_base
                    .display_name
                    .unwrap_or_default(),
            },
            creation_date: pr
                .creation_date
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| pr.creation_date.to_string()),
            repository_id: pr.repository.id,
            repository_name: pr.repository.name,
            url: pr.url,
        }
    }
}

impl From<git_models::GitRepository> for GitRepositoryRecord {
    fn from(repo: git_models::GitRepository) -> Self {
        GitRepositoryRecord {
            id: repo.id,
            name: repo.name,
            project: repo.project.name,
            default_branch: repo.default_branch,
            ssh_url: repo.ssh_url,
            remote_url: repo.remote_url,
            web_url: repo.web_url,
            is_fork: repo.is_fork.unwrap_or(false),
        }
    }
}
