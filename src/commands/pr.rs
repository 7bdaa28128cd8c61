//! `azdo pr view`.

use std::io::Write;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::context::Context;
use crate::finder::{FindOptions, Finder};
use crate::models::{OutputFormat, PrViewArgs, PullRequest};
use crate::repo::Repository;

/// JSON document printed by `azdo pr view --format json`.
#[derive(Debug, Serialize)]
struct PullRequestView<'a> {
    #[serde(flatten)]
    pull_request: &'a PullRequest,
    repository: String,
    web_url: String,
}

/// Browser URL of a pull request.
pub fn web_url(repository: &Repository, id: i32) -> String {
    format!("{}/pullrequest/{}", repository.remote_url("https"), id)
}

fn short_ref(name: &str) -> &str {
    name.strip_prefix("refs/heads/").unwrap_or(name)
}

/// Human-readable rendering of a pull request.
pub fn render_text(pr: &PullRequest, repository: &Repository) -> String {
    let draft = if pr.is_draft { " (draft)" } else { "" };
    let description = pr
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("No description provided.");

    format!(
        "{title} #{id}\n\
         {status}{draft} - {author} wants to merge {source} into {target}\n\
         Repository: {repository}\n\
         Created: {created}\n\
         \n\
         {description}\n\
         \n\
         View this pull request on Azure DevOps: {url}\n",
        title = pr.title,
        id = pr.id,
        status = pr.status,
        author = pr.created_by.display_name,
        source = short_ref(&pr.source_ref_name),
        target = short_ref(&pr.target_ref_name),
        repository = repository.full_name(),
        created = pr.creation_date,
        url = web_url(repository, pr.id),
    )
}

pub fn render_json(pr: &PullRequest, repository: &Repository) -> Result<String> {
    let view = PullRequestView {
        pull_request: pr,
        repository: repository.full_name(),
        web_url: web_url(repository, pr.id),
    };
    serde_json::to_string_pretty(&view).context("Failed to serialize pull request")
}

pub async fn view<W: Write>(context: &Context, args: &PrViewArgs, out: &mut W) -> Result<()> {
    let options = FindOptions {
        selector: args.selector.clone().unwrap_or_default(),
        base_branch: args.base_branch.clone(),
        states: args.states.clone(),
    };

    let (pr, repository) = Finder::new(context).find(&options).await?;

    let rendered = match args.format {
        OutputFormat::Text => render_text(&pr, &repository),
        OutputFormat::Json => format!("{}\n", render_json(&pr, &repository)?),
    };
    out.write_all(rendered.as_bytes())
        .context("Failed to write output")?;
    Ok(())
}
