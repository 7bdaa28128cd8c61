//! `azdo remote list` and `azdo remote url`.

use std::io::Write;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::context::Context;
use crate::models::{GitProtocol, OutputFormat};
use crate::remotes::Remotes;

#[derive(Debug, Serialize)]
struct RemoteEntry<'a> {
    name: &'a str,
    repository: String,
    fetch_url: Option<&'a str>,
    push_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<&'a str>,
}

fn entries(remotes: &Remotes) -> Vec<RemoteEntry<'_>> {
    remotes
        .iter()
        .map(|remote| RemoteEntry {
            name: &remote.name,
            repository: remote.repository.full_name(),
            fetch_url: remote.fetch_url.as_ref().map(|u| u.as_str()),
            push_url: remote.push_url.as_ref().map(|u| u.as_str()),
            resolved: Some(remote.resolved.as_str()).filter(|r| !r.is_empty()),
        })
        .collect()
}

/// One line per remote: name, repository and fetch URL, tab separated.
pub fn render_text(remotes: &Remotes) -> String {
    entries(remotes)
        .iter()
        .map(|e| {
            format!(
                "{}\t{}\t{}\n",
                e.name,
                e.repository,
                e.fetch_url.or(e.push_url).unwrap_or_default()
            )
        })
        .collect()
}

pub async fn list<W: Write>(context: &Context, format: OutputFormat, out: &mut W) -> Result<()> {
    let remotes = context.remotes().await?;
    tracing::debug!(count = remotes.len(), "Listing remotes");

    let rendered = match format {
        OutputFormat::Text => render_text(remotes),
        OutputFormat::Json => format!(
            "{}\n",
            serde_json::to_string_pretty(&entries(remotes)).context("Failed to serialize remotes")?
        ),
    };
    out.write_all(rendered.as_bytes())
        .context("Failed to write output")?;
    Ok(())
}

/// Print the clone URL of the base repository.
pub async fn url<W: Write>(context: &Context, protocol: GitProtocol, out: &mut W) -> Result<()> {
    let repository = context.base_repo().await?;
    writeln!(out, "{}", repository.remote_url(protocol.as_str()))
        .context("Failed to write output")?;
    Ok(())
}
