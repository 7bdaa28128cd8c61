//! Organization, project and repository names.
//!
//! Names nest: a [`RepositoryName`] carries its [`ProjectName`], which carries
//! its [`OrganizationName`]. Each level can be parsed from a `/`-separated
//! string, and the last two can also be extracted from a git remote URL.
//!
//! Azure DevOps remote URLs come in three shapes:
//!
//! ```text
//! https://dev.azure.com/{org}/{project}/_git/{repo}
//! https://{org}.visualstudio.com/{project}/_git/{repo}
//! ssh://git@ssh.dev.azure.com/v3/{org}/{project}/{repo}
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::config::{DEFAULT_HOST, OrganizationConfig};
use crate::error::{AzdoError, AzdoResult, ValidationError};
use crate::git::is_supported_url;

const MAX_ORGANIZATION_LEN: usize = 50;
const MAX_NAME_LEN: usize = 64;

const ORGANIZATION_FORMAT: &str = "ORGANIZATION";
const PROJECT_FORMAT: &str = "[ORGANIZATION/]PROJECT";
const REPOSITORY_FORMAT: &str = "[ORGANIZATION/]PROJECT/REPO";

const VISUALSTUDIO_SUFFIX: &str = ".visualstudio.com";
const VS_SSH_HOST: &str = "vs-ssh.visualstudio.com";
const GIT_MARKER: &str = "_git";
const DEFAULT_COLLECTION: &str = "DefaultCollection";

fn organization_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").expect("Invalid organization regex")
    })
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_ .-]+$").expect("Invalid name regex"))
}

fn ssh_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v[3-9]+$").expect("Invalid ssh version regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrganizationName {
    organization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName {
    organization: OrganizationName,
    project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    project: ProjectName,
    name: String,
}

impl OrganizationName {
    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn full_name(&self) -> String {
        self.organization.clone()
    }
}

impl ProjectName {
    pub fn organization(&self) -> &str {
        self.organization.organization()
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn full_name(&self) -> String {
        join_non_empty(&[self.organization(), &self.project])
    }
}

impl RepositoryName {
    pub fn organization(&self) -> &str {
        self.project.organization()
    }

    pub fn project(&self) -> &str {
        self.project.project()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_name(&self) -> &ProjectName {
        &self.project
    }

    pub fn full_name(&self) -> String {
        join_non_empty(&[self.organization(), self.project(), &self.name])
    }
}

impl fmt::Display for OrganizationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

fn invalid(
    kind: &'static str,
    input: &str,
    expected: &'static str,
    reason: impl Into<String>,
) -> ValidationError {
    ValidationError::InvalidName {
        kind,
        input: input.to_string(),
        expected,
        reason: reason.into(),
    }
}

/// Parse an organization name.
pub fn parse_organization(input: &str) -> Result<OrganizationName, ValidationError> {
    validate_organization(input, input, ORGANIZATION_FORMAT)?;
    Ok(OrganizationName {
        organization: input.to_string(),
    })
}

fn validate_organization(
    organization: &str,
    input: &str,
    expected: &'static str,
) -> Result<(), ValidationError> {
    if organization.is_empty() {
        return Err(invalid("organization", input, expected, "organization is empty"));
    }
    if organization.chars().count() > MAX_ORGANIZATION_LEN {
        return Err(invalid(
            "organization",
            input,
            expected,
            format!("longer than {} characters", MAX_ORGANIZATION_LEN),
        ));
    }
    if !organization_regex().is_match(organization) {
        return Err(invalid(
            "organization",
            input,
            expected,
            "only letters, digits and inner hyphens are allowed",
        ));
    }
    Ok(())
}

fn validate_name(
    kind: &'static str,
    value: &str,
    input: &str,
    expected: &'static str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid(kind, input, expected, format!("{} is empty", kind)));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(invalid(
            kind,
            input,
            expected,
            format!("longer than {} characters", MAX_NAME_LEN),
        ));
    }
    if !name_regex().is_match(value) {
        return Err(invalid(
            kind,
            input,
            expected,
            "only letters, digits, '_', '-', '.' and spaces are allowed",
        ));
    }
    if value.starts_with('_') || value.starts_with('.') {
        return Err(invalid(kind, input, expected, "must not start with '_' or '.'"));
    }
    if value.ends_with('.') {
        return Err(invalid(kind, input, expected, "must not end with '.'"));
    }
    Ok(())
}

fn default_organization(config: &dyn OrganizationConfig) -> AzdoResult<String> {
    Ok(config.default_organization()?)
}

/// Parse `[ORGANIZATION/]PROJECT`, falling back to the default organization.
pub fn parse_project(input: &str, config: &dyn OrganizationConfig) -> AzdoResult<ProjectName> {
    let parts: Vec<&str> = input.split('/').collect();
    let (organization, project) = match parts.as_slice() {
        [project] => (default_organization(config)?, *project),
        [organization, project] => (organization.to_string(), *project),
        _ => {
            return Err(invalid("project", input, PROJECT_FORMAT, "too many '/' separators").into());
        }
    };

    build_project(&organization, project, input, PROJECT_FORMAT)
}

/// Parse `[ORGANIZATION/]PROJECT/REPO`, falling back to the default organization.
pub fn parse_repository(input: &str, config: &dyn OrganizationConfig) -> AzdoResult<RepositoryName> {
    let parts: Vec<&str> = input.split('/').collect();
    let (organization, project, name) = match parts.as_slice() {
        [project, name] => (default_organization(config)?, *project, *name),
        [organization, project, name] => (organization.to_string(), *project, *name),
        _ => {
            return Err(invalid(
                "repository",
                input,
                REPOSITORY_FORMAT,
                "expected two or three '/'-separated parts",
            )
            .into());
        }
    };

    build_repository(&organization, project, name, input, REPOSITORY_FORMAT)
}

fn build_project(
    organization: &str,
    project: &str,
    input: &str,
    expected: &'static str,
) -> AzdoResult<ProjectName> {
    validate_organization(organization, input, expected)?;
    validate_name("project", project, input, expected)?;
    Ok(ProjectName {
        organization: OrganizationName {
            organization: organization.to_string(),
        },
        project: project.to_string(),
    })
}

/// Build a validated repository name from its parts.
pub fn build_repository(
    organization: &str,
    project: &str,
    name: &str,
    input: &str,
    expected: &'static str,
) -> AzdoResult<RepositoryName> {
    let project = build_project(organization, project, input, expected)?;
    validate_name("repository", name, input, expected)?;
    Ok(RepositoryName {
        project,
        name: name.to_string(),
    })
}

/// Azure DevOps coordinates found in a remote URL, before validation.
struct UrlParts {
    organization: String,
    project: String,
    repository: Option<String>,
}

fn url_error(url: &Url, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn host_of(url: &Url) -> Result<String, ValidationError> {
    url.host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| url_error(url, "URL has no host"))
}

fn is_visualstudio_host(host: &str) -> bool {
    host.ends_with(VISUALSTUDIO_SUFFIX) && host.len() > VISUALSTUDIO_SUFFIX.len()
}

fn is_configured_host(host: &str, config: &dyn OrganizationConfig) -> bool {
    config.organizations().iter().any(|org| {
        organization_host(&config.organization_url(org)).is_some_and(|h| h == host)
    })
}

fn organization_host(organization_url: &str) -> Option<String> {
    Url::parse(organization_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn path_segments(url: &Url) -> Result<Vec<String>, ValidationError> {
    let path = url.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);

    path.split('/')
        .map(|segment| {
            let decoded = urlencoding::decode(segment)
                .map_err(|e| url_error(url, format!("invalid URL encoding: {}", e)))?;
            if decoded.trim().is_empty() {
                return Err(url_error(url, "URL path contains an empty segment"));
            }
            Ok(decoded.into_owned())
        })
        .collect()
}

/// Split an Azure DevOps remote URL into organization, project and repository.
///
/// With `require_repository` unset the repository segment (and, for HTTP URLs,
/// the `_git` marker in front of it) is optional.
fn split_url(
    url: &Url,
    config: &dyn OrganizationConfig,
    require_repository: bool,
) -> Result<UrlParts, ValidationError> {
    if !is_supported_url(url) {
        return Err(url_error(
            url,
            format!("unsupported protocol '{}'", url.scheme()),
        ));
    }

    let host = host_of(url)?;
    let is_dev_azure = host == DEFAULT_HOST || host == format!("ssh.{}", DEFAULT_HOST);
    let is_visualstudio = is_visualstudio_host(&host);
    if !is_dev_azure && !is_visualstudio && !is_configured_host(&host, config) {
        return Err(url_error(url, "not an Azure DevOps host"));
    }

    let mut segments = path_segments(url)?;

    if url.scheme() == "ssh" {
        if segments.iter().any(|s| s == GIT_MARKER) {
            return Err(url_error(url, "ssh URLs must not contain '_git'"));
        }
        if !segments.first().is_some_and(|s| ssh_version_regex().is_match(s)) {
            return Err(url_error(url, "ssh URLs must start with a version segment like 'v3'"));
        }
        segments.remove(0);

        return match segments.as_slice() {
            [organization, project, repository] => Ok(UrlParts {
                organization: organization.clone(),
                project: project.clone(),
                repository: Some(repository.clone()),
            }),
            [organization, project] if !require_repository => Ok(UrlParts {
                organization: organization.clone(),
                project: project.clone(),
                repository: None,
            }),
            _ => Err(url_error(url, "expected v3/ORGANIZATION/PROJECT/REPO")),
        };
    }

    // Only `https://{org}.visualstudio.com` carries the organization in the host.
    let organization = if is_visualstudio && host != VS_SSH_HOST {
        let subdomain = host.split('.').next().unwrap_or_default().to_string();
        if segments
            .first()
            .is_some_and(|s| s.eq_ignore_ascii_case(DEFAULT_COLLECTION))
        {
            segments.remove(0);
        }
        subdomain
    } else {
        if segments.is_empty() {
            return Err(url_error(url, "missing organization"));
        }
        segments.remove(0)
    };

    let parts = match segments.as_slice() {
        [project, marker, repository] if marker == GIT_MARKER => UrlParts {
            organization,
            project: project.clone(),
            repository: Some(repository.clone()),
        },
        // `{org}/_git/{repo}` addresses the repository named like its project
        [marker, repository] if marker == GIT_MARKER => UrlParts {
            organization,
            project: repository.clone(),
            repository: Some(repository.clone()),
        },
        _ => {
            return Err(url_error(url, "expected ORGANIZATION/PROJECT/_git/REPO"));
        }
    };

    Ok(parts)
}

/// Host that serves an organization, as used in clone URLs.
///
/// `ssh.` prefixes are dropped. `{organization}.visualstudio.com` and
/// `vs-ssh.visualstudio.com` are legacy aliases of `dev.azure.com`.
pub fn normalized_host(host: &str, organization: &str) -> String {
    let host = host.to_ascii_lowercase();
    let legacy = format!("{}{}", organization.to_ascii_lowercase(), VISUALSTUDIO_SUFFIX);
    if host == VS_SSH_HOST || host == legacy {
        return DEFAULT_HOST.to_string();
    }
    host.strip_prefix("ssh.").unwrap_or(&host).to_string()
}

fn check_organization_host(
    url: &Url,
    organization: &str,
    config: &dyn OrganizationConfig,
) -> AzdoResult<()> {
    let actual_host = normalized_host(&host_of(url)?, organization);
    let organization_url = config.organization_url(organization);
    let expected_host = organization_host(&organization_url)
        .map(|h| normalized_host(&h, organization))
        .ok_or_else(|| ValidationError::InvalidUrl {
            url: organization_url.clone(),
            reason: format!("configured URL of organization '{}' has no host", organization),
        })?;

    if expected_host != actual_host {
        return Err(AzdoError::CrossOrganizationMismatch {
            organization: organization.to_string(),
            expected_host,
            actual_host,
        });
    }
    Ok(())
}

/// Extract the project a remote URL belongs to.
pub fn project_from_url(url: &Url, config: &dyn OrganizationConfig) -> AzdoResult<ProjectName> {
    let parts = split_url(url, config, false)?;
    let input = url.as_str();
    let project = build_project(&parts.organization, &parts.project, input, PROJECT_FORMAT)?;
    check_organization_host(url, project.organization(), config)?;
    Ok(project)
}

/// Extract the repository a remote URL points at.
pub fn repository_from_url(
    url: &Url,
    config: &dyn OrganizationConfig,
) -> AzdoResult<RepositoryName> {
    let parts = split_url(url, config, true)?;
    let repository = parts.repository.unwrap_or_default();
    let repository = repository.strip_suffix(".git").unwrap_or(&repository);

    let name = build_repository(
        &parts.organization,
        &parts.project,
        repository,
        url.as_str(),
        REPOSITORY_FORMAT,
    )?;
    check_organization_host(url, name.organization(), config)?;
    Ok(name)
}
