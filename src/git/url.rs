//! Git remote URL normalization.
//!
//! Turns the many spellings git accepts for a remote into a [`Url`] with a
//! predictable shape:
//!
//! - `git@host:path` (scp syntax) becomes `ssh://git@host/path`
//! - `ssh://git@host:v3/org/project/repo` becomes `ssh://git@host/v3/org/project/repo`
//! - `git+ssh://` and `git+https://` become `ssh://` and `https://`
//! - `ssh` URLs lose their port and any doubled leading slash in the path
//!
//! # Example
//!
//! ```
//! use azdo::git::parse_url;
//!
//! let url = parse_url("git@ssh.dev.azure.com:v3/org/project/repo").unwrap();
//! assert_eq!(url.as_str(), "ssh://git@ssh.dev.azure.com/v3/org/project/repo");
//! ```

use url::Url;

use crate::error::ValidationError;

const SUPPORTED_PROTOCOLS: &[&str] = &[
    "ssh:",
    "git+ssh:",
    "git:",
    "http:",
    "https:",
    "git+https:",
    "git+http:",
];

const OTHER_PROTOCOLS: &[&str] = &["ftp:", "ftps:", "file:"];

/// Whether `s` starts with a protocol git can talk to Azure DevOps over.
pub fn is_supported_protocol(s: &str) -> bool {
    SUPPORTED_PROTOCOLS.iter().any(|p| s.starts_with(p))
}

/// Whether `s` starts with any protocol git understands.
///
/// Strings that fail this check but contain a colon are treated as scp syntax.
pub fn is_possible_protocol(s: &str) -> bool {
    is_supported_protocol(s) || OTHER_PROTOCOLS.iter().any(|p| s.starts_with(p))
}

/// Whether the scheme of a parsed URL is in the supported set.
pub fn is_supported_url(url: &Url) -> bool {
    is_supported_protocol(&format!("{}:", url.scheme()))
}

/// Parse a git remote URL into its canonical form.
pub fn parse_url(raw: &str) -> Result<Url, ValidationError> {
    let raw = raw.trim();

    let rewritten = if let Some(rest) = raw.strip_prefix("ssh://") {
        format!("ssh://{}", rewrite_authority_colon(rest))
    } else if !is_possible_protocol(raw) && raw.contains(':') && !raw.contains('\\') {
        format!("ssh://{}", raw.replacen(':', "/", 1))
    } else {
        raw.to_string()
    };

    // `url` refuses to switch between special and non-special schemes after
    // parsing, so the git+ prefixes are dropped up front.
    let rewritten = if let Some(rest) = rewritten.strip_prefix("git+ssh://") {
        format!("ssh://{rest}")
    } else if let Some(rest) = rewritten.strip_prefix("git+https://") {
        format!("https://{rest}")
    } else {
        rewritten
    };

    let mut url = Url::parse(&rewritten).map_err(|e| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() == "ssh" {
        if url.path().starts_with("//") {
            let path = url.path()[1..].to_string();
            url.set_path(&path);
        }
        if url.port().is_some() {
            // Only fails for URLs without a host, which ssh URLs always have.
            let _ = url.set_port(None);
        }
    }

    Ok(url)
}

/// Replace the first colon of the authority with a slash, leaving numeric ports alone.
fn rewrite_authority_colon(rest: &str) -> String {
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let host_start = rest[..authority_end].rfind('@').map_or(0, |at| at + 1);

    // Colons inside a bracketed IPv6 literal belong to the host.
    let search_start = if rest[host_start..authority_end].starts_with('[') {
        match rest[host_start..authority_end].find(']') {
            Some(close) => host_start + close + 1,
            None => return rest.to_string(),
        }
    } else {
        host_start
    };

    let Some(offset) = rest[search_start..authority_end].find(':') else {
        return rest.to_string();
    };
    let colon = search_start + offset;

    let port = &rest[colon + 1..authority_end];
    if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
        return rest.to_string();
    }

    format!("{}/{}", &rest[..colon], &rest[colon + 1..])
}
