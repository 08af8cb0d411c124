//! Utility functions
use std::{
    fs::{copy, create_dir_all},
    path::{Path, PathBuf},
};

use log::debug;
use url::Url;

use crate::errors::{DuplicatorError, DuplicatorErrorKind};

/// User name put in front of the token in authenticated URLs
pub(crate) const TOKEN_USER: &str = "x-access-token";

/// Directory receiving the workflow files, relative to the clone root
pub(crate) const WORKFLOW_DIR: &str = ".github/workflows";

/// Outcome of one best-effort operation
#[derive(Debug)]
pub struct ItemOutcome {
    /// Entity concerned (label name, collaborator login, branch name)
    pub item: String,

    /// What happened
    pub result: Result<(), DuplicatorError>,
}

impl ItemOutcome {
    /// Create an outcome
    pub fn new(item: &str, result: Result<(), DuplicatorError>) -> Self {
        Self {
            item: item.to_string(),
            result,
        }
    }

    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Count the failed outcomes
pub(crate) fn count_failures(outcomes: &[ItemOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.is_success()).count()
}

/// Parse `url` and make sure it uses HTTPS
/// # Errors
/// `UnsupportedScheme` for any other scheme, or if the URL can't be parsed
/// (scp-like `git@host:path`)
pub fn require_https(url: &str) -> Result<Url, DuplicatorError> {
    let parsed = Url::parse(url).map_err(|e| {
        DuplicatorError::new(DuplicatorErrorKind::UnsupportedScheme)
            .with_text(&format!("'{url}' is not an HTTPS URL ({e})"))
    })?;
    if parsed.scheme() != "https" || parsed.host_str().is_none() {
        return Err(DuplicatorError::new(DuplicatorErrorKind::UnsupportedScheme)
            .with_text(&format!("'{url}' is not an HTTPS URL")));
    }
    Ok(parsed)
}

/// Embed `token` in the user-info of an HTTPS URL, replacing any existing user-info
/// # Errors
/// `UnsupportedScheme` if the URL is not HTTPS
pub fn authenticated_url(url: &str, token: &str) -> Result<String, DuplicatorError> {
    let mut parsed = require_https(url)?;
    let invalid = |_| {
        DuplicatorError::new(DuplicatorErrorKind::UnsupportedScheme)
            .with_text(&format!("can't set credentials on '{url}'"))
    };
    parsed.set_username(TOKEN_USER).map_err(invalid)?;
    parsed.set_password(Some(token)).map_err(invalid)?;
    Ok(parsed.into())
}

/// Extract `(owner, name)` from a repository URL such as `https://github.com/org/app.git`
/// # Errors
/// Error if the path doesn't have two segments
pub fn parse_repo_slug(url: &str) -> Result<(String, String), DuplicatorError> {
    let parsed = require_https(url)?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [owner, name] => {
            let name = name.strip_suffix(".git").unwrap_or(*name);
            if name.is_empty() {
                return Err(format!("No repository name in '{url}'").into());
            }
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(format!("Expected '<owner>/<name>' in '{url}'").into()),
    }
}

/// Fail if one of the files is missing
/// # Errors
/// `MissingFile` naming the first missing file
pub(crate) fn check_files_exist<'a>(
    files: impl IntoIterator<Item = &'a PathBuf>,
) -> Result<(), DuplicatorError> {
    for file in files {
        if !file.is_file() {
            return Err(DuplicatorError::new(DuplicatorErrorKind::MissingFile)
                .with_text(&format!("'{}' not found", file.display())));
        }
    }
    Ok(())
}

/// Copy the workflow files into `<root>/.github/workflows` and the README template
/// to `<root>/README.md`
///
/// Returns the paths written, relative to `root`.
/// # Errors
/// Error if a file can't be copied
pub(crate) fn inject_files(
    root: &Path,
    workflows: &[PathBuf],
    readme: Option<&Path>,
) -> Result<Vec<PathBuf>, DuplicatorError> {
    let mut written = vec![];
    let workflow_dir = root.join(WORKFLOW_DIR);
    create_dir_all(&workflow_dir)?;
    for workflow in workflows {
        let file_name = workflow.file_name().ok_or_else(|| {
            DuplicatorError::new(DuplicatorErrorKind::MissingFile)
                .with_text(&format!("'{}' is not a file", workflow.display()))
        })?;
        let relative = Path::new(WORKFLOW_DIR).join(file_name);
        copy(workflow, root.join(&relative)).map_err(|e| {
            DuplicatorError::new(DuplicatorErrorKind::Io)
                .with_text(&format!("copying '{}': {e}", workflow.display()))
        })?;
        debug!("Copied {} to {}", workflow.display(), relative.display());
        written.push(relative);
    }
    if let Some(readme) = readme {
        let relative = PathBuf::from("README.md");
        copy(readme, root.join(&relative)).map_err(|e| {
            DuplicatorError::new(DuplicatorErrorKind::Io)
                .with_text(&format!("copying '{}': {e}", readme.display()))
        })?;
        debug!("Copied {} to README.md", readme.display());
        written.push(relative);
    }
    Ok(written)
}
