//! GitHub API payloads and conversion to the forge types
use crate::forge::{BranchProtectionRule, Permission, RepositoryHandle};
use serde::{Deserialize, Serialize};

/// Owner of a repository, or authenticated user
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct UserGithub {
    /// Login
    pub login: String,
}

/// Github Repo
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct RepoGithub {
    /// Repository name
    pub name: String,

    /// Repository owner
    pub owner: UserGithub,

    /// HTTPS clone URL
    pub clone_url: String,

    /// Default branch, missing on some empty repositories
    pub default_branch: Option<String>,
}

impl From<RepoGithub> for RepositoryHandle {
    fn from(repo: RepoGithub) -> Self {
        RepositoryHandle {
            owner: repo.owner.login,
            name: repo.name,
            clone_url: repo.clone_url,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
        }
    }
}

/// Body of `POST /user/repos`
#[derive(Serialize, Debug)]
pub struct CreateRepoGithub<'a> {
    /// Repository name
    pub name: &'a str,

    /// Private repository
    pub private: bool,

    /// Don't create an initial commit, the history comes from the mirror push
    pub auto_init: bool,
}

/// Github label
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct LabelGithub {
    /// Label name
    pub name: String,

    /// Color hex string without `#`
    pub color: String,

    /// Label description
    pub description: Option<String>,
}

/// Body of `PUT /repos/{owner}/{repo}/collaborators/{login}`
#[derive(Serialize, Debug)]
pub struct CollaboratorPermission {
    /// Permission given
    pub permission: Permission,
}

/// Pull request review part of a protection
#[derive(Serialize, Debug, PartialEq)]
pub struct RequiredReviewsGithub {
    /// Dismiss approvals on new pushes
    pub dismiss_stale_reviews: bool,

    /// Require code owners review
    pub require_code_owner_reviews: bool,

    /// Number of approvals needed
    pub required_approving_review_count: u32,
}

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`
///
/// The four keys are required by GitHub, `null` disables a section.
#[derive(Serialize, Debug, PartialEq)]
pub struct ProtectionGithub {
    /// Status checks, disabled
    pub required_status_checks: Option<()>,

    /// Enforce for administrators
    pub enforce_admins: bool,

    /// Review requirements
    pub required_pull_request_reviews: RequiredReviewsGithub,

    /// Push restrictions, disabled
    pub restrictions: Option<()>,
}

impl From<&BranchProtectionRule> for ProtectionGithub {
    fn from(rule: &BranchProtectionRule) -> Self {
        ProtectionGithub {
            required_status_checks: None,
            enforce_admins: rule.enforce_admins,
            required_pull_request_reviews: RequiredReviewsGithub {
                dismiss_stale_reviews: rule.dismiss_stale_reviews,
                require_code_owner_reviews: rule.require_code_owner_reviews,
                required_approving_review_count: rule.required_approving_review_count,
            },
            restrictions: None,
        }
    }
}
