//! Remote forge abstraction
use std::{fmt, future::Future, pin::Pin};

use serde::{Deserialize, Serialize};

use crate::{errors::DuplicatorError, labels::LabelSpec};

/// Boxed future returned by the [`Forge`] methods
pub type ForgeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DuplicatorError>> + Send + 'a>>;

/// Reference to a repository on the forge
#[derive(Deserialize, Serialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct RepositoryHandle {
    /// Owner login
    pub owner: String,

    /// Name of the repository
    pub name: String,

    /// HTTPS clone URL
    pub clone_url: String,

    /// Default branch reported by the forge
    pub default_branch: String,
}

impl RepositoryHandle {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Permission given to a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read and write access
    Push,
    /// Full access
    Admin,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Push => write!(f, "push"),
            Permission::Admin => write!(f, "admin"),
        }
    }
}

/// Protection applied to one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchProtectionRule {
    /// Protected branch
    pub branch: String,

    /// Number of approvals needed before merging
    pub required_approving_review_count: u32,

    /// Apply the rule to administrators too
    pub enforce_admins: bool,

    /// Dismiss approvals when new commits are pushed
    pub dismiss_stale_reviews: bool,

    /// Require a review from a code owner
    pub require_code_owner_reviews: bool,
}

impl BranchProtectionRule {
    /// Highest approval count accepted by GitHub
    pub const MAX_REVIEWERS: u32 = 6;

    /// Strict rule for `branch`, requiring `reviewers` approvals (clamped to `1..=6`)
    pub fn strict(branch: &str, reviewers: usize) -> Self {
        let reviewers = u32::try_from(reviewers).unwrap_or(Self::MAX_REVIEWERS);
        Self {
            branch: branch.to_string(),
            required_approving_review_count: reviewers.clamp(1, Self::MAX_REVIEWERS),
            enforce_admins: true,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
        }
    }
}

/// Remote forge operations needed to duplicate a repository
pub trait Forge: Sync + Send {
    /// Login of the authenticated user
    fn get_current_user(&self) -> ForgeFuture<'_, String>;

    /// Create a repository under the authenticated account
    fn create_repo(&self, name: &str, private: bool) -> ForgeFuture<'_, RepositoryHandle>;

    /// Change the default branch of a repository
    fn set_default_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()>;

    /// Names of all labels of a repository
    fn list_labels(&self, repo: &RepositoryHandle) -> ForgeFuture<'_, Vec<String>>;

    /// Delete one label
    fn delete_label(&self, repo: &RepositoryHandle, name: &str) -> ForgeFuture<'_, ()>;

    /// Create one label
    fn create_label(&self, repo: &RepositoryHandle, label: &LabelSpec) -> ForgeFuture<'_, ()>;

    /// Logins of the collaborators of `owner/name`
    fn list_collaborators(&self, owner: &str, name: &str) -> ForgeFuture<'_, Vec<String>>;

    /// Add a collaborator with the given permission
    fn add_collaborator(
        &self,
        repo: &RepositoryHandle,
        login: &str,
        permission: Permission,
    ) -> ForgeFuture<'_, ()>;

    /// Fail if the branch does not exist
    fn get_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()>;

    /// Apply a protection rule
    fn set_branch_protection(
        &self,
        repo: &RepositoryHandle,
        rule: &BranchProtectionRule,
    ) -> ForgeFuture<'_, ()>;
}
