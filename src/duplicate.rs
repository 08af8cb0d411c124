//! Duplicate one repository into a new private repository
use std::path::PathBuf;

use log::{info, warn};

use crate::{
    errors::{DuplicatorError, DuplicatorErrorKind},
    forge::{BranchProtectionRule, Forge, Permission, RepositoryHandle},
    labels::{normalize_labels, LabelOutcomes, LabelSpec},
    scratch::ScratchDir,
    utils::{
        authenticated_url, check_files_exist, count_failures, inject_files, parse_repo_slug,
        require_https, ItemOutcome,
    },
    vcs::{Vcs, WorkingCopy},
};

/// Name of the remote pointing at the new repository
pub(crate) const TARGET_REMOTE: &str = "duplicate";

/// Everything a run needs, resolved from the config file, the environment and the CLI
#[derive(Debug, Clone, Default)]
pub struct DuplicateSettings {
    /// Forge token, embedded in clone and push URLs
    pub token: String,

    /// Label catalog
    pub labels: Vec<LabelSpec>,

    /// Workflow files copied to `.github/workflows`
    pub workflows: Vec<PathBuf>,

    /// README template copied to `README.md`
    pub readme: Option<PathBuf>,

    /// Message of the workflow commit
    pub commit_message: String,

    /// Copy the collaborators of the source repository
    pub replicate_collaborators: bool,

    /// Branches to protect, empty to skip protection
    pub protected_branches: Vec<String>,

    /// Directory receiving the scratch clone
    pub scratch_root: PathBuf,
}

/// What a run did
#[derive(Debug)]
pub struct DuplicationReport {
    /// The new repository
    pub repository: RepositoryHandle,

    /// Branch that received the workflow commit
    pub default_branch: String,

    /// Id of the workflow commit
    pub workflow_commit: String,

    /// Label normalization
    pub labels: LabelOutcomes,

    /// Collaborator additions, empty when replication is disabled
    pub collaborators: Vec<ItemOutcome>,

    /// Branch protections, empty when protection is disabled
    pub protections: Vec<ItemOutcome>,

    /// Pushed tag
    pub tag: Option<String>,
}

impl DuplicationReport {
    /// Number of best-effort operations that failed
    pub fn failures(&self) -> usize {
        count_failures(&self.labels.deleted)
            + count_failures(&self.labels.created)
            + count_failures(&self.collaborators)
            + count_failures(&self.protections)
    }
}

/// Duplicates repositories
pub struct Duplicator<'a, V: Vcs> {
    /// Remote forge
    forge: &'a dyn Forge,

    /// Local git
    vcs: V,

    /// Settings of the run
    settings: DuplicateSettings,
}

impl<'a, V: Vcs> Duplicator<'a, V> {
    /// Create a duplicator
    pub fn new(forge: &'a dyn Forge, vcs: V, settings: DuplicateSettings) -> Self {
        Self {
            forge,
            vcs,
            settings,
        }
    }

    /// Duplicate `source_url` into a new private repository named `new_name`
    ///
    /// The scratch clone is removed on every exit path.
    /// # Errors
    /// Fatal errors only: invalid URL, missing file, clone, creation, push, commit or tag failure
    pub async fn duplicate(
        &self,
        source_url: &str,
        new_name: &str,
        tag: Option<&str>,
    ) -> Result<DuplicationReport, DuplicatorError> {
        let settings = &self.settings;
        require_https(source_url)?;
        check_files_exist(settings.workflows.iter().chain(settings.readme.iter()))?;

        let scratch = ScratchDir::new(&settings.scratch_root)?;
        info!("Cloning {source_url} to {}", scratch.path().display());
        let clone_url = authenticated_url(source_url, &settings.token)?;
        let copy = self.vcs.clone_repo(&clone_url, scratch.path())?;

        info!("Creating repo {new_name}");
        let repository = self.forge.create_repo(new_name, true).await?;
        info!("Created new repo: {}", repository.full_name());

        let push_url = authenticated_url(&repository.clone_url, &settings.token)?;
        copy.set_remote(TARGET_REMOTE, &push_url)?;
        info!("Mirroring every branch and tag to {}", repository.clone_url);
        copy.push_mirror(TARGET_REMOTE)?;

        let default_branch = copy.head_branch()?;
        if default_branch != repository.default_branch {
            info!("Setting default branch to {default_branch}");
            if let Err(e) = self
                .forge
                .set_default_branch(&repository, &default_branch)
                .await
            {
                warn!("Couldn't set default branch {default_branch}: {e}");
            }
        }

        let labels = normalize_labels(self.forge, &repository, &settings.labels).await;

        info!("Copying GitHub Actions workflow");
        let injected = inject_files(
            copy.workdir(),
            &settings.workflows,
            settings.readme.as_deref(),
        )?;
        let workflow_commit = copy.commit_files(&injected, &settings.commit_message)?;
        copy.push_branch(TARGET_REMOTE, &default_branch)?;
        info!("Pushed {workflow_commit} to {default_branch}");

        if let Some(tag) = tag {
            info!("Tagging with {tag}");
            copy.create_tag(tag)?;
            copy.push_tag(TARGET_REMOTE, tag)?;
        }

        let mut collaborators = vec![];
        let mut reviewers = 1;
        if settings.replicate_collaborators {
            let (outcomes, count) = self.replicate_collaborators(source_url, &repository).await;
            collaborators = outcomes;
            reviewers = count;
        }

        let mut protections = vec![];
        for branch in &settings.protected_branches {
            let result = self.protect_branch(&repository, branch, reviewers).await;
            match &result {
                Ok(()) => info!(
                    "Branch protection enabled on '{branch}' requiring {reviewers} approvals"
                ),
                Err(e) => warn!("Could not protect branch '{branch}': {e}"),
            }
            protections.push(ItemOutcome::new(branch, result));
        }

        Ok(DuplicationReport {
            repository,
            default_branch,
            workflow_commit,
            labels,
            collaborators,
            protections,
            tag: tag.map(str::to_string),
        })
    }

    /// Add the collaborators of the source with `push`, and the acting user with `admin`
    ///
    /// Returns the outcomes and the number of distinct collaborators (acting user included).
    async fn replicate_collaborators(
        &self,
        source_url: &str,
        repository: &RepositoryHandle,
    ) -> (Vec<ItemOutcome>, usize) {
        let mut outcomes = vec![];
        let source = match parse_repo_slug(source_url) {
            Ok((owner, name)) => self.forge.list_collaborators(&owner, &name).await,
            Err(e) => Err(e),
        };
        let logins = match source {
            Ok(logins) => logins,
            Err(e) => {
                warn!("Couldn't list collaborators of {source_url}: {e}");
                outcomes.push(ItemOutcome::new("*", Err(e)));
                vec![]
            }
        };
        let mut added = vec![];
        for login in &logins {
            let result = self
                .forge
                .add_collaborator(repository, login, Permission::Push)
                .await;
            match &result {
                Ok(()) => {
                    info!("Added collaborator: {login}");
                    added.push(login.clone());
                }
                Err(e) => warn!("Failed to add collaborator {login}: {e}"),
            }
            outcomes.push(ItemOutcome::new(login, result));
        }

        match self.forge.get_current_user().await {
            Ok(user) => {
                if !logins.contains(&user) {
                    let result = self
                        .forge
                        .add_collaborator(repository, &user, Permission::Admin)
                        .await;
                    match &result {
                        Ok(()) => info!("Added {user} as admin"),
                        Err(e) => warn!("Failed to add {user} as admin: {e}"),
                    }
                    outcomes.push(ItemOutcome::new(&user, result));
                }
                // counted whatever happened to their own add
                added.push(user);
            }
            Err(e) => {
                warn!("Couldn't get the current user: {e}");
                outcomes.push(ItemOutcome::new("@me", Err(e)));
            }
        }
        added.sort();
        added.dedup();
        (outcomes, added.len().max(1))
    }

    /// Check that the branch exists, then protect it
    async fn protect_branch(
        &self,
        repository: &RepositoryHandle,
        branch: &str,
        reviewers: usize,
    ) -> Result<(), DuplicatorError> {
        self.forge
            .get_branch(repository, branch)
            .await
            .map_err(|e| e.with_kind(DuplicatorErrorKind::BranchProtection))?;
        let rule = BranchProtectionRule::strict(branch, reviewers);
        self.forge.set_branch_protection(repository, &rule).await
    }
}
