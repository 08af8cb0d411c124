//! Local version control, backed by git2
use std::{
    cell::RefCell,
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use git2::{
    build::RepoBuilder, AutotagOption, BranchType, Commit, Cred, ErrorCode, FetchOptions,
    IndexAddOption, ObjectType, PushOptions, RemoteCallbacks, Repository, Signature,
};
use log::debug;

use crate::{
    errors::{DuplicatorError, DuplicatorErrorKind},
    utils::TOKEN_USER,
};

/// Committer used when git has no `user.name`/`user.email`
const COMMITTER_NAME: &str = "git-duplicator";

/// Email of [`COMMITTER_NAME`]
const COMMITTER_EMAIL: &str = "git-duplicator@localhost";

/// Namespace receiving a snapshot of the remote refs during a mirror push
const REMOTE_SNAPSHOT: &str = "refs/duplicator-remote/";

/// Clones repositories
pub trait Vcs {
    /// Working copy produced by a clone
    type Checkout: WorkingCopy;

    /// Clone every branch and tag of `url` into `destination`
    /// # Errors
    /// `Clone` on network, authentication or not-found failures
    fn clone_repo(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<Self::Checkout, DuplicatorError>;
}

/// Operations on a local working copy
pub trait WorkingCopy {
    /// Root of the working tree
    fn workdir(&self) -> &Path;

    /// Branch `HEAD` points to
    /// # Errors
    /// Error if `HEAD` is detached
    fn head_branch(&self) -> Result<String, DuplicatorError>;

    /// Add a remote, or change its URL if it already exists
    /// # Errors
    /// Error if git refuses the remote
    fn set_remote(&self, name: &str, url: &str) -> Result<(), DuplicatorError>;

    /// Make the branches and tags of `remote` identical to the local ones
    /// # Errors
    /// `Push` if the push fails or a ref is rejected
    fn push_mirror(&self, remote: &str) -> Result<(), DuplicatorError>;

    /// Stage everything, force-stage `paths` even if ignored, and commit on `HEAD`
    ///
    /// `paths` are relative to [`WorkingCopy::workdir`]. Returns the commit id.
    /// # Errors
    /// `Commit` if the commit can't be created or wouldn't change the tree
    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<String, DuplicatorError>;

    /// Push one branch, without force
    /// # Errors
    /// `Push` if the push fails or is rejected
    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), DuplicatorError>;

    /// Create a lightweight tag on `HEAD`
    /// # Errors
    /// `Tag` if the tag exists or `HEAD` has no commit
    fn create_tag(&self, name: &str) -> Result<(), DuplicatorError>;

    /// Push one tag
    /// # Errors
    /// `Push` if the push fails or is rejected
    fn push_tag(&self, remote: &str, name: &str) -> Result<(), DuplicatorError>;
}

/// Callbacks answering one credential request with the token
fn credential_callbacks(token: Option<&str>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempted = false;
    callbacks.credentials(move |_url, username_from_url, allowed| match token {
        Some(token) if allowed.is_user_pass_plaintext() && !attempted => {
            attempted = true;
            Cred::userpass_plaintext(username_from_url.unwrap_or(TOKEN_USER), token)
        }
        Some(_) => Err(git2::Error::from_str("authentication with the token failed")),
        None => Cred::default(),
    });
    callbacks
}

/// git2 implementation of [`Vcs`]
#[derive(Debug, Clone, Default)]
pub struct Git2Vcs {
    /// Token given to git when the remote asks for credentials
    token: Option<String>,
}

impl Git2Vcs {
    /// Create a git client authenticating with `token`
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl Vcs for Git2Vcs {
    type Checkout = Git2WorkingCopy;

    fn clone_repo(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<Git2WorkingCopy, DuplicatorError> {
        let clone_error = |e: git2::Error| {
            DuplicatorError::new(DuplicatorErrorKind::Clone).with_text(&e.to_string())
        };
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(credential_callbacks(self.token.as_deref()));
        fetch_opts.download_tags(AutotagOption::All);
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        let repo = builder.clone(url, destination).map_err(clone_error)?;

        // every remote-tracking branch becomes a local branch so that the mirror push sees it
        let mut remote_branches = vec![];
        for branch in repo.branches(Some(BranchType::Remote)).map_err(clone_error)? {
            let (branch, _) = branch.map_err(clone_error)?;
            if branch.get().symbolic_target().is_some() {
                continue;
            }
            let name = match branch.name().map_err(clone_error)? {
                Some(name) => name.to_string(),
                None => continue,
            };
            let oid = branch.get().peel_to_commit().map_err(clone_error)?.id();
            remote_branches.push((name, oid));
        }
        for (name, oid) in remote_branches {
            let local_name = match name.split_once('/') {
                Some((_remote, local)) => local,
                None => continue,
            };
            if repo.find_branch(local_name, BranchType::Local).is_ok() {
                continue;
            }
            let commit = repo.find_commit(oid).map_err(clone_error)?;
            repo.branch(local_name, &commit, false).map_err(clone_error)?;
            debug!("Created local branch {local_name}");
        }
        Ok(Git2WorkingCopy {
            repo,
            path: destination.to_path_buf(),
            token: self.token.clone(),
        })
    }
}

/// Working copy opened with git2
pub struct Git2WorkingCopy {
    /// Repository
    repo: Repository,

    /// Root of the working tree
    path: PathBuf,

    /// Token given to git when the remote asks for credentials
    token: Option<String>,
}

impl Git2WorkingCopy {
    /// Names of the local branches and tags
    fn local_refs(&self) -> Result<Vec<String>, DuplicatorError> {
        let mut names = vec![];
        for reference in self.repo.references()? {
            let reference = reference?;
            match reference.name() {
                Some(name) if is_mirrored_ref(name) => names.push(name.to_string()),
                _ => {}
            }
        }
        Ok(names)
    }

    /// Names of the branches and tags of `remote_name`
    ///
    /// The refs are fetched under [`REMOTE_SNAPSHOT`] and removed once read, the
    /// advertisement of a remote without refs can't be listed through git2.
    fn remote_refs(&self, remote_name: &str) -> Result<Vec<String>, DuplicatorError> {
        let mut remote = self.repo.find_remote(remote_name)?;
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(credential_callbacks(self.token.as_deref()));
        fetch_opts.download_tags(AutotagOption::None);
        let refspecs = [
            format!("+refs/heads/*:{REMOTE_SNAPSHOT}heads/*"),
            format!("+refs/tags/*:{REMOTE_SNAPSHOT}tags/*"),
        ];
        remote
            .fetch(&refspecs, Some(&mut fetch_opts), None)
            .map_err(push_error)?;

        let mut snapshot = vec![];
        for reference in self.repo.references_glob(&format!("{REMOTE_SNAPSHOT}*"))? {
            if let Some(name) = reference?.name() {
                snapshot.push(name.to_string());
            }
        }
        let mut names = vec![];
        for name in snapshot {
            self.repo.find_reference(&name)?.delete()?;
            if let Some(stripped) = name.strip_prefix(REMOTE_SNAPSHOT) {
                names.push(format!("refs/{stripped}"));
            }
        }
        Ok(names)
    }

    /// Push the refspecs, failing if git or the remote rejects one of them
    fn push_refspecs(
        &self,
        remote_name: &str,
        refspecs: &[String],
    ) -> Result<(), DuplicatorError> {
        let mut remote = self.repo.find_remote(remote_name)?;
        let rejected: RefCell<Vec<String>> = RefCell::new(vec![]);
        {
            let mut callbacks = credential_callbacks(self.token.as_deref());
            callbacks.push_update_reference(|ref_name, status| {
                if let Some(msg) = status {
                    rejected.borrow_mut().push(format!("{ref_name}: {msg}"));
                }
                Ok(())
            });
            let mut opts = PushOptions::new();
            opts.remote_callbacks(callbacks);
            remote.push(refspecs, Some(&mut opts)).map_err(push_error)?;
        }
        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Push)
                .with_text(&format!("rejected {}", rejected.join(", "))));
        }
        Ok(())
    }
}

/// Refs replicated by a mirror push
fn is_mirrored_ref(name: &str) -> bool {
    (name.starts_with("refs/heads/") || name.starts_with("refs/tags/")) && !name.ends_with("^{}")
}

/// Turn a git2 error into a push error
fn push_error(e: git2::Error) -> DuplicatorError {
    DuplicatorError::new(DuplicatorErrorKind::Push).with_text(&e.to_string())
}

impl WorkingCopy for Git2WorkingCopy {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn head_branch(&self) -> Result<String, DuplicatorError> {
        let head = self.repo.find_reference("HEAD")?;
        let target = head.symbolic_target().ok_or("HEAD is detached")?;
        Ok(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
    }

    fn set_remote(&self, name: &str, url: &str) -> Result<(), DuplicatorError> {
        match self.repo.find_remote(name) {
            Ok(_) => self.repo.remote_set_url(name, url)?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.repo.remote(name, url)?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn push_mirror(&self, remote: &str) -> Result<(), DuplicatorError> {
        let local: BTreeSet<String> = self.local_refs()?.into_iter().collect();
        let mut refspecs: Vec<String> =
            local.iter().map(|name| format!("+{name}:{name}")).collect();
        for name in self.remote_refs(remote)? {
            if !local.contains(&name) {
                debug!("Deleting {name} on {remote}");
                refspecs.push(format!(":{name}"));
            }
        }
        if refspecs.is_empty() {
            return Ok(());
        }
        debug!("Mirroring {} refs to {remote}", refspecs.len());
        self.push_refspecs(remote, &refspecs)
    }

    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<String, DuplicatorError> {
        let commit_error = |e: git2::Error| {
            DuplicatorError::new(DuplicatorErrorKind::Commit).with_text(&e.to_string())
        };
        let mut index = self.repo.index().map_err(commit_error)?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(commit_error)?;
        // a `.gitignore` of the source must not drop the injected files
        for path in paths {
            index.add_path(path).map_err(commit_error)?;
        }
        index.write().map_err(commit_error)?;
        let tree_id = index.write_tree().map_err(commit_error)?;
        let tree = self.repo.find_tree(tree_id).map_err(commit_error)?;
        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now(COMMITTER_NAME, COMMITTER_EMAIL))
            .map_err(commit_error)?;
        let parents = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().map_err(commit_error)?],
            Err(e) if e.code() == ErrorCode::UnbornBranch => vec![],
            Err(e) => return Err(commit_error(e)),
        };
        if parents.iter().any(|parent| parent.tree_id() == tree_id) {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Commit)
                .with_text("nothing to commit, the injected files are already there"));
        }
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parent_refs,
            )
            .map_err(commit_error)?;
        Ok(oid.to_string())
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), DuplicatorError> {
        self.push_refspecs(remote, &[format!("refs/heads/{branch}:refs/heads/{branch}")])
    }

    fn create_tag(&self, name: &str) -> Result<(), DuplicatorError> {
        let tag_error = |e: git2::Error| {
            DuplicatorError::new(DuplicatorErrorKind::Tag).with_text(&e.to_string())
        };
        let target = self
            .repo
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .map_err(tag_error)?;
        self.repo
            .tag_lightweight(name, &target, false)
            .map_err(tag_error)?;
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<(), DuplicatorError> {
        self.push_refspecs(remote, &[format!("refs/tags/{name}:refs/tags/{name}")])
    }
}
