//! In-memory forge and git used by the tests
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    errors::{DuplicatorError, DuplicatorErrorKind},
    forge::{BranchProtectionRule, Forge, ForgeFuture, Permission, RepositoryHandle},
    labels::LabelSpec,
    vcs::{Vcs, WorkingCopy},
};

/// State of one repository of the fake forge
#[derive(Default)]
struct FakeRepo {
    handle: RepositoryHandle,
    private: bool,
    labels: Vec<String>,
    collaborators: BTreeMap<String, Permission>,
    protections: BTreeMap<String, BranchProtectionRule>,
}

#[derive(Default)]
struct ForgeState {
    user: String,
    repos: BTreeMap<String, FakeRepo>,
    default_labels: Vec<String>,
    branches: Vec<String>,
    source_collaborators: HashMap<String, Vec<String>>,
    failing_deletes: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_collaborators: HashSet<String>,
    calls: Vec<String>,
}

/// Forge keeping everything in memory
#[derive(Default)]
pub(crate) struct FakeForge {
    state: Mutex<ForgeState>,
}

fn fake_error(kind: DuplicatorErrorKind, text: &str) -> DuplicatorError {
    DuplicatorError::new(kind).with_text(text)
}

impl FakeForge {
    pub(crate) fn new(user: &str) -> Self {
        let forge = Self::default();
        forge.state().user = user.to_string();
        forge
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ForgeState> {
        self.state.lock().unwrap()
    }

    fn handle(user: &str, name: &str) -> RepositoryHandle {
        RepositoryHandle {
            owner: user.to_string(),
            name: name.to_string(),
            clone_url: format!("https://forge.example/{user}/{name}.git"),
            default_branch: "main".to_string(),
        }
    }

    /// Run `f` on a repository, failing with `kind` if it doesn't exist
    fn with_repo<T>(
        &self,
        repo: &RepositoryHandle,
        kind: DuplicatorErrorKind,
        f: impl FnOnce(&mut FakeRepo) -> Result<T, DuplicatorError>,
    ) -> Result<T, DuplicatorError> {
        let mut state = self.state();
        match state.repos.get_mut(&repo.full_name()) {
            Some(fake) => f(fake),
            None => Err(fake_error(kind, "repository not found")),
        }
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    pub(crate) fn seed_repo(&self, name: &str) -> RepositoryHandle {
        let mut state = self.state();
        let handle = Self::handle(&state.user, name);
        state.repos.insert(
            handle.full_name(),
            FakeRepo {
                handle: handle.clone(),
                ..Default::default()
            },
        );
        handle
    }

    pub(crate) fn seed_labels(&self, repo: &RepositoryHandle, labels: &[&str]) {
        let mut state = self.state();
        if let Some(fake) = state.repos.get_mut(&repo.full_name()) {
            fake.labels = labels.iter().map(|l| l.to_string()).collect();
        }
    }

    /// Labels given to every repository created afterwards
    pub(crate) fn seed_default_labels(&self, labels: &[&str]) {
        self.state().default_labels = labels.iter().map(|l| l.to_string()).collect();
    }

    /// Branches existing on every repository
    pub(crate) fn seed_branches(&self, branches: &[&str]) {
        self.state().branches = branches.iter().map(|b| b.to_string()).collect();
    }

    pub(crate) fn seed_collaborators(&self, owner: &str, name: &str, logins: &[&str]) {
        self.state().source_collaborators.insert(
            format!("{owner}/{name}"),
            logins.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub(crate) fn fail_delete_label(&self, name: &str) {
        self.state().failing_deletes.insert(name.to_string());
    }

    pub(crate) fn fail_create_label(&self, name: &str) {
        self.state().failing_creates.insert(name.to_string());
    }

    pub(crate) fn fail_add_collaborator(&self, login: &str) {
        self.state().failing_collaborators.insert(login.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn label_names(&self, repo: &RepositoryHandle) -> Vec<String> {
        let state = self.state();
        let mut labels = state
            .repos
            .get(&repo.full_name())
            .map(|fake| fake.labels.clone())
            .unwrap_or_default();
        labels.sort();
        labels
    }

    pub(crate) fn is_private(&self, repo: &RepositoryHandle) -> bool {
        self.state()
            .repos
            .get(&repo.full_name())
            .is_some_and(|fake| fake.private)
    }

    pub(crate) fn permission(&self, repo: &RepositoryHandle, login: &str) -> Option<Permission> {
        self.state()
            .repos
            .get(&repo.full_name())
            .and_then(|fake| fake.collaborators.get(login).copied())
    }

    pub(crate) fn protection(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
    ) -> Option<BranchProtectionRule> {
        self.state()
            .repos
            .get(&repo.full_name())
            .and_then(|fake| fake.protections.get(branch).cloned())
    }
}

impl Forge for FakeForge {
    fn get_current_user(&self) -> ForgeFuture<'_, String> {
        self.record("get_current_user".to_string());
        let user = self.state().user.clone();
        Box::pin(async move { Ok(user) })
    }

    fn create_repo(&self, name: &str, private: bool) -> ForgeFuture<'_, RepositoryHandle> {
        self.record(format!("create_repo {name}"));
        let mut state = self.state();
        let handle = Self::handle(&state.user, name);
        let result = if state.repos.contains_key(&handle.full_name()) {
            Err(fake_error(
                DuplicatorErrorKind::RepositoryExists,
                "name already exists on this account",
            ))
        } else {
            let labels = state.default_labels.clone();
            state.repos.insert(
                handle.full_name(),
                FakeRepo {
                    handle: handle.clone(),
                    private,
                    labels,
                    ..Default::default()
                },
            );
            Ok(handle)
        };
        Box::pin(async move { result })
    }

    fn set_default_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()> {
        self.record(format!("set_default_branch {} {branch}", repo.full_name()));
        let result = self.with_repo(repo, DuplicatorErrorKind::Forge, |fake| {
            fake.handle.default_branch = branch.to_string();
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn list_labels(&self, repo: &RepositoryHandle) -> ForgeFuture<'_, Vec<String>> {
        self.record(format!("list_labels {}", repo.full_name()));
        let result = self.with_repo(repo, DuplicatorErrorKind::Forge, |fake| {
            Ok(fake.labels.clone())
        });
        Box::pin(async move { result })
    }

    fn delete_label(&self, repo: &RepositoryHandle, name: &str) -> ForgeFuture<'_, ()> {
        self.record(format!("delete_label {name}"));
        let failing = self.state().failing_deletes.contains(name);
        let result = self.with_repo(repo, DuplicatorErrorKind::LabelDeletion, |fake| {
            if failing || !fake.labels.iter().any(|l| l == name) {
                return Err(fake_error(DuplicatorErrorKind::LabelDeletion, name));
            }
            fake.labels.retain(|l| l != name);
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn create_label(&self, repo: &RepositoryHandle, label: &LabelSpec) -> ForgeFuture<'_, ()> {
        self.record(format!("create_label {}", label.name));
        let failing = self.state().failing_creates.contains(&label.name);
        let result = self.with_repo(repo, DuplicatorErrorKind::LabelCreation, |fake| {
            if failing || fake.labels.contains(&label.name) {
                return Err(fake_error(DuplicatorErrorKind::LabelCreation, &label.name));
            }
            fake.labels.push(label.name.clone());
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn list_collaborators(&self, owner: &str, name: &str) -> ForgeFuture<'_, Vec<String>> {
        self.record(format!("list_collaborators {owner}/{name}"));
        let logins = self
            .state()
            .source_collaborators
            .get(&format!("{owner}/{name}"))
            .cloned()
            .unwrap_or_default();
        Box::pin(async move { Ok(logins) })
    }

    fn add_collaborator(
        &self,
        repo: &RepositoryHandle,
        login: &str,
        permission: Permission,
    ) -> ForgeFuture<'_, ()> {
        self.record(format!("add_collaborator {login} {permission}"));
        let failing = self.state().failing_collaborators.contains(login);
        let result = self.with_repo(repo, DuplicatorErrorKind::CollaboratorAddition, |fake| {
            if failing {
                return Err(fake_error(DuplicatorErrorKind::CollaboratorAddition, login));
            }
            fake.collaborators.insert(login.to_string(), permission);
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn get_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()> {
        self.record(format!("get_branch {branch}"));
        let exists = self.state().branches.iter().any(|b| b == branch);
        let result = if exists {
            Ok(())
        } else {
            Err(fake_error(
                DuplicatorErrorKind::Forge,
                &format!("{}: branch {branch} not found", repo.full_name()),
            ))
        };
        Box::pin(async move { result })
    }

    fn set_branch_protection(
        &self,
        repo: &RepositoryHandle,
        rule: &BranchProtectionRule,
    ) -> ForgeFuture<'_, ()> {
        self.record(format!("set_branch_protection {}", rule.branch));
        let result = self.with_repo(repo, DuplicatorErrorKind::BranchProtection, |fake| {
            fake.protections.insert(rule.branch.clone(), rule.clone());
            Ok(())
        });
        Box::pin(async move { result })
    }
}

struct VcsState {
    calls: Vec<String>,
    head: String,
    fail_clone: bool,
    fail_push: bool,
}

/// Git recording the calls, files live in the real scratch directory
#[derive(Clone)]
pub(crate) struct FakeVcs {
    state: Arc<Mutex<VcsState>>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(VcsState {
                calls: vec![],
                head: "main".to_string(),
                fail_clone: false,
                fail_push: false,
            })),
        }
    }
}

impl FakeVcs {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn fail_clone(&self) {
        self.state.lock().unwrap().fail_clone = true;
    }

    pub(crate) fn fail_push(&self) {
        self.state.lock().unwrap().fail_push = true;
    }

    pub(crate) fn set_head(&self, branch: &str) {
        self.state.lock().unwrap().head = branch.to_string();
    }
}

impl Vcs for FakeVcs {
    type Checkout = FakeCheckout;

    fn clone_repo(&self, url: &str, destination: &Path) -> Result<FakeCheckout, DuplicatorError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("clone {url}"));
        if state.fail_clone {
            return Err(fake_error(DuplicatorErrorKind::Clone, "repository not found"));
        }
        Ok(FakeCheckout {
            state: self.state.clone(),
            path: destination.to_path_buf(),
        })
    }
}

/// Working copy of [`FakeVcs`]
pub(crate) struct FakeCheckout {
    state: Arc<Mutex<VcsState>>,
    path: PathBuf,
}

impl FakeCheckout {
    fn record(&self, call: String) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.fail_push
    }

    fn push_result(&self, call: String) -> Result<(), DuplicatorError> {
        if self.record(call) {
            return Err(fake_error(DuplicatorErrorKind::Push, "remote rejected"));
        }
        Ok(())
    }
}

impl WorkingCopy for FakeCheckout {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn head_branch(&self) -> Result<String, DuplicatorError> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    fn set_remote(&self, name: &str, url: &str) -> Result<(), DuplicatorError> {
        self.record(format!("set_remote {name} {url}"));
        Ok(())
    }

    fn push_mirror(&self, remote: &str) -> Result<(), DuplicatorError> {
        self.push_result(format!("push_mirror {remote}"))
    }

    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<String, DuplicatorError> {
        for path in paths {
            assert!(self.path.join(path).is_file(), "{} not written", path.display());
        }
        let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        self.record(format!("commit {message} [{}]", files.join(", ")));
        Ok("0123456789abcdef".to_string())
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<(), DuplicatorError> {
        self.push_result(format!("push_branch {remote} {branch}"))
    }

    fn create_tag(&self, name: &str) -> Result<(), DuplicatorError> {
        self.record(format!("create_tag {name}"));
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<(), DuplicatorError> {
        self.push_result(format!("push_tag {remote} {name}"))
    }
}
