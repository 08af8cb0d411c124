//! Github Platform
use super::{
    repo::{
        CollaboratorPermission, CreateRepoGithub, LabelGithub, ProtectionGithub, RepoGithub,
        UserGithub,
    },
    GITHUB_API_HEADER, GITHUB_API_URL, GITHUB_API_VERSION, PER_PAGE,
};
use crate::{
    errors::{DuplicatorError, DuplicatorErrorKind},
    forge::{BranchProtectionRule, Forge, ForgeFuture, Permission, RepositoryHandle},
    labels::LabelSpec,
};
use log::debug;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
    Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use urlencoding::encode;

/// Github Platform
#[derive(Default, Debug, Clone)]
pub struct GithubPlatform {
    /// Base URL of the REST API
    api_url: String,

    /// Github token
    token: String,

    /// Reqwest client
    client: reqwest::Client,
}

/// `/repos/{owner}/{repo}` path of a repository
fn repo_path(owner: &str, name: &str) -> String {
    format!("/repos/{}/{}", encode(owner), encode(name))
}

/// Turn an unsuccessful response into an error of `kind` naming `entity`
async fn error_for(response: Response, kind: DuplicatorErrorKind, entity: &str) -> DuplicatorError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    DuplicatorError::new(kind).with_text(&format!("{entity}: {status} {text}"))
}

impl GithubPlatform {
    /// Create a new GithubPlatform
    pub(crate) fn new(token: String, api_url: Option<String>) -> Self {
        let api_url = api_url.unwrap_or_else(|| GITHUB_API_URL.to_string());
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    /// Request to `path` with the authentication and API headers
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = &self.token;
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/vnd.github+json")
            .header(
                USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .header(GITHUB_API_HEADER, GITHUB_API_VERSION)
    }

    /// Send a request and fail with `kind` on an unsuccessful status
    async fn send(
        &self,
        request: RequestBuilder,
        kind: DuplicatorErrorKind,
        entity: &str,
    ) -> Result<Response, DuplicatorError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_for(response, kind, entity).await);
        }
        Ok(response)
    }

    /// Collect every page of a listing
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        kind: DuplicatorErrorKind,
    ) -> Result<Vec<T>, DuplicatorError> {
        let mut page: usize = 1;
        let mut all_items = vec![];
        loop {
            let request = self.request(Method::GET, path).query(&[
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let response = self.send(request, kind, path).await?;
            let text = response.text().await?;
            let items: Vec<T> = serde_json::from_str(&text)?;
            let count = items.len();
            debug!("Requested github {path} (page {page}): {count}");
            all_items.extend(items);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(all_items)
    }
}

impl Forge for GithubPlatform {
    fn get_current_user(&self) -> ForgeFuture<'_, String> {
        Box::pin(async move {
            let request = self.request(Method::GET, "/user");
            let response = self.send(request, DuplicatorErrorKind::Forge, "user").await?;
            let text = response.text().await?;
            let user: UserGithub = serde_json::from_str(&text)?;
            Ok(user.login)
        })
    }

    fn create_repo(&self, name: &str, private: bool) -> ForgeFuture<'_, RepositoryHandle> {
        let name = name.to_string();
        Box::pin(async move {
            let request = self.request(Method::POST, "/user/repos").json(&CreateRepoGithub {
                name: &name,
                private,
                auto_init: false,
            });
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await?;
                let kind = if status == StatusCode::UNPROCESSABLE_ENTITY
                    && text.contains("already exists")
                {
                    DuplicatorErrorKind::RepositoryExists
                } else {
                    DuplicatorErrorKind::RepoCreation
                };
                return Err(DuplicatorError::new(kind)
                    .with_text(&format!("{name}: {status} {text}")));
            }
            let text = response.text().await?;
            let repo: RepoGithub = serde_json::from_str(&text)?;
            Ok(repo.into())
        })
    }

    fn set_default_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()> {
        let path = repo_path(&repo.owner, &repo.name);
        let branch = branch.to_string();
        Box::pin(async move {
            let request = self
                .request(Method::PATCH, &path)
                .json(&json!({ "default_branch": branch }));
            self.send(request, DuplicatorErrorKind::Forge, &format!("default branch {branch}"))
                .await?;
            Ok(())
        })
    }

    fn list_labels(&self, repo: &RepositoryHandle) -> ForgeFuture<'_, Vec<String>> {
        let path = format!("{}/labels", repo_path(&repo.owner, &repo.name));
        Box::pin(async move {
            let labels: Vec<LabelGithub> = self
                .get_all_pages(&path, DuplicatorErrorKind::Forge)
                .await?;
            Ok(labels.into_iter().map(|l| l.name).collect())
        })
    }

    fn delete_label(&self, repo: &RepositoryHandle, name: &str) -> ForgeFuture<'_, ()> {
        let path = format!(
            "{}/labels/{}",
            repo_path(&repo.owner, &repo.name),
            encode(name)
        );
        let name = name.to_string();
        Box::pin(async move {
            let request = self.request(Method::DELETE, &path);
            self.send(request, DuplicatorErrorKind::LabelDeletion, &format!("label '{name}'"))
                .await?;
            Ok(())
        })
    }

    fn create_label(&self, repo: &RepositoryHandle, label: &LabelSpec) -> ForgeFuture<'_, ()> {
        let path = format!("{}/labels", repo_path(&repo.owner, &repo.name));
        let label = label.clone();
        Box::pin(async move {
            let request = self.request(Method::POST, &path).json(&LabelGithub {
                name: label.name.clone(),
                color: label.color.clone(),
                description: Some(label.description.clone()),
            });
            self.send(
                request,
                DuplicatorErrorKind::LabelCreation,
                &format!("label '{}'", label.name),
            )
            .await?;
            Ok(())
        })
    }

    fn list_collaborators(&self, owner: &str, name: &str) -> ForgeFuture<'_, Vec<String>> {
        let path = format!("{}/collaborators", repo_path(owner, name));
        Box::pin(async move {
            let users: Vec<UserGithub> = self
                .get_all_pages(&path, DuplicatorErrorKind::Forge)
                .await?;
            Ok(users.into_iter().map(|u| u.login).collect())
        })
    }

    fn add_collaborator(
        &self,
        repo: &RepositoryHandle,
        login: &str,
        permission: Permission,
    ) -> ForgeFuture<'_, ()> {
        let path = format!(
            "{}/collaborators/{}",
            repo_path(&repo.owner, &repo.name),
            encode(login)
        );
        let login = login.to_string();
        Box::pin(async move {
            let request = self
                .request(Method::PUT, &path)
                .json(&CollaboratorPermission { permission });
            self.send(
                request,
                DuplicatorErrorKind::CollaboratorAddition,
                &format!("collaborator '{login}'"),
            )
            .await?;
            Ok(())
        })
    }

    fn get_branch(&self, repo: &RepositoryHandle, branch: &str) -> ForgeFuture<'_, ()> {
        let path = format!(
            "{}/branches/{}",
            repo_path(&repo.owner, &repo.name),
            encode(branch)
        );
        let branch = branch.to_string();
        Box::pin(async move {
            let request = self.request(Method::GET, &path);
            self.send(
                request,
                DuplicatorErrorKind::BranchProtection,
                &format!("branch '{branch}'"),
            )
            .await?;
            Ok(())
        })
    }

    fn set_branch_protection(
        &self,
        repo: &RepositoryHandle,
        rule: &BranchProtectionRule,
    ) -> ForgeFuture<'_, ()> {
        let path = format!(
            "{}/branches/{}/protection",
            repo_path(&repo.owner, &repo.name),
            encode(&rule.branch)
        );
        let branch = rule.branch.clone();
        let body = ProtectionGithub::from(rule);
        Box::pin(async move {
            let request = self.request(Method::PUT, &path).json(&body);
            self.send(
                request,
                DuplicatorErrorKind::BranchProtection,
                &format!("branch '{branch}'"),
            )
            .await?;
            Ok(())
        })
    }
}
