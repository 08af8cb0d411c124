//! Github configuration
use super::platform::GithubPlatform;
use serde::{Deserialize, Serialize};

use crate::{
    config::DuplicatorConfig,
    config_value,
    errors::{DuplicatorError, DuplicatorErrorKind},
};

/// Environment variable holding the token
pub(crate) const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the API URL
pub(crate) const API_URL_ENV: &str = "GITHUB_API_URL";

/// Github configuration
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct GithubConfig {
    /// Github token, used when `GITHUB_TOKEN` is unset
    pub token: Option<String>,

    /// REST API URL, for GitHub Enterprise
    pub api_url: Option<String>,
}

impl GithubConfig {
    /// Get the github token
    /// # Errors
    /// `MissingCredential` if neither `GITHUB_TOKEN` nor the config file has one
    pub fn get_token(config: &DuplicatorConfig) -> Result<String, DuplicatorError> {
        Self::get_token_from(config, TOKEN_ENV)
    }

    /// Get the github token, reading the environment variable `token_env`
    /// # Errors
    /// `MissingCredential` if neither `token_env` nor the config file has one
    pub(crate) fn get_token_from(
        config: &DuplicatorConfig,
        token_env: &str,
    ) -> Result<String, DuplicatorError> {
        config_value!(config, github, token, token_env).ok_or_else(|| {
            DuplicatorError::new(DuplicatorErrorKind::MissingCredential).with_text(&format!(
                "Please set your {token_env} environment variable (or github.token in {})",
                config.config_path.display()
            ))
        })
    }

    /// Get the github platform
    /// # Errors
    /// `MissingCredential` if there is no token
    pub fn get_plateform(config: &DuplicatorConfig) -> Result<GithubPlatform, DuplicatorError> {
        let token = Self::get_token(config)?;
        let api_url = config_value!(config, github, api_url, API_URL_ENV);
        Ok(GithubPlatform::new(token, api_url))
    }
}
