//! Configuration handling
use std::{
    env::temp_dir,
    fs::{create_dir_all, read_to_string, File},
    io::Write,
    path::PathBuf,
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::{
    cli::DuplicatorCli,
    duplicate::DuplicateSettings,
    errors::{DuplicatorError, DuplicatorErrorKind},
    github::config::{GithubConfig, TOKEN_ENV},
    labels::{default_catalog, validate_catalog, LabelSpec},
};

/// Commit message of the injected workflow
pub(crate) const DEFAULT_COMMIT_MESSAGE: &str = "Add GitHub Actions workflow";

/// Workflow copied when none is configured
pub(crate) const DEFAULT_WORKFLOW: &str = "safety.yml";

/// Branches protected when none are configured
pub(crate) const DEFAULT_PROTECTED_BRANCHES: [&str; 2] = ["main", "dev"];

/// Configuration data
#[derive(Default, Clone, Debug)]
pub struct DuplicatorConfig {
    /// path to the configuration file
    pub config_path: PathBuf,

    /// actual configuration data
    pub config_data: ConfigData,

    /// CLI arguments
    pub cli_args: DuplicatorCli,
}

/// Content of the configuration file
#[derive(Deserialize, Serialize, Default, Clone, Debug)]
pub struct ConfigData {
    /// Github configuration
    pub github: Option<GithubConfig>,

    /// Duplication settings
    pub duplicate: Option<DuplicateConfig>,

    /// Label catalog replacing the default one
    pub labels: Option<Vec<LabelSpec>>,
}

/// `[duplicate]` section of the configuration file
#[derive(Deserialize, Serialize, Default, Clone, Debug)]
pub struct DuplicateConfig {
    /// Workflow files copied to `.github/workflows`
    pub workflows: Option<Vec<PathBuf>>,

    /// README template copied to the root of the repository
    pub readme: Option<PathBuf>,

    /// Message of the workflow commit
    pub commit_message: Option<String>,

    /// Copy the collaborators of the source repository
    #[serde(default)]
    pub replicate_collaborators: bool,

    /// Protect the branches listed in `protected_branches`
    #[serde(default)]
    pub protect_branches: bool,

    /// Branches to protect
    pub protected_branches: Option<Vec<String>>,

    /// Where scratch clones are created
    pub scratch_dir: Option<PathBuf>,
}

impl DuplicatorConfig {
    /// Create a new Config object from the CLI path or the default path
    /// # Errors
    /// Error if the config file can't be opened or is invalid
    pub fn try_new(cli_args: DuplicatorCli) -> Result<Self, DuplicatorError> {
        let config_path = match cli_args.config.clone() {
            Some(p) => p,
            None => Self::get_config_path()?,
        };
        let contents = read_to_string(&config_path)
            .map_err(|e| DuplicatorError::new_with_source("Unable to open", e))?;
        Self::parse(config_path, &contents, cli_args)
    }

    /// Build the config from the content of a config file
    /// # Errors
    /// `Config` if the TOML or the label catalog is invalid
    pub fn parse(
        config_path: PathBuf,
        contents: &str,
        cli_args: DuplicatorCli,
    ) -> Result<Self, DuplicatorError> {
        let config_data: ConfigData = toml::from_str(contents)?;
        if let Some(labels) = &config_data.labels {
            validate_catalog(labels)?;
        }
        Ok(DuplicatorConfig {
            config_path,
            config_data,
            cli_args,
        })
    }

    /// Get the path to the config file
    /// # Errors
    /// Error if the home directory can't be found
    pub fn get_config_path() -> Result<PathBuf, DuplicatorError> {
        let home_dir = match home_dir() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err("Unable to get your home dir! home::home_dir() isn't working".into()),
        };
        let config_directory = home_dir.join(".config").join(".git-duplicator");
        let config_path = config_directory.join("config.toml");
        create_dir_all(config_directory)
            .map_err(|e| DuplicatorError::new_with_source("Unable to create config dir", e))?;
        if !config_path.exists() {
            let mut file = File::create(&config_path)
                .map_err(|e| DuplicatorError::new_with_source("Unable to create config file", e))?;
            file.write_all(b"").map_err(|e| {
                DuplicatorError::new_with_source("Unable to write to config file", e)
            })?;
        }
        Ok(config_path)
    }

    /// Merge the config file and the CLI flags into the settings of a run
    /// # Errors
    /// `MissingCredential` if there is no token
    pub fn settings(&self) -> Result<DuplicateSettings, DuplicatorError> {
        self.settings_with_token_env(TOKEN_ENV)
    }

    /// [`DuplicatorConfig::settings`], reading the token from `token_env`
    pub(crate) fn settings_with_token_env(
        &self,
        token_env: &str,
    ) -> Result<DuplicateSettings, DuplicatorError> {
        let token = GithubConfig::get_token_from(self, token_env)?;
        let duplicate = self.config_data.duplicate.clone().unwrap_or_default();
        let workflows = duplicate
            .workflows
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_WORKFLOW)]);
        if workflows.is_empty() {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Config)
                .with_text("duplicate.workflows can't be empty"));
        }
        let protect = self.cli_args.protect_branches || duplicate.protect_branches;
        let protected_branches = if protect {
            duplicate.protected_branches.unwrap_or_else(|| {
                DEFAULT_PROTECTED_BRANCHES
                    .iter()
                    .map(|b| b.to_string())
                    .collect()
            })
        } else {
            vec![]
        };
        Ok(DuplicateSettings {
            token,
            labels: self
                .config_data
                .labels
                .clone()
                .unwrap_or_else(default_catalog),
            workflows,
            readme: self.cli_args.readme.clone().or(duplicate.readme),
            commit_message: duplicate
                .commit_message
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            replicate_collaborators: self.cli_args.collaborators
                || duplicate.replicate_collaborators,
            protected_branches,
            scratch_root: duplicate.scratch_dir.unwrap_or_else(temp_dir),
        })
    }
}
