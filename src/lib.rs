//! # git-duplicator
//!
//! Duplicate a git repository into a new private GitHub repository
//!
//! The whole history is mirrored, the labels are replaced by a fixed catalog,
//! a CI workflow is committed on the default branch and, optionally, a tag is
//! pushed, collaborators are copied and branches are protected.
//!
//! ## Usage
//!
//! ```txt
//! Usage: git-duplicator [OPTIONS] <SOURCE_URL> <NEW_NAME>
//!
//! Arguments:
//!   <SOURCE_URL>  HTTPS URL of the repository to duplicate
//!   <NEW_NAME>    Name of the new repository
//!
//! Options:
//!   -t, --tag <TAG>          Tag to create on the default branch after the workflow commit
//!       --collaborators      Copy the collaborators of the source repository
//!   -p, --protect-branches   Protect the configured branches (default: main, dev)
//!       --readme <README>    README template copied to the root of the new repository
//!   -c, --config <CONFIG>    Custom configuration file path
//!       --show-config-path   Show the current config path
//!   -v, --verbose...         Verbose mode (-v, -vv)
//!   -h, --help               Print help
//! ```
//!
//! The token is read from `GITHUB_TOKEN` (a `.env` file is loaded first).

#![warn(clippy::all, rust_2018_idioms)]
#![deny(
    missing_docs,
    clippy::all,
    clippy::missing_docs_in_private_items,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![warn(clippy::multiple_crate_versions)]

pub(crate) mod cli;
pub(crate) mod config;
pub(crate) mod duplicate;
pub(crate) mod errors;
pub(crate) mod forge;
pub(crate) mod labels;
pub(crate) mod macros;
pub(crate) mod scratch;
pub(crate) mod utils;
pub(crate) mod vcs;
pub(crate) use macros::config_value;

mod github;

#[cfg(test)]
mod testing;

pub use cli::{duplicator_main, DuplicatorCli};
pub use config::{ConfigData, DuplicateConfig, DuplicatorConfig};
pub use duplicate::{DuplicateSettings, DuplicationReport, Duplicator};
pub use errors::{DuplicatorError, DuplicatorErrorKind};
pub use forge::{BranchProtectionRule, Forge, ForgeFuture, Permission, RepositoryHandle};
pub use labels::{default_catalog, validate_catalog, LabelOutcomes, LabelSpec};
pub use utils::{authenticated_url, parse_repo_slug, require_https, ItemOutcome};
pub use vcs::{Git2Vcs, Git2WorkingCopy, Vcs, WorkingCopy};
