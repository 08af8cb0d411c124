//! Command line options for the git-duplicator tool
use crate::{
    config::DuplicatorConfig,
    duplicate::{DuplicationReport, Duplicator},
    errors::DuplicatorError,
    github::config::GithubConfig,
    utils::count_failures,
    vcs::Git2Vcs,
};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::path::PathBuf;

/// git-duplicator - Duplicate a repository into a new private GitHub repository
#[derive(Parser, Default, Clone, Debug)]
pub struct DuplicatorCli {
    /// HTTPS URL of the repository to duplicate
    #[arg(required_unless_present = "show_config_path")]
    pub source_url: Option<String>,

    /// Name of the new repository
    #[arg(required_unless_present = "show_config_path")]
    pub new_name: Option<String>,

    /// Tag to create on the default branch after the workflow commit
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Copy the collaborators of the source repository
    #[arg(long)]
    pub collaborators: bool,

    /// Protect the configured branches (default: main, dev)
    #[arg(short, long = "protect-branches")]
    pub protect_branches: bool,

    /// README template copied to the root of the new repository
    #[arg(long)]
    pub readme: Option<PathBuf>,

    /// Custom configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the current config path
    #[arg(long)]
    pub show_config_path: bool,

    /// Verbose mode (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl DuplicatorCli {
    /// Log level matching the verbosity
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Log a summary of the run
fn log_report(report: &DuplicationReport) {
    let labels_created = report.labels.created.len() - count_failures(&report.labels.created);
    info!(
        "Labels: {} deleted, {labels_created} created",
        report.labels.deleted.len() - count_failures(&report.labels.deleted)
    );
    for outcome in report
        .labels
        .deleted
        .iter()
        .chain(&report.labels.created)
        .chain(&report.collaborators)
        .chain(&report.protections)
    {
        if let Err(e) = &outcome.result {
            warn!("Not done for '{}': {e}", outcome.item);
        }
    }
    match report.failures() {
        0 => info!(
            "Repo duplication complete! {} is ready.",
            report.repository.full_name()
        ),
        failures => warn!(
            "Repo duplication complete with {failures} failed step(s): {}",
            report.repository.full_name()
        ),
    }
}

/// Run the git-duplicator tool with the provided command line options
/// # Errors
/// Error on any fatal failure, best-effort failures are only logged
pub async fn duplicator_main(cli_args: DuplicatorCli) -> Result<(), DuplicatorError> {
    let config = DuplicatorConfig::try_new(cli_args)?;
    if config.cli_args.show_config_path {
        println!("{}", config.config_path.display());
        return Ok(());
    }
    let (source_url, new_name) = match (&config.cli_args.source_url, &config.cli_args.new_name) {
        (Some(source_url), Some(new_name)) => (source_url.clone(), new_name.clone()),
        _ => return Err("Missing <SOURCE_URL> or <NEW_NAME>".into()),
    };
    let settings = config.settings()?;
    let forge = GithubConfig::get_plateform(&config)?;
    let vcs = Git2Vcs::new(Some(settings.token.clone()));
    let duplicator = Duplicator::new(&forge, vcs, settings);
    let report = duplicator
        .duplicate(&source_url, &new_name, config.cli_args.tag.as_deref())
        .await?;
    log_report(&report);
    Ok(())
}
