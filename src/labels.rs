//! Label catalog and label normalization
use std::collections::HashSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{DuplicatorError, DuplicatorErrorKind},
    forge::{Forge, RepositoryHandle},
    utils::ItemOutcome,
};

/// One label of the catalog
#[derive(Deserialize, Serialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct LabelSpec {
    /// Name of the label, unique in a repository
    pub name: String,

    /// Six hex digits, without `#`
    pub color: String,

    /// Description of the label
    #[serde(default)]
    pub description: String,
}

impl LabelSpec {
    /// Create a label
    pub fn new(name: &str, color: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

/// Labels applied to every duplicated repository
pub fn default_catalog() -> Vec<LabelSpec> {
    vec![
        LabelSpec::new("HELP", "008672", "Extra attention is needed"),
        LabelSpec::new("priority: critical", "b60205", ""),
        LabelSpec::new("priority: high", "d93f0b", ""),
        LabelSpec::new("priority: medium", "fbca04", ""),
        LabelSpec::new("priority: low", "0e8a16", ""),
        LabelSpec::new("type: bug", "d73a4a", "Something isn't working"),
        LabelSpec::new("type: discussion", "d4c5f9", ""),
        LabelSpec::new("type: documentation", "006b75", ""),
        LabelSpec::new("type: enhancement", "84b6eb", ""),
        LabelSpec::new(
            "type: complex",
            "3E4B9E",
            "A theme of work that contain sub-tasks",
        ),
        LabelSpec::new("type: feature request", "fbca04", "New feature or request"),
        LabelSpec::new("type: question", "d876e3", "Further information is requested"),
    ]
}

/// Check that names are unique and colors are six hex digits
/// # Errors
/// Error naming the first invalid label
pub fn validate_catalog(labels: &[LabelSpec]) -> Result<(), DuplicatorError> {
    let mut names = HashSet::new();
    for label in labels {
        if label.name.trim().is_empty() {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Config)
                .with_text("label with an empty name"));
        }
        if !names.insert(label.name.as_str()) {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Config)
                .with_text(&format!("duplicate label '{}'", label.name)));
        }
        if label.color.len() != 6 || !label.color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DuplicatorError::new(DuplicatorErrorKind::Config).with_text(&format!(
                "label '{}' has invalid color '{}'",
                label.name, label.color
            )));
        }
    }
    Ok(())
}

/// Result of a label normalization
#[derive(Debug, Default)]
pub struct LabelOutcomes {
    /// One outcome per label found on the repository
    pub deleted: Vec<ItemOutcome>,

    /// One outcome per catalog label
    pub created: Vec<ItemOutcome>,
}

/// Replace every label of `repo` with `catalog`
///
/// Listing failures and individual delete/create failures are logged and
/// recorded, never returned.
pub(crate) async fn normalize_labels(
    forge: &dyn Forge,
    repo: &RepositoryHandle,
    catalog: &[LabelSpec],
) -> LabelOutcomes {
    let mut outcomes = LabelOutcomes::default();
    info!("Deleting default labels of {}", repo.full_name());
    let existing = match forge.list_labels(repo).await {
        Ok(labels) => labels,
        Err(e) => {
            warn!("Couldn't list labels of {}: {e}", repo.full_name());
            outcomes.deleted.push(ItemOutcome::new("*", Err(e)));
            vec![]
        }
    };
    for name in existing {
        let result = forge.delete_label(repo, &name).await;
        if let Err(e) = &result {
            warn!("Couldn't delete label {name}: {e}");
        }
        outcomes.deleted.push(ItemOutcome::new(&name, result));
    }

    info!("Adding {} custom labels", catalog.len());
    for label in catalog {
        let result = forge.create_label(repo, label).await;
        match &result {
            Ok(()) => info!("Created label: {}", label.name),
            Err(e) => warn!("Couldn't create label {}: {e}", label.name),
        }
        outcomes.created.push(ItemOutcome::new(&label.name, result));
    }
    outcomes
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeForge;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 12);
        assert!(validate_catalog(&catalog).is_ok());
    }

    #[test]
    fn rejects_duplicate_names() {
        let labels = vec![
            LabelSpec::new("bug", "d73a4a", ""),
            LabelSpec::new("bug", "ffffff", ""),
        ];
        let err = validate_catalog(&labels).unwrap_err();
        assert_eq!(err.kind(), &DuplicatorErrorKind::Config);
        assert!(err.to_string().contains("duplicate label 'bug'"));
    }

    #[test]
    fn rejects_bad_colors() {
        for color in ["#d73a4a", "d73a4", "zzzzzz", ""] {
            let labels = vec![LabelSpec::new("bug", color, "")];
            assert!(validate_catalog(&labels).is_err(), "{color} accepted");
        }
    }

    #[tokio::test]
    async fn label_set_equals_catalog() {
        let forge = FakeForge::new("me");
        let repo = forge.seed_repo("app-copy");
        forge.seed_labels(&repo, &["bug", "duplicate", "wontfix", "type: bug"]);

        let catalog = default_catalog();
        let outcomes = normalize_labels(&forge, &repo, &catalog).await;

        assert_eq!(outcomes.deleted.len(), 4);
        assert!(outcomes.deleted.iter().all(ItemOutcome::is_success));
        assert!(outcomes.created.iter().all(ItemOutcome::is_success));
        let mut expected: Vec<String> = catalog.iter().map(|l| l.name.clone()).collect();
        expected.sort();
        assert_eq!(forge.label_names(&repo), expected);
    }

    #[tokio::test]
    async fn failures_are_recorded_and_skipped() {
        let forge = FakeForge::new("me");
        let repo = forge.seed_repo("app-copy");
        forge.seed_labels(&repo, &["bug", "question"]);
        forge.fail_delete_label("bug");
        forge.fail_create_label("HELP");

        let catalog = default_catalog();
        let outcomes = normalize_labels(&forge, &repo, &catalog).await;

        let failed_deletes: Vec<_> = outcomes.deleted.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed_deletes.len(), 1);
        assert_eq!(failed_deletes[0].item, "bug");
        let failed_creates: Vec<_> = outcomes.created.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(failed_creates.len(), 1);
        assert_eq!(failed_creates[0].item, "HELP");
        assert_eq!(outcomes.created.len(), catalog.len());
    }
}
