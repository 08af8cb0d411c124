//! Error handling for the git-duplicator crate.
use std::{error::Error as StdError, fmt};

/// Error type for the git-duplicator crate.
#[derive(Debug)]
pub struct DuplicatorError {
    /// Inner error.
    inner: Box<Inner>,
}

impl DuplicatorError {
    /// Create a new error.
    pub(crate) fn new(kind: DuplicatorErrorKind) -> Self {
        Self {
            inner: Box::new(Inner { kind, source: None }),
        }
    }

    /// Create a new error of kind `Custom` with a source.
    pub(crate) fn new_with_source<E>(text: &str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source: BoxError = source.into();
        Self::new(DuplicatorErrorKind::Custom).with_text(&format!("{text}: {source}"))
    }

    /// Attach a text to the error.
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.inner.source = Some(Box::new(std::io::Error::other(text.to_string())));
        self
    }

    /// Change the kind of the error, keeping its source.
    pub(crate) fn with_kind(mut self, kind: DuplicatorErrorKind) -> Self {
        self.inner.kind = kind;
        self
    }

    /// Kind of the error
    pub fn kind(&self) -> &DuplicatorErrorKind {
        &self.inner.kind
    }
}

/// Type alias for a boxed error.
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Inner error type for the git-duplicator crate.
#[derive(Debug)]
struct Inner {
    /// Error kind.
    kind: DuplicatorErrorKind,

    /// Source error.
    source: Option<BoxError>,
}

/// Kind of a [`DuplicatorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatorErrorKind {
    /// No forge credential available.
    MissingCredential,

    /// Invalid configuration file.
    Config,

    /// A file to inject is missing from the working directory.
    MissingFile,

    /// The source URL is not an HTTPS URL.
    UnsupportedScheme,

    /// Cloning the source repository failed.
    Clone,

    /// A repository with that name already exists.
    RepositoryExists,

    /// Error related to the repository creation.
    RepoCreation,

    /// A push was rejected or failed.
    Push,

    /// Creating the workflow commit failed.
    Commit,

    /// Creating the tag failed.
    Tag,

    /// Deleting a label failed.
    LabelDeletion,

    /// Creating a label failed.
    LabelCreation,

    /// Adding a collaborator failed.
    CollaboratorAddition,

    /// Protecting a branch failed.
    BranchProtection,

    /// Any other forge API failure.
    Forge,

    /// Error related to Git2.
    Git2,

    /// Error related to the reqwest crate.
    Reqwest,

    /// Error related to serde.
    Serde,

    /// Filesystem error.
    Io,

    /// Error with a free-form message.
    Custom,
}

impl fmt::Display for DuplicatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.source {
            Some(source) => write!(f, "{:?}: {}", self.inner.kind, source),
            None => write!(f, "{:?}", self.inner.kind),
        }
    }
}

impl StdError for DuplicatorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

/// Implement `From` for an error type, wrapping it as the source
macro_rules! impl_from_error {
    ($error:ty, $kind:ident) => {
        impl From<$error> for DuplicatorError {
            fn from(e: $error) -> Self {
                Self {
                    inner: Box::new(Inner {
                        kind: DuplicatorErrorKind::$kind,
                        source: Some(Box::new(e)),
                    }),
                }
            }
        }
    };
}

impl_from_error!(reqwest::Error, Reqwest);
impl_from_error!(serde_json::Error, Serde);
impl_from_error!(toml::de::Error, Config);
impl_from_error!(std::io::Error, Io);
impl_from_error!(git2::Error, Git2);
impl_from_error!(url::ParseError, UnsupportedScheme);

impl From<&str> for DuplicatorError {
    fn from(text: &str) -> Self {
        Self::new(DuplicatorErrorKind::Custom).with_text(text)
    }
}

impl From<String> for DuplicatorError {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_contains_kind_and_text() {
        let err = DuplicatorError::new(DuplicatorErrorKind::LabelCreation)
            .with_text("label 'type: bug': already_exists");
        assert_eq!(
            err.to_string(),
            "LabelCreation: label 'type: bug': already_exists"
        );
        assert_eq!(err.kind(), &DuplicatorErrorKind::LabelCreation);
    }

    #[test]
    fn with_kind_keeps_source() {
        let err = DuplicatorError::from(git2::Error::from_str("remote hung up"))
            .with_kind(DuplicatorErrorKind::Clone);
        assert_eq!(err.kind(), &DuplicatorErrorKind::Clone);
        assert!(err.to_string().contains("remote hung up"));
    }

    #[test]
    fn string_conversion_is_custom() {
        let err: DuplicatorError = "something odd".into();
        assert_eq!(err.kind(), &DuplicatorErrorKind::Custom);
    }
}
