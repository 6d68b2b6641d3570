use thiserror::Error;

use crate::analysis::SourceAnalysisError;
use crate::classfile::ClassFormatError;

/// Where in the loading pipeline a [`LoadFailure`] happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStage {
    Open,
    ClassRead,
    ClassStructure,
    NestedArchive,
    DuplicateClass,
    SourceScan,
    SourceRead,
    SourceAnalysis,
}

impl LoadStage {
    pub fn reason(self) -> &'static str {
        match self {
            LoadStage::Open => "failed to open resource",
            LoadStage::ClassRead => "failed to read class",
            LoadStage::ClassStructure => "failed to load class",
            LoadStage::NestedArchive => "failed to read nested archive",
            LoadStage::DuplicateClass => "duplicate class",
            LoadStage::SourceScan => "failed to scan sources",
            LoadStage::SourceRead => "failed to read source",
            LoadStage::SourceAnalysis => "invalid source",
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Class(#[from] ClassFormatError),
    #[error(transparent)]
    Source(#[from] SourceAnalysisError),
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
    #[error("'{name}' is already defined by {previous}")]
    Duplicate { name: String, previous: String },
}

/// The single error kind every public load operation returns.
///
/// It names the artifact that failed and the stage it failed in; the typed
/// low-level cause is reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{}: {artifact}", .stage.reason())]
pub struct LoadFailure {
    pub stage: LoadStage,
    pub artifact: String,
    #[source]
    pub cause: LoadCause,
}

impl LoadFailure {
    pub fn new(stage: LoadStage, artifact: impl Into<String>, cause: impl Into<LoadCause>) -> Self {
        Self {
            stage,
            artifact: artifact.into(),
            cause: cause.into(),
        }
    }

    pub fn reason(&self) -> &'static str {
        self.stage.reason()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_names_stage_and_artifact() {
        let err = LoadFailure::new(LoadStage::ClassStructure, "Foo.class", ClassFormatError::Empty);
        assert_eq!(err.to_string(), "failed to load class: Foo.class");
        assert!(err.source().is_some());
    }

    #[test]
    fn source_stages_have_distinct_reasons() {
        assert_ne!(
            LoadStage::SourceRead.reason(),
            LoadStage::SourceAnalysis.reason()
        );
        assert_eq!(LoadStage::SourceAnalysis.reason(), "invalid source");
    }
}
