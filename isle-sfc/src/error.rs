use derive_more::{Display, Error};

/// The file could not be split into top-level blocks.
#[derive(Debug, Clone, PartialEq, Display, Error)]
#[display("invalid single file component: {message}")]
pub struct SfcError {
    pub message: String,
}

/// The template markup is not well formed.
#[derive(Debug, Clone, PartialEq, Display, Error)]
#[display("invalid template markup at byte {offset}: {message}")]
pub struct TemplateError {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Display, Error)]
pub enum AnnotateError {
    #[display("{_0}")]
    Sfc(SfcError),
    #[display("{_0}")]
    Template(TemplateError),
    #[display("conflicting rewrites around byte {offset}")]
    OverlappingEdit { offset: usize },
}

impl From<SfcError> for AnnotateError {
    fn from(error: SfcError) -> Self {
        AnnotateError::Sfc(error)
    }
}

impl From<TemplateError> for AnnotateError {
    fn from(error: TemplateError) -> Self {
        AnnotateError::Template(error)
    }
}
