//! Errors raised while reconstructing one component's render output.

use derive_more::{Display, Error};

pub type ReconstructResult<T> = Result<T, ReconstructError>;

#[derive(Debug, Clone, PartialEq, Display, Error)]
#[display("{kind}")]
pub struct ReconstructError {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum ErrorKind {
    /// The render output does not describe a well-formed tree.
    #[display("malformed render output at byte {offset}: {message}")]
    MalformedRenderOutput { message: String, offset: usize },

    /// A recognized helper call has arguments of an unexpected shape.
    #[display("unsupported construct at byte {offset}: {construct}")]
    UnsupportedConstruct { construct: String, offset: usize },

    /// The compiled module is not valid JavaScript.
    #[display("syntax error at byte {offset}: {message}")]
    ScriptSyntax { message: String, offset: usize },
}

impl From<ErrorKind> for ReconstructError {
    fn from(kind: ErrorKind) -> Self {
        ReconstructError {
            kind: Box::new(kind),
        }
    }
}

impl ReconstructError {
    pub(crate) fn malformed(message: impl Into<String>, offset: usize) -> Self {
        ErrorKind::MalformedRenderOutput {
            message: message.into(),
            offset,
        }
        .into()
    }

    pub(crate) fn unsupported(construct: impl Into<String>, offset: usize) -> Self {
        ErrorKind::UnsupportedConstruct {
            construct: construct.into(),
            offset,
        }
        .into()
    }

    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ErrorKind::ScriptSyntax {
            message: message.into(),
            offset,
        }
        .into()
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Unsupported constructs count as malformed output: either way the
    /// component cannot be given a trustworthy tree.
    pub fn is_malformed(&self) -> bool {
        matches!(
            *self.kind,
            ErrorKind::MalformedRenderOutput { .. } | ErrorKind::UnsupportedConstruct { .. }
        )
    }

    pub fn offset(&self) -> usize {
        match *self.kind {
            ErrorKind::MalformedRenderOutput { offset, .. }
            | ErrorKind::UnsupportedConstruct { offset, .. }
            | ErrorKind::ScriptSyntax { offset, .. } => offset,
        }
    }
}
