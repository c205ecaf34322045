use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("lexical error at {line}:{column}: {message}")]
    Lexical {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("syntax error at {line}:{column}: {message} (found `{found}`)")]
    Syntax {
        message: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("import error: {message} ({})", path.display())]
    Import { message: String, path: PathBuf },
    #[error("emit error: {0}")]
    Emit(String),
}

impl CoreError {
    /// Source position carried by the error, if any.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            CoreError::Lexical { line, column, .. } | CoreError::Syntax { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::SourceIo(_) => "io",
            CoreError::Lexical { .. } => "lexical",
            CoreError::Syntax { .. } => "syntax",
            CoreError::Import { .. } => "import",
            CoreError::Emit(_) => "emit",
        }
    }
}
