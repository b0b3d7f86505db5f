use lunette_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CompilerError {
    #[error("{}", .0.message)]
    Parse(#[from] ParseError),
    #[error("{message}")]
    Semantic { message: String, line: u32 },
    #[error("{what} is not supported")]
    Unsupported { what: &'static str, line: u32 },
    /// A per-function capacity (constants, cells, operands) was exceeded.
    #[error("{message}")]
    Limit { message: String, line: u32 },
}

impl CompilerError {
    pub fn semantic(message: impl Into<String>, line: u32) -> Self {
        CompilerError::Semantic {
            message: message.into(),
            line,
        }
    }

    pub fn limit(message: impl Into<String>, line: u32) -> Self {
        CompilerError::Limit {
            message: message.into(),
            line,
        }
    }

    /// Source line the error points at.
    pub fn line(&self) -> u32 {
        match self {
            CompilerError::Parse(e) => e.line as u32,
            CompilerError::Semantic { line, .. }
            | CompilerError::Unsupported { line, .. }
            | CompilerError::Limit { line, .. } => *line,
        }
    }
}
