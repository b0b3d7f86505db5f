use memory::Value;
use thiserror::Error;

/// Why a chunk could not be turned into a prototype.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {0}")]
    NotFound(String),
    #[error("cannot read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// Already rendered as `chunk:line: message`.
    #[error("{0}")]
    Syntax(String),
    #[error("bad binary chunk: {0}")]
    Format(String),
    #[error("binary chunk rejected: {0}")]
    Security(String),
    /// A `load` reader function failed.
    #[error("{0}")]
    Reader(String),
    #[error("no source compiler installed; only binary chunks can be loaded")]
    NoCompiler,
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            LoadError::Format("truncated chunk".into())
        } else {
            LoadError::Io {
                name: "chunk".into(),
                source: e,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `error(v)`-style failure carrying a guest value.
    #[error("{text}")]
    Raised { value: Value, text: String },
    #[error("{text}")]
    AssertionFailed { value: Value, text: String },
    #[error("{0}")]
    TypeMismatch(String),
    #[error("{0}")]
    ArityMismatch(String),
    #[error("{0}")]
    Unsupported(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),
    #[error("invalid operand")]
    InvalidOperand,
    #[error("function not found")]
    FunctionNotFound,
}

impl RuntimeError {
    /// Text a guest (or the CLI) sees for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The guest value carried by a raised error, if any.
    pub fn value(&self) -> Option<Value> {
        match self {
            RuntimeError::Raised { value, .. } | RuntimeError::AssertionFailed { value, .. } => {
                Some(*value)
            }
            _ => None,
        }
    }
}

impl From<String> for RuntimeError {
    fn from(s: String) -> Self {
        RuntimeError::TypeMismatch(s)
    }
}

impl From<&str> for RuntimeError {
    fn from(s: &str) -> Self {
        RuntimeError::TypeMismatch(s.to_string())
    }
}
