// Error type shared by the core readers and the alphabet.

use std::path::PathBuf;

/// Errors raised while building an alphabet or reading input files.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown symbol {symbol:?} in {context}")]
    UnknownSymbol { symbol: String, context: String },
    #[error("malformed line {line} in {source_name}: {content:?}")]
    MalformedLine {
        source_name: String,
        line: usize,
        content: String,
    },
    #[error("constraint weights are already registered")]
    AlreadyFrozen,
    #[error("duplicate weight for constraint {0}")]
    DuplicateWeight(String),
    #[error("invalid weight {value:?} for constraint {name}")]
    InvalidWeight { name: String, value: String },
    #[error("unknown built-in profile {0:?}")]
    UnknownProfile(String),
    #[error("invalid profile: {0}")]
    Profile(#[from] toml::de::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_symbol(symbol: impl Into<String>, context: impl Into<String>) -> Self {
        CoreError::UnknownSymbol {
            symbol: symbol.into(),
            context: context.into(),
        }
    }
}
