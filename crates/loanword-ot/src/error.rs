// Error types for cascades, runs and optimization.

use std::path::PathBuf;

use loanword_core::CoreError;
use loanword_fst::FstError;

/// A stage list that breaks the cascade order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("stage {stage} cannot follow {previous}")]
    StageOrder { stage: String, previous: String },
    #[error("stage {0} requires a syllabification stage before it")]
    MissingSyllabification(String),
    #[error("stage {stage} belongs to the {expected} list")]
    WrongSide { stage: String, expected: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum OtError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Fst(#[from] FstError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("cache I/O error on {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("evaluation command `{command}` exited with {status}")]
    ExternalEvaluationFailure { command: String, status: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("optimizer error: {0}")]
    Optimizer(String),
}

impl OtError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OtError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OtError::Cache {
            path: path.into(),
            source,
        }
    }
}
