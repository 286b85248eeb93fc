use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the plugin commands can raise. All of them are fatal to the
/// command that hit them; nothing is rolled back.
#[derive(Debug, Error)]
pub enum CoziError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is already tracked")]
    AlreadyTracked(String),

    #[error("{program} failed: {detail}")]
    Subprocess { program: String, detail: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy plugin {name}: {source}")]
    Copy {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {name}: {source}")]
    Remove {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse {}: {source}", path.display())]
    MalformedState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CoziError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn subprocess(program: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Subprocess {
            program: program.into(),
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CoziError>;
