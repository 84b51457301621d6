use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub const SUPPORTED_VERSIONS_URL: &str = "http://doc.scalingo.com/languages/ruby";

pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that abort a build. None of them are retried.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "'{version}' is not valid\nCan not parse Ruby Version:\nValid versions listed on: {}",
        SUPPORTED_VERSIONS_URL
    )]
    MalformedVersion { version: String },

    #[error("Architecture '{arch}' is unknown. Known architectures include: {known:?}")]
    UnsupportedPlatform { arch: String, known: Vec<String> },

    #[error("Cache copy from {from:?} to {to:?} failed: {reason}")]
    CacheCopy {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("No applicable build strategy for {app_dir:?}")]
    NoApplicableStrategy { app_dir: PathBuf },

    #[error("Gemfile.lock required. Please check it in.")]
    LockfileMissing,

    #[error("Task '{task}' failed:\n{output}")]
    TaskFailed { task: String, output: String },

    #[error("Invalid metadata key: '{0}'")]
    InvalidMetadataKey(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BuildError {
    pub fn io(context: impl Into<String>, source: anyhow::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Configuration problems caused by the application rather than by the buildpack.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BuildError::MalformedVersion { .. }
                | BuildError::NoApplicableStrategy { .. }
                | BuildError::LockfileMissing
                | BuildError::TaskFailed { .. }
        )
    }
}
