//! Error type of the Tessera CLI.

use std::{io, ops::Range, path::PathBuf};

use thiserror::Error;

use tessera::TesseraError;

/// Errors raised while loading a scene or configuration and replaying it.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A scene or configuration file is not valid TOML for its schema.
    #[error("{message}")]
    Toml {
        message: String,
        span: Option<Range<usize>>,
        src: String,
    },

    #[error("Missing configuration file: {}", .0.display())]
    MissingConfig(PathBuf),

    #[error(transparent)]
    Engine(#[from] TesseraError),

    #[error("{0} actions failed")]
    ActionsFailed(usize),
}

impl CliError {
    /// Create a new `Toml` error keeping the source it was raised on.
    pub fn new_toml_error(err: toml::de::Error, src: impl Into<String>) -> Self {
        Self::Toml {
            message: err.message().to_string(),
            span: err.span(),
            src: src.into(),
        }
    }
}
