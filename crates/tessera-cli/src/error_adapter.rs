//! Error adapter for converting CLI errors to miette diagnostics.
//!
//! Scene and configuration files are TOML; when their parse error carries a
//! span, the report shows the offending snippet.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use tessera::TesseraError;

use crate::error::CliError;

/// Adapter rendering a [`CliError`] through miette.
pub struct ErrorAdapter<'a>(pub &'a CliError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            CliError::Io(_) => "tessera::io",
            CliError::Toml { .. } => "tessera::toml",
            CliError::MissingConfig(_) => "tessera::config",
            CliError::Engine(TesseraError::Config(_)) => "tessera::config",
            CliError::Engine(_) => "tessera::engine",
            CliError::ActionsFailed(_) => "tessera::actions",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.0 {
            CliError::MissingConfig(_) => "pass an existing file to --config, or omit it",
            CliError::Engine(TesseraError::DanglingReference { .. }) => {
                "list every node before the edges and groups referring to it"
            }
            CliError::ActionsFailed(_) => "see the notifications section of the report",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self.0 {
            CliError::Toml { src, .. } => Some(src as &dyn miette::SourceCode),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let CliError::Toml {
            message,
            span: Some(span),
            ..
        } = self.0
        else {
            return None;
        };
        let span = SourceSpan::new(span.start.into(), span.len());
        Some(Box::new(std::iter::once(LabeledSpan::new_primary_with_span(
            Some(message.clone()),
            span,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use tessera::identifier::Id;

    use super::*;

    #[test]
    fn test_toml_error_has_label() {
        let err = CliError::Toml {
            message: "invalid type".to_string(),
            span: Some(11..19),
            src: "viewport = \"center\"\n".to_string(),
        };
        let adapter = ErrorAdapter(&err);

        assert!(adapter.source_code().is_some());
        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label(), Some("invalid type"));
        assert_eq!(labels[0].offset(), 11);
        assert!(labels[0].primary());
    }

    #[test]
    fn test_engine_error_without_source() {
        let err = CliError::Engine(TesseraError::DuplicateIdentifier(Id::new("main")));
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.to_string(), "Visual entity `main` already exists");
        assert_eq!(adapter.code().unwrap().to_string(), "tessera::engine");
        assert!(adapter.source_code().is_none());
        assert!(adapter.labels().is_none());
    }

    #[test]
    fn test_config_error_code() {
        let err = CliError::Engine(TesseraError::Config("bad".to_string()));
        let adapter = ErrorAdapter(&err);

        assert_eq!(adapter.code().unwrap().to_string(), "tessera::config");
        assert!(adapter.help().is_none());
    }
}
