//! Error types for database loading and value generation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a producer while generating a value.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to encode generated array: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Point in the load pipeline where a JSON parse failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Plain (untemplated) database document
    Document,
    /// Parameter block after the delimiter
    Parameters,
    /// Output of template rendering
    Rendered,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStage::Document => "database document",
            ParseStage::Parameters => "template parameters",
            ParseStage::Rendered => "rendered template",
        };
        f.write_str(name)
    }
}

/// Error raised while loading a database into a route table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("templated database is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("invalid JSON in {stage}: {source}")]
    Parse {
        stage: ParseStage,
        #[source]
        source: serde_json::Error,
    },

    #[error("template syntax error: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("template execution failed: {0}")]
    Execution(#[from] handlebars::RenderError),
}

impl LoadError {
    pub(crate) fn parse(stage: ParseStage, source: serde_json::Error) -> Self {
        LoadError::Parse { stage, source }
    }
}
