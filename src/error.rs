use std::fmt;

/// Error taxonomy for configuration resolution.
///
/// The caller must be able to tell a malformed document (`Parse`,
/// `Validation`) apart from a policy violation (`Permission`) and from a
/// dangling workflow reference (`Reference`): the first two go back to the
/// document's author, the latter two need a server-side settings change.
/// Every variant is terminal for the current resolution; nothing is retried
/// and nothing falls back to a previous configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {path} file: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {message}")]
    Parse { context: String, message: String },
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    Reference(String),
}

impl ConfigError {
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// One structurally invalid field, addressed by its path in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregate of every field-level failure found in one validation pass.
///
/// Structural validation never stops at the first bad field: operators and
/// repository authors fix their documents from a single report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Ok when nothing was recorded, otherwise the aggregated error.
    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .errors
            .iter()
            .map(FieldError::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}
