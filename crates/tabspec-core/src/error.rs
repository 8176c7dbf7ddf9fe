//! Error taxonomy
//!
//! Every failure a spec, conversion or load can produce. Errors may carry
//! suggestions, rendered after the message as `message | one; two`.

/// Result alias used across tabspec crates
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building specs and converting them
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed spec, unknown key, missing field or conflicting options
    #[error("{}", with_suggestions(.message, .suggestions))]
    Validation {
        message: String,
        suggestions: Vec<String>,
    },

    /// Type parameters that contradict each other
    #[error("{}", with_suggestions(.message, .suggestions))]
    InvalidTypeParameters {
        message: String,
        suggestions: Vec<String>,
    },

    /// Constraints that cannot be normalized into one canonical form
    #[error("{}", with_suggestions(.message, .suggestions))]
    ConflictingConstraint {
        message: String,
        suggestions: Vec<String>,
    },

    /// A target cannot express a construct and the call runs in strict mode
    #[error("{}", unsupported_message(.target, .feature, .field_path, .suggestions))]
    UnsupportedFeature {
        target: String,
        feature: String,
        field_path: String,
        suggestions: Vec<String>,
    },

    /// The target's host library was not compiled in
    #[error("target '{target}' requires {dependency}, which is not available in this build")]
    DependencyMissing { target: String, dependency: String },

    /// Malformed tree handed to a renderer
    #[error("render error: {message}")]
    Render { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn invalid_type_parameters(message: impl Into<String>) -> Self {
        Self::InvalidTypeParameters {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn conflicting_constraint(message: impl Into<String>) -> Self {
        Self::ConflictingConstraint {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// `target` cannot express `feature` at `field_path` (empty for table-level constructs)
    pub fn unsupported(
        target: impl Into<String>,
        feature: impl Into<String>,
        field_path: impl Into<String>,
    ) -> Self {
        Self::UnsupportedFeature {
            target: target.into(),
            feature: feature.into(),
            field_path: field_path.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn dependency_missing(target: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::DependencyMissing {
            target: target.into(),
            dependency: dependency.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Attach a suggestion for the caller
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        match &mut self {
            Self::Validation { suggestions, .. }
            | Self::InvalidTypeParameters { suggestions, .. }
            | Self::ConflictingConstraint { suggestions, .. }
            | Self::UnsupportedFeature { suggestions, .. } => suggestions.push(suggestion.into()),
            Self::DependencyMissing { .. } | Self::Render { .. } => {}
        }
        self
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::Validation { suggestions, .. }
            | Self::InvalidTypeParameters { suggestions, .. }
            | Self::ConflictingConstraint { suggestions, .. }
            | Self::UnsupportedFeature { suggestions, .. } => suggestions,
            Self::DependencyMissing { .. } | Self::Render { .. } => &[],
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFeature { .. })
    }
}

fn unsupported_message(
    target: &str,
    feature: &str,
    field_path: &str,
    suggestions: &[String],
) -> String {
    let message = if field_path.is_empty() {
        format!("{} does not support {}", target, feature)
    } else {
        format!("{} does not support {} for field '{}'", target, feature, field_path)
    };
    with_suggestions(&message, suggestions)
}

fn with_suggestions(message: &str, suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        message.to_string()
    } else {
        format!("{} | {}", message, suggestions.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_rendered_after_message() {
        let err = Error::validation("Unknown key(s) in spec: foo.")
            .with_suggestion("Remove the key")
            .with_suggestion("Check the spelling");
        assert_eq!(
            err.to_string(),
            "Unknown key(s) in spec: foo. | Remove the key; Check the spelling"
        );
    }

    #[test]
    fn unsupported_names_field_path() {
        let err = Error::unsupported("arrow", "type 'geometry'", "location.shape");
        assert_eq!(
            err.to_string(),
            "arrow does not support type 'geometry' for field 'location.shape'"
        );
        assert!(err.is_unsupported());
    }

    #[test]
    fn dependency_missing_is_distinct() {
        let err = Error::dependency_missing("arrow", "the `arrow` feature");
        assert!(!err.is_unsupported());
        assert!(err.suggestions().is_empty());
    }
}
