use serde::{Deserialize, Serialize};

/// An export failure: the context in which it happened plus, when another error
/// was propagated into it, that source in stringified form.
///
/// Asset-level failures (an unreachable logo, an undecodable photo) and fatal
/// assembly failures share this one type; whether a given error aborts the
/// export is decided where it is handled, not here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExportError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ExportError {}

impl ExportError {
    /// An error that originates inside the export itself, carrying only its
    /// context.
    pub fn with_context<S: Into<String>>(context: S) -> ExportError {
        ExportError {
            context: context.into(),
            source_error: None,
        }
    }

    /// Wraps an error propagated from elsewhere (the filesystem, `lopdf`, the
    /// image decoder) under the given context. The source is stringified so the
    /// error stays cloneable and serializable.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ExportError {
        ExportError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }
}

/// Lower-cases the first letter of the appended source so that the combined
/// message reads as one sentence.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}
