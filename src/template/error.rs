use thiserror::Error;

/// Authoring error in a template string. Offsets are byte offsets into the
/// template being scanned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedTemplateError {
    #[error("Single '{{' at offset {offset} is never closed")]
    UnmatchedOpen { offset: usize },
    #[error("Single '}}' at offset {offset}")]
    UnmatchedClose { offset: usize },
    #[error("Empty placeholder at offset {offset}")]
    EmptyField { offset: usize },
    #[error("Placeholder '{field}' at offset {offset} uses a conversion")]
    Conversion { field: String, offset: usize },
    #[error("Nested '{{' inside the placeholder at offset {offset}")]
    NestedBrace { offset: usize },
    #[error("Binding '{spec}' at offset {offset} is not of the form type:name")]
    BadSpec { spec: String, offset: usize },
    #[error("Binding name '{name}' at offset {offset} is not an identifier")]
    InvalidBindingName { name: String, offset: usize },
}
