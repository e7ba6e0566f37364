use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path syntax error in '{path}' at offset {position}: {message}")]
    Syntax {
        path: String,
        position: usize,
        message: String,
    },

    #[error("Recursion depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    /// A matched node whose source text does not decode.
    #[error("Matched value could not be decoded: {0}")]
    Decode(String),
}

impl PathError {
    pub(crate) fn syntax(path: &str, position: usize, message: impl Into<String>) -> Self {
        PathError::Syntax {
            path: path.to_string(),
            position,
            message: message.into(),
        }
    }
}
