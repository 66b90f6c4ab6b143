use thiserror::Error;

#[derive(Error, Debug)]
pub enum TripleDbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, TripleDbError>;

impl From<serde_json::Error> for TripleDbError {
    fn from(err: serde_json::Error) -> Self {
        TripleDbError::Serialization(err.to_string())
    }
}
