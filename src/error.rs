use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type GridcalcResult<T> = Result<T, GridcalcError>;

/// Errors surfaced to callers of the engine, the config loader and the CLI.
///
/// Formula failures are not reported here: they are stored on the cell as a
/// [`FormulaError`]. The engine only fails with this type when it is called
/// with coordinates that cannot exist.
#[derive(Error, Debug)]
pub enum GridcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid cell address: sheet {sheet}, row {row}, column {col} (rows and columns start at 1)")]
    InvalidAddress { sheet: u32, row: u32, col: u32 },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),
}

/// The kind of a formula error, without its detail message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Syntax,
    TypeMismatch,
    DivisionByZero,
    UnknownFunction,
    Argument,
    LookupNotFound,
    CircularReference,
}

impl ErrorKind {
    /// Spreadsheet-style display code shown in place of a value
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "#SYNTAX!",
            ErrorKind::TypeMismatch => "#VALUE!",
            ErrorKind::DivisionByZero => "#DIV/0!",
            ErrorKind::UnknownFunction => "#NAME?",
            ErrorKind::Argument => "#ARG!",
            ErrorKind::LookupNotFound => "#N/A",
            ErrorKind::CircularReference => "#CIRC!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A cell-resident evaluation error.
///
/// These are values, not control flow: a failing formula stores one of these
/// in place of its result and every cell reading it sees
/// [`FormulaError::Propagated`] carrying the original kind.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FormulaError {
    #[error("#SYNTAX! {0}")]
    Syntax(String),

    #[error("#VALUE! {0}")]
    TypeMismatch(String),

    #[error("#DIV/0! division by zero")]
    DivisionByZero,

    #[error("#NAME? unknown function {0}")]
    UnknownFunction(String),

    #[error("#ARG! {0}")]
    Argument(String),

    #[error("#N/A lookup value not found")]
    LookupNotFound,

    #[error("#CIRC! circular reference")]
    CircularReference,

    #[error("{0} in a referenced cell")]
    Propagated(ErrorKind),
}

impl FormulaError {
    /// The original kind; for propagated errors this is the upstream kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Syntax(_) => ErrorKind::Syntax,
            FormulaError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            FormulaError::DivisionByZero => ErrorKind::DivisionByZero,
            FormulaError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            FormulaError::Argument(_) => ErrorKind::Argument,
            FormulaError::LookupNotFound => ErrorKind::LookupNotFound,
            FormulaError::CircularReference => ErrorKind::CircularReference,
            FormulaError::Propagated(kind) => *kind,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// The error a dependent cell sees when it reads a cell holding `self`.
    pub fn propagate(&self) -> FormulaError {
        FormulaError::Propagated(self.kind())
    }

    pub fn is_propagated(&self) -> bool {
        matches!(self, FormulaError::Propagated(_))
    }
}
