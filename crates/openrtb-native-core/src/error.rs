use serde_json::Value;

/// Errors that abort a whole decode or encode call.
///
/// Field-level anomalies never show up here; they are absorbed into the
/// residual document (see [`FieldError`]).
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("JSON syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("native request must be a JSON object, found {found}")]
    UnexpectedRoot { found: JsonKind },
    #[error("failed to render JSON: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl NativeError {
    pub(crate) fn syntax(err: serde_json::Error) -> Self {
        NativeError::Syntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NativeError>;

/// A member whose JSON value has the wrong shape for its codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct FieldError {
    pub expected: &'static str,
    pub found: JsonKind,
}

impl FieldError {
    pub fn mismatch(expected: &'static str, value: &Value) -> Self {
        FieldError {
            expected,
            found: JsonKind::of(value),
        }
    }
}

/// Coarse JSON type of a value, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl std::fmt::Display for JsonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}
