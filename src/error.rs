/// Error types for the metaprint library.
#[derive(Debug, thiserror::Error)]
pub enum MtlError {
    /// Template could not be parsed or evaluated: malformed syntax, unknown
    /// filter, undefined variable, bad comparison operand, or a string
    /// context (delim, filter argument, find/replace, format code) that
    /// expanded to more than one value.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Field was not claimed by any provider and is not a variable.
    #[error("unknown template field: {0}")]
    UnknownField(String),

    /// An I/O error raised by a field provider.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV emitter failure.
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON emitter failure.
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, MtlError>;
