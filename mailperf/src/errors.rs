use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Input is not a JSON sequence of mappings (or is not JSON at all)
    #[error("Malformed input: {message}")]
    DataFormat { message: String },

    /// A record lacks a field every downstream section depends on
    #[error("Record {index} is missing required field `{field}`")]
    MissingField { index: usize, field: String },

    /// A record field is present but has the wrong type or an out-of-domain value
    #[error("Record {index} has invalid field `{field}`: {message}")]
    InvalidField { index: usize, field: String, message: String },

    /// Filesystem error, tagged with the path that was being read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration failed validation
    #[error("Config validation: {message}")]
    Config { message: String },

    /// The chart backend could not draw or encode the panel
    #[error("Failed to render charts: {message}")]
    Render { message: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// True for errors caused by the input file rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::DataFormat { .. } | Error::MissingField { .. } | Error::InvalidField { .. }
        )
    }
}

/// Convert from String errors (e.g., from chart backends that only expose Display)
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Render { message }
    }
}

/// Type alias for pipeline results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_record_and_field() {
        let err = Error::MissingField {
            index: 3,
            field: "batchSize".to_string(),
        };
        assert_eq!(err.to_string(), "Record 3 is missing required field `batchSize`");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = Error::io("metric analysis/metrics.json", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("metric analysis/metrics.json"));
        assert!(!err.is_input_error());
    }
}
