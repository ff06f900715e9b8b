use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("decode error in column '{column}': {message}")]
    Decode { column: String, message: String },
    #[error("row source error: {message}")]
    Source { message: String },
    #[error("failed to retrieve results: {message}")]
    Retrieval { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
}

impl CatalogError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Errors that abort a materialization pass and surface as a retrieval failure.
    pub fn is_fatal_read(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Source { .. })
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<sea_orm::DbErr> for CatalogError {
    fn from(value: sea_orm::DbErr) -> Self {
        CatalogError::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::CatalogError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = CatalogError::decode("p_id", "bad uuid");
        assert!(matches!(err, CatalogError::Decode { .. }));
        let err = CatalogError::source("cursor");
        assert!(matches!(err, CatalogError::Source { .. }));
        let err = CatalogError::retrieval("page");
        assert!(matches!(err, CatalogError::Retrieval { .. }));
        let err = CatalogError::storage("disk");
        assert!(matches!(err, CatalogError::Storage { .. }));
        let err = CatalogError::not_found("missing");
        assert!(matches!(err, CatalogError::NotFound { .. }));
        let err = CatalogError::invalid("bad");
        assert!(matches!(err, CatalogError::Validation { .. }));
        let err = CatalogError::conflict("dup");
        assert!(matches!(err, CatalogError::Conflict { .. }));
    }

    #[test]
    fn only_decode_and_source_abort_reads() {
        assert!(CatalogError::decode("w_map", "type").is_fatal_read());
        assert!(CatalogError::source("closed").is_fatal_read());
        assert!(!CatalogError::not_found("x").is_fatal_read());
        assert!(!CatalogError::storage("x").is_fatal_read());
    }

    #[test]
    fn decode_error_names_the_column() {
        let err = CatalogError::decode("d_f_size", "expected integer");
        assert_eq!(
            err.to_string(),
            "decode error in column 'd_f_size': expected integer"
        );
    }
}
