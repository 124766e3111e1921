//! Catalog error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("catalog schema version {found} is newer than this engine's version {expected}; refusing to open")]
    SchemaTooNew { found: i32, expected: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = CatalogError::MigrationFailed {
            version: 2,
            name: "add_escalated_to_labels".to_string(),
            error: "syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_escalated_to_labels) failed: syntax error"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let catalog_err: CatalogError = io_err.into();
        assert!(catalog_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_not_found_display() {
        let err = CatalogError::NotFound("file id 42".to_string());
        assert_eq!(err.to_string(), "not found: file id 42");
    }
}
