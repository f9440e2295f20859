use thiserror::Error;

use crate::feed::StateError;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another run has locked the state database
    #[error("Another feedmail run appears to be using the state database. Please wait for it to finish.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored state row could not be decoded
    #[error("Stored state for feed '{feed}' is unreadable: {source}")]
    State {
        feed: String,
        #[source]
        source: StateError,
    },

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // Check for SQLite lock-related error messages
        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Listing entry for one stored feed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub name: String,
    /// Unix seconds of the last save
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_errors_detected() {
        let err = sqlx::Error::Protocol("database is locked".into());
        assert!(matches!(
            DatabaseError::from_sqlx(err),
            DatabaseError::InstanceLocked
        ));
    }

    #[test]
    fn test_other_errors_passed_through() {
        let err = sqlx::Error::RowNotFound;
        assert!(matches!(DatabaseError::from_sqlx(err), DatabaseError::Other(_)));
    }
}
