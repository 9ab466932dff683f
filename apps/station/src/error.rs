//! # Station Error Type
//!
//! Startup and shutdown failures of the station process. Everything that
//! happens while running (failed pushes, write errors) is logged and
//! retried instead of ending the process.

use tally_db::DbError;
use tally_sync::SyncError;
use thiserror::Error;

pub type StationResult<T> = Result<T, StationError>;

#[derive(Debug, Error)]
pub enum StationError {
    #[error("Failed to open the station database: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl StationError {
    /// Process exit code: 78 (EX_CONFIG) for configuration problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            StationError::Sync(e) if e.is_config_error() => 78,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = StationError::from(SyncError::InvalidConfig("interval_secs".into()));
        assert_eq!(config.exit_code(), 78);

        let db = StationError::from(DbError::ConnectionFailed("locked".into()));
        assert_eq!(db.exit_code(), 1);
        assert!(db.to_string().contains("locked"));
    }
}
