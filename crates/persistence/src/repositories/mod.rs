//! Repository implementations for database operations.

pub mod audience;
pub mod event;
pub mod mail;
pub mod notification;
pub mod report;
pub mod role;
pub mod saved_event;
pub mod user;

pub use audience::{AudienceRepository, RegisterOutcome};
pub use event::{EventRepository, EventUpdate, PublishedEventsQuery};
pub use mail::MailRepository;
pub use notification::NotificationRepository;
pub use report::ReportRepository;
pub use role::RoleRepository;
pub use saved_event::SavedEventRepository;
pub use user::UserRepository;

use domain::errors::StoreError;

/// Maps a database error onto the store error the domain layer sees.
pub(crate) fn to_store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => {
            tracing::error!(error = %other, "Database operation failed");
            StoreError::Unavailable(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            to_store_error(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        assert!(matches!(
            to_store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }
}
