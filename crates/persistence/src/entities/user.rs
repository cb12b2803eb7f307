//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::UserProfile;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: DateTime<Utc>,
}

impl From<UserEntity> for UserProfile {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            display_name: entity.display_name,
            created_at: entity.created_at,
            last_sign_in_at: entity.last_sign_in_at,
        }
    }
}
