//! User and claim repository.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{Role, UserClaims, UserProfile};
use domain::services::ClaimStore;
use sqlx::PgPool;
use uuid::Uuid;

use super::to_store_error;
use crate::entities::{UserClaimsEntity, UserEntity, UserRoleDb};
use crate::metrics::QueryTimer;

/// Repository for user profiles and their claims.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a sign-in, creating the profile on first sight.
    pub async fn upsert_on_sign_in(
        &self,
        user_id: Uuid,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserProfile, sqlx::Error> {
        let timer = QueryTimer::new("upsert_user_on_sign_in");
        let entity = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, email, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                display_name = COALESCE(EXCLUDED.display_name, users.display_name),
                last_sign_in_at = NOW()
            RETURNING id, email, display_name, created_at, last_sign_in_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity?.into())
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let entity = sqlx::query_as::<_, UserEntity>(
            "SELECT id, email, display_name, created_at, last_sign_in_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    pub async fn find_id_by_email(&self, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_id_by_email");
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await;
        timer.record();

        id
    }

    pub async fn upsert_role_claim(&self, user_id: Uuid, role: Role) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("set_role_claim");
        let result = sqlx::query(
            r#"
            INSERT INTO user_claims (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                role = EXCLUDED.role,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(UserRoleDb::from(role))
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ())
    }

    pub async fn find_claims_for(&self, user_id: Uuid) -> Result<Option<UserClaims>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_claims");
        let entity = sqlx::query_as::<_, UserClaimsEntity>(
            "SELECT user_id, role, admin, updated_at FROM user_claims WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    /// Sets the admin claim, creating the claim row when needed.
    pub async fn grant_admin(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("grant_admin_claim");
        let result = sqlx::query(
            r#"
            INSERT INTO user_claims (user_id, admin)
            VALUES ($1, TRUE)
            ON CONFLICT (user_id) DO UPDATE SET
                admin = TRUE,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ())
    }
}

#[async_trait]
impl ClaimStore for UserRepository {
    async fn set_role_claim(&self, user_id: Uuid, role: Role) -> Result<(), StoreError> {
        self.upsert_role_claim(user_id, role)
            .await
            .map_err(to_store_error)
    }

    async fn find_claims(&self, user_id: Uuid) -> Result<Option<UserClaims>, StoreError> {
        self.find_claims_for(user_id).await.map_err(to_store_error)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError> {
        self.find_id_by_email(email).await.map_err(to_store_error)
    }
}
