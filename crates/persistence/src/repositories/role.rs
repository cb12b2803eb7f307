//! Role ledger repository: allowlist, auto-approve entries, role requests.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{
    AllowlistEntry, AutoApproveEntry, RoleRequest, RoleRequestStatus, RoleRequestWrite,
};
use domain::services::RoleLedger;
use sqlx::PgPool;
use uuid::Uuid;

use super::to_store_error;
use crate::entities::{
    AllowlistEntity, AutoApproveEntity, RoleRequestEntity, RoleRequestStatusDb,
    RoleRequestUpsertEntity,
};
use crate::metrics::QueryTimer;

const ROLE_REQUEST_COLUMNS: &str = "user_id, email, reason, status, created_at, approved_at";

/// Repository for the organizer role ledger.
#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_allowlist(&self, email: &str) -> Result<Option<AllowlistEntry>, sqlx::Error> {
        let timer = QueryTimer::new("find_allowlist_entry");
        let entity = sqlx::query_as::<_, AllowlistEntity>(
            "SELECT email, approved_at, approved_by, source FROM org_allowlist WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    pub async fn find_auto_approve(
        &self,
        email: &str,
    ) -> Result<Option<AutoApproveEntry>, sqlx::Error> {
        let timer = QueryTimer::new("find_auto_approve_entry");
        let entity = sqlx::query_as::<_, AutoApproveEntity>(
            "SELECT email, added_at, added_by FROM org_auto_approve WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    pub async fn upsert_allowlist(&self, entry: &AllowlistEntry) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_allowlist_entry");
        let result = sqlx::query(
            r#"
            INSERT INTO org_allowlist (email, approved_at, approved_by, source)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE SET
                approved_at = EXCLUDED.approved_at,
                approved_by = EXCLUDED.approved_by,
                source = EXCLUDED.source
            "#,
        )
        .bind(&entry.email)
        .bind(entry.approved_at)
        .bind(&entry.approved_by)
        .bind(&entry.source)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ())
    }

    pub async fn delete_allowlist(&self, email: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_allowlist_entry");
        let result = sqlx::query("DELETE FROM org_allowlist WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    pub async fn upsert_auto_approve(&self, entry: &AutoApproveEntry) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_auto_approve_entry");
        let result = sqlx::query(
            r#"
            INSERT INTO org_auto_approve (email, added_at, added_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                added_at = EXCLUDED.added_at,
                added_by = EXCLUDED.added_by
            "#,
        )
        .bind(&entry.email)
        .bind(entry.added_at)
        .bind(&entry.added_by)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map(|_| ())
    }

    pub async fn delete_auto_approve(&self, email: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_auto_approve_entry");
        let result = sqlx::query("DELETE FROM org_auto_approve WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_request(&self, user_id: Uuid) -> Result<Option<RoleRequest>, sqlx::Error> {
        let timer = QueryTimer::new("find_role_request");
        let entity = sqlx::query_as::<_, RoleRequestEntity>(&format!(
            "SELECT {ROLE_REQUEST_COLUMNS} FROM role_requests WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    /// Inserts a pending request or reopens a non-pending one in a single
    /// statement, so concurrent requests cannot both count as new.
    pub async fn open_request(
        &self,
        user_id: Uuid,
        email: &str,
        reason: Option<&str>,
    ) -> Result<RoleRequestWrite, sqlx::Error> {
        let timer = QueryTimer::new("open_role_request");
        let upserted = sqlx::query_as::<_, RoleRequestUpsertEntity>(&format!(
            r#"
            INSERT INTO role_requests (user_id, email, reason, status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (user_id) DO UPDATE SET
                email = EXCLUDED.email,
                reason = EXCLUDED.reason,
                status = 'pending',
                created_at = NOW(),
                approved_at = NULL
            WHERE role_requests.status <> 'pending'
            RETURNING {ROLE_REQUEST_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(user_id)
        .bind(email)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();

        match upserted {
            Some(row) if row.inserted => Ok(RoleRequestWrite::Created(row.request.into())),
            Some(row) => Ok(RoleRequestWrite::Reopened(row.request.into())),
            None => {
                let existing = self
                    .find_request(user_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                Ok(RoleRequestWrite::AlreadyPending(existing))
            }
        }
    }

    pub async fn mark_approved(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("approve_role_request");
        let result = sqlx::query(
            r#"
            UPDATE role_requests
            SET status = 'approved', approved_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// List role requests for the admin queue, newest first.
    pub async fn list_requests(
        &self,
        status: Option<RoleRequestStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RoleRequest>, i64), sqlx::Error> {
        let status = status.map(RoleRequestStatusDb::from);
        let timer = QueryTimer::new("list_role_requests");
        let entities = sqlx::query_as::<_, RoleRequestEntity>(&format!(
            r#"
            SELECT {ROLE_REQUEST_COLUMNS}
            FROM role_requests
            WHERE ($1::role_request_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM role_requests WHERE ($1::role_request_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        Ok((entities.into_iter().map(Into::into).collect(), total))
    }
}

#[async_trait]
impl RoleLedger for RoleRepository {
    async fn find_allowlist_entry(
        &self,
        email: &str,
    ) -> Result<Option<AllowlistEntry>, StoreError> {
        self.find_allowlist(email).await.map_err(to_store_error)
    }

    async fn find_auto_approve_entry(
        &self,
        email: &str,
    ) -> Result<Option<AutoApproveEntry>, StoreError> {
        self.find_auto_approve(email).await.map_err(to_store_error)
    }

    async fn upsert_allowlist_entry(&self, entry: &AllowlistEntry) -> Result<(), StoreError> {
        self.upsert_allowlist(entry).await.map_err(to_store_error)
    }

    async fn delete_allowlist_entry(&self, email: &str) -> Result<bool, StoreError> {
        self.delete_allowlist(email).await.map_err(to_store_error)
    }

    async fn upsert_auto_approve_entry(
        &self,
        entry: &AutoApproveEntry,
    ) -> Result<(), StoreError> {
        self.upsert_auto_approve(entry).await.map_err(to_store_error)
    }

    async fn delete_auto_approve_entry(&self, email: &str) -> Result<bool, StoreError> {
        self.delete_auto_approve(email).await.map_err(to_store_error)
    }

    async fn find_role_request(&self, user_id: Uuid) -> Result<Option<RoleRequest>, StoreError> {
        self.find_request(user_id).await.map_err(to_store_error)
    }

    async fn open_role_request(
        &self,
        user_id: Uuid,
        email: &str,
        reason: Option<&str>,
    ) -> Result<RoleRequestWrite, StoreError> {
        self.open_request(user_id, email, reason)
            .await
            .map_err(to_store_error)
    }

    async fn mark_role_request_approved(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.mark_approved(user_id).await.map_err(to_store_error)
    }
}
