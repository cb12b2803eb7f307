//! Event repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::event::{CreateEventRequest, UpdateEventRequest};
use domain::models::{Event, EventStatus};
use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidationError;

use crate::entities::{EventEntity, EventStatusDb};
use crate::metrics::QueryTimer;

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, category, organization, \
    contact_email, start_time, end_time, location_name, latitude, longitude, max_attendees, \
    rsvp_required, status, created_at, updated_at";

/// Filters for listing published events.
#[derive(Debug, Clone, Default)]
pub struct PublishedEventsQuery {
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Result of applying a patch to a locked event row.
#[derive(Debug, Clone)]
pub enum EventUpdate {
    Updated { before: Event, after: Event },
    /// The patched start/end window is invalid; nothing was written.
    InvalidWindow(ValidationError),
}

/// Repository for event database operations.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event as draft or published.
    pub async fn create(
        &self,
        organizer_id: Uuid,
        request: &CreateEventRequest,
    ) -> Result<Event, sqlx::Error> {
        let status = if request.publish {
            EventStatusDb::Published
        } else {
            EventStatusDb::Draft
        };

        let timer = QueryTimer::new("create_event");
        let entity = sqlx::query_as::<_, EventEntity>(&format!(
            r#"
            INSERT INTO events (organizer_id, title, description, category, organization,
                                contact_email, start_time, end_time, location_name, latitude,
                                longitude, max_attendees, rsvp_required, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(organizer_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(&request.organization)
        .bind(&request.contact_email)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.location_name)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.max_attendees)
        .bind(request.rsvp_required)
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity?.into())
    }

    /// Find an event by ID, any status.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_by_id");
        let entity = sqlx::query_as::<_, EventEntity>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }

    /// List published events, soonest first. Returns the page and the total.
    pub async fn list_published(
        &self,
        query: &PublishedEventsQuery,
    ) -> Result<(Vec<Event>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_published_events");
        let entities = sqlx::query_as::<_, EventEntity>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE status = 'published'
              AND ($1::text IS NULL OR category = $1)
              AND ($2::timestamptz IS NULL OR start_time >= $2)
            ORDER BY start_time ASC NULLS LAST, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&query.category)
        .bind(query.from)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM events
            WHERE status = 'published'
              AND ($1::text IS NULL OR category = $1)
              AND ($2::timestamptz IS NULL OR start_time >= $2)
            "#,
        )
        .bind(&query.category)
        .bind(query.from)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        Ok((entities.into_iter().map(Into::into).collect(), total))
    }

    /// List an organizer's own events, newest first.
    pub async fn list_by_organizer(
        &self,
        organizer_id: Uuid,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let timer = QueryTimer::new("list_events_by_organizer");
        let entities = sqlx::query_as::<_, EventEntity>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE organizer_id = $1
              AND ($2::event_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(organizer_id)
        .bind(status.map(EventStatusDb::from))
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?.into_iter().map(Into::into).collect())
    }

    /// Applies a partial update under a row lock.
    ///
    /// The start/end window is checked against the locked row, so concurrent
    /// patches cannot combine into an inverted window. Returns `None` when
    /// the event does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        patch: &UpdateEventRequest,
    ) -> Result<Option<EventUpdate>, sqlx::Error> {
        let timer = QueryTimer::new("update_event");
        let mut tx = self.pool.begin().await?;

        let before: Option<Event> = sqlx::query_as::<_, EventEntity>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Into::into);

        let Some(before) = before else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        if let Err(e) = patch.validate_window_for(&before) {
            tx.rollback().await?;
            timer.record();
            return Ok(Some(EventUpdate::InvalidWindow(e)));
        }

        let next = patch.apply_to(&before);
        let after: Event = sqlx::query_as::<_, EventEntity>(&format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, category = $4, organization = $5,
                contact_email = $6, start_time = $7, end_time = $8, location_name = $9,
                latitude = $10, longitude = $11, max_attendees = $12, rsvp_required = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&next.title)
        .bind(&next.description)
        .bind(&next.category)
        .bind(&next.organization)
        .bind(&next.contact_email)
        .bind(next.start_time)
        .bind(next.end_time)
        .bind(&next.location_name)
        .bind(next.latitude)
        .bind(next.longitude)
        .bind(next.max_attendees)
        .bind(next.rsvp_required)
        .fetch_one(&mut *tx)
        .await?
        .into();

        tx.commit().await?;
        timer.record();

        Ok(Some(EventUpdate::Updated { before, after }))
    }

    /// Sets the publication state. Returns the updated event.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: EventStatus,
    ) -> Result<Option<Event>, sqlx::Error> {
        let timer = QueryTimer::new("set_event_status");
        let entity = sqlx::query_as::<_, EventEntity>(&format!(
            r#"
            UPDATE events
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(EventStatusDb::from(status))
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(entity?.map(Into::into))
    }
}
