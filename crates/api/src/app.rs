use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain::services::{
    AudienceResolver, AudienceStore, ClaimStore, DeliveryDispatcher, DispatchConfig, FeedStore,
    MailQueue, NotificationPipeline, PipelineConfig, PushGateway, RoleAuthority, RoleLedger,
    RolePolicy,
};
use persistence::repositories::{
    AudienceRepository, MailRepository, NotificationRepository, RoleRepository, UserRepository,
};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{admin, audience, events, health, hooks, me, notifications, reports};

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid JWT configuration: {0}")]
    Jwt(#[from] shared::jwt::JwtError),
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub roles: RoleAuthority,
    pub pipeline: NotificationPipeline,
}

/// Collaborators behind the role authority and the notification pipeline.
struct Stores {
    audience: Arc<dyn AudienceStore>,
    feed: Arc<dyn FeedStore>,
    mail: Arc<dyn MailQueue>,
    ledger: Arc<dyn RoleLedger>,
    claims: Arc<dyn ClaimStore>,
}

impl AppState {
    /// Wires the PostgreSQL repositories behind every collaborator.
    pub fn new(
        config: Config,
        pool: PgPool,
        push: Arc<dyn PushGateway>,
    ) -> Result<Self, StateError> {
        let stores = Stores {
            audience: Arc::new(AudienceRepository::new(pool.clone())),
            feed: Arc::new(NotificationRepository::new(pool.clone())),
            mail: Arc::new(MailRepository::new(pool.clone())),
            ledger: Arc::new(RoleRepository::new(pool.clone())),
            claims: Arc::new(UserRepository::new(pool.clone())),
        };
        Self::assemble(config, pool, push, stores)
    }

    /// State backed by one in-memory store. The pool is lazy and never
    /// connects unless a handler reaches for a repository directly.
    #[cfg(test)]
    pub(crate) fn for_test(
        config: Config,
        store: Arc<domain::services::InMemoryStore>,
        push: Arc<dyn PushGateway>,
    ) -> Result<Self, StateError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(
                sqlx::postgres::PgConnectOptions::new().database("campus_events_test"),
            );
        let stores = Stores {
            audience: store.clone(),
            feed: store.clone(),
            mail: store.clone(),
            ledger: store.clone(),
            claims: store,
        };
        Self::assemble(config, pool, push, stores)
    }

    fn assemble(
        config: Config,
        pool: PgPool,
        push: Arc<dyn PushGateway>,
        stores: Stores,
    ) -> Result<Self, StateError> {
        let jwt = Arc::new(config.jwt.to_jwt_config()?);

        let roles = RoleAuthority::new(
            stores.ledger,
            stores.claims,
            RolePolicy {
                institution_domain: config.campus.institution_domain.clone(),
            },
        );

        let notifications = &config.notifications;
        let pipeline = NotificationPipeline::new(
            AudienceResolver::new(stores.audience.clone()),
            DeliveryDispatcher::new(
                push,
                stores.audience,
                stores.feed,
                stores.mail,
                DispatchConfig {
                    push_chunk_size: notifications.push_chunk_size,
                    mail_from: notifications.mail_from.clone(),
                    reply_to: notifications.reply_to.clone(),
                },
            ),
            PipelineConfig {
                app_base_url: config.campus.app_base_url.clone(),
                resolve_attempts: notifications.resolve_attempts,
                resolve_backoff: Duration::from_millis(notifications.resolve_backoff_ms),
            },
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
            roles,
            pipeline,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Identity provider hooks (shared secret)
    let hook_routes = Router::new().route("/api/v1/hooks/sign-in", post(hooks::sign_in));

    // User routes (Bearer session token). Organizer and admin checks happen
    // in the handlers against the ledger and the stored claims.
    let user_routes = Router::new()
        .route("/api/v1/me", get(me::get_me))
        .route("/api/v1/me/saved", get(audience::list_saved))
        .route("/api/v1/me/events", get(events::list_my_events))
        .route("/api/v1/role-requests", post(me::create_role_request))
        .route(
            "/api/v1/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/v1/events/:event_id",
            get(events::get_event).patch(events::update_event),
        )
        .route("/api/v1/events/:event_id/publish", post(events::publish_event))
        .route(
            "/api/v1/events/:event_id/unpublish",
            post(events::unpublish_event),
        )
        .route(
            "/api/v1/events/:event_id/registrations",
            get(events::list_registrations),
        )
        .route(
            "/api/v1/events/:event_id/subscriptions",
            post(audience::subscribe),
        )
        .route(
            "/api/v1/events/:event_id/subscriptions/:token",
            delete(audience::unsubscribe),
        )
        .route(
            "/api/v1/events/:event_id/registration",
            put(audience::register).delete(audience::unregister),
        )
        .route(
            "/api/v1/events/:event_id/saved",
            put(audience::save).delete(audience::unsave),
        )
        .route("/api/v1/notifications", get(notifications::list_notifications))
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        .route("/api/v1/reports", post(reports::create_report));

    // Admin routes (stored admin claim)
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/organizer-approvals",
            post(admin::set_organizer_approval),
        )
        .route(
            "/api/v1/admin/events/:event_id/unpublish",
            post(admin::unpublish_event),
        )
        .route("/api/v1/admin/role-requests", get(admin::list_role_requests))
        .route("/api/v1/admin/reports", get(reports::list_reports));

    Router::new()
        .merge(public_routes)
        .merge(hook_routes)
        .merge(user_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
