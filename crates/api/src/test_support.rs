//! Helpers for handler tests that run without a database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use domain::services::{InMemoryStore, MockPushGateway};
use shared::jwt::SessionSubject;
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::{create_app, AppState};
use crate::config::Config;

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub push: Arc<MockPushGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config::load_for_test(&[]).unwrap();
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let state = AppState::for_test(config, store.clone(), push.clone()).unwrap();
        Self { state, store, push }
    }

    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    /// A signed-in account: known profile, resolved claim, session token.
    pub async fn user(&self, email: &str) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        self.store.add_user(user_id, email);
        self.state
            .roles
            .resolve_on_sign_in(user_id, email)
            .await
            .unwrap();
        let token = self.token(user_id, email);
        (user_id, token)
    }

    pub async fn admin(&self, email: &str) -> (Uuid, String) {
        let (user_id, token) = self.user(email).await;
        self.store.grant_admin(user_id);
        (user_id, token)
    }

    pub fn token(&self, user_id: Uuid, email: &str) -> String {
        let (token, _) = self
            .state
            .jwt
            .issue_session_token(&SessionSubject {
                user_id,
                email,
                role: "student",
                admin: false,
            })
            .unwrap();
        token
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
