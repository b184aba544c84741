//! Login/registration through the app's tRPC API, with a session cache

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// User returned by the auth procedures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrpcUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub token: String,
}

/// Client for the batched tRPC auth endpoints
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Register a new user
    pub async fn register(&self, username: &str, email: &str, password: &str) -> E2eResult<TrpcUser> {
        let user = self
            .call("auth.register", json!({ "username": username, "email": email, "password": password }))
            .await?;
        to_trpc_user(&user, password, false)
    }

    /// Log in and return the user with its token
    pub async fn login(&self, email: &str, password: &str) -> E2eResult<TrpcUser> {
        let user = self
            .call("auth.login", json!({ "email": email, "password": password }))
            .await?;
        to_trpc_user(&user, password, true)
    }

    /// POST one batched call and return `[0].result.data.json.user`
    async fn call(&self, procedure: &str, user: Value) -> E2eResult<Value> {
        let endpoint = format!("{}/api/trpc/{}?batch=1", self.base_url, procedure);
        let body = json!({ "0": { "json": { "user": user } } });

        debug!("POST {}", endpoint);
        let response = self
            .http
            .post(&endpoint)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/0/result/data/json/user")
            .filter(|u| u.is_object())
            .cloned()
            .ok_or_else(|| E2eError::Session(format!("was not able to get user from {} response", procedure)))
    }
}

fn to_trpc_user(user: &Value, password: &str, require_token: bool) -> E2eResult<TrpcUser> {
    let field = |name: &str| user.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    let token = field("token");
    if require_token && token.is_empty() {
        return Err(E2eError::Session("could not get the user token".to_string()));
    }
    Ok(TrpcUser {
        email: field("email"),
        username: field("username"),
        password: password.to_string(),
        token,
    })
}

/// Cached authentication state
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub token: String,
    /// Survives the end of the spec file that created it
    pub share_across_specs: bool,
}

/// Sessions by identifier plus the one the browser currently carries
pub struct SessionStore {
    client: AuthClient,
    sessions: HashMap<String, Session>,
    active: Option<String>,
}

impl SessionStore {
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            sessions: HashMap::new(),
            active: None,
        }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Activate the cached session `id`, logging in first if it is missing
    pub async fn login(
        &mut self,
        id: &str,
        email: &str,
        password: &str,
        share_across_specs: bool,
    ) -> E2eResult<&Session> {
        if self.sessions.contains_key(id) {
            debug!("Restoring cached session '{}'", id);
        } else {
            let user = self.client.login(email, password).await?;
            info!("Logged in {} as session '{}'", user.email, id);
            self.sessions.insert(
                id.to_string(),
                Session {
                    id: id.to_string(),
                    email: user.email,
                    token: user.token,
                    share_across_specs,
                },
            );
        }

        self.active = Some(id.to_string());
        self.sessions
            .get(id)
            .ok_or_else(|| E2eError::Session(format!("session '{}' vanished", id)))
    }

    /// Token to place in `sessionStorage` for the next browser script
    pub fn active_token(&self) -> Option<&str> {
        self.active
            .as_ref()
            .and_then(|id| self.sessions.get(id))
            .map(|s| s.token.as_str())
    }

    /// Forget which session the browser carries; the cache stays
    pub fn deactivate(&mut self) {
        self.active = None;
    }

    /// Invalidate every cached session
    pub fn clear_all(&mut self) {
        debug!("Clearing {} saved session(s)", self.sessions.len());
        self.sessions.clear();
        self.active = None;
    }

    /// Drop sessions bound to the spec file that just finished
    pub fn end_spec(&mut self) {
        self.sessions.retain(|_, s| s.share_across_specs);
        if let Some(id) = &self.active {
            if !self.sessions.contains_key(id) {
                self.active = None;
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }
}
