//! Per-environment configuration and mutable session state
//!
//! An [`EnvironmentContext`] is the single shared record behind one
//! environment: the endpoint identity plus the mutable session state (token,
//! initialized flag, default account). The REST client, the authenticator and
//! the streaming session all hold clones of the same context.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::types::Environment;

/// Endpoint identity and connection tuning for one environment.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub rest_url: Url,
    pub ws_url: Url,
    /// Verify TLS certificates on REST requests.
    pub verify_tls: bool,
    /// Optional proxy URL applied to REST requests.
    pub proxy: Option<Url>,
    /// Default proprietary code for order routing.
    pub proprietary: String,
    /// WebSocket ping interval.
    pub heartbeat: Duration,
    /// How long `connect()` waits for socket-open confirmation.
    pub connect_timeout: Duration,
}

impl EnvironmentConfig {
    pub fn new(environment: Environment) -> Result<Self> {
        Ok(Self {
            rest_url: Url::parse(environment.rest_url())?,
            ws_url: Url::parse(environment.ws_url())?,
            verify_tls: true,
            proxy: None,
            proprietary: environment.proprietary().to_string(),
            heartbeat: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        })
    }
}

/// Mutable session state shared across the REST and streaming clients.
///
/// `token` and `initialized` are only ever set together by the authenticator.
#[derive(Debug, Default)]
struct SessionState {
    user: String,
    password: String,
    account: Option<String>,
    token: Option<String>,
    initialized: bool,
}

/// Shared handle to one environment's configuration and session state.
///
/// Cheap to clone; all clones observe the same session state.
#[derive(Clone)]
pub struct EnvironmentContext {
    config: Arc<EnvironmentConfig>,
    state: Arc<RwLock<SessionState>>,
}

impl EnvironmentContext {
    pub fn new(
        config: EnvironmentConfig,
        user: impl Into<String>,
        password: impl Into<String>,
        account: Option<String>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(SessionState {
                user: user.into(),
                password: password.into(),
                account,
                token: None,
                initialized: false,
            })),
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn credentials(&self) -> (String, String) {
        let state = self.state.read().expect("session state lock poisoned");
        (state.user.clone(), state.password.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state
            .read()
            .expect("session state lock poisoned")
            .token
            .clone()
    }

    /// Stores a fresh token and marks the environment initialized.
    pub fn set_token(&self, token: String) {
        let mut state = self.state.write().expect("session state lock poisoned");
        state.token = Some(token);
        state.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .read()
            .expect("session state lock poisoned")
            .initialized
    }

    /// Default account for order operations, if one was configured.
    pub fn account(&self) -> Option<String> {
        self.state
            .read()
            .expect("session state lock poisoned")
            .account
            .clone()
    }

    pub fn set_account(&self, account: impl Into<String>) {
        self.state
            .write()
            .expect("session state lock poisoned")
            .account = Some(account.into());
    }

    pub fn proprietary(&self) -> &str {
        &self.config.proprietary
    }
}
